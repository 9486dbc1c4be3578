//! Security audit logger
//!
//! [`SecurityAuditLog`] turns authentication outcomes and errors into
//! structured JSON records and hands them to an [`AuditSink`]. Every method is
//! fire-and-forget: nothing here can fail the caller's request.

use std::backtrace::Backtrace;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value, json};

use super::{
    event::{RequestContext, SecurityEventKind, SecurityLogEvent, format_timestamp},
    report::ErrorReport,
    sanitize::sanitize,
    sink::{AuditRecord, AuditSink, RecordLevel, StdioSink},
};
use crate::{
    clock::{Clock, SystemClock},
    config::AuditConfig,
};

/// Troubleshooting hints attached to connection timeout records.
pub const TIMEOUT_SUGGESTIONS: [&str; 4] = [
    "Check network connectivity",
    "Verify upstream service URL and credentials",
    "Consider increasing timeout settings",
    "Check if the upstream service is operational",
];

pub const UPSTREAM_CONNECTION_ERROR: &str = "UPSTREAM_CONNECTION_ERROR";
pub const CONNECTION_TIMEOUT: &str = "CONNECTION_TIMEOUT";

#[derive(Serialize)]
struct SecurityRecord<'a> {
    level: &'static str,
    #[serde(flatten)]
    event: &'a SecurityLogEvent,
}

/// Structured, redaction-safe security audit log.
///
/// Holds no mutable state of its own; cloning is cheap and clones share the
/// sink.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use latchkey_core::audit::{MemorySink, RequestContext, SecurityAuditLog};
/// use latchkey_core::config::AuditConfig;
///
/// let sink = Arc::new(MemorySink::new());
/// let audit = SecurityAuditLog::with_sink(AuditConfig::production(), sink.clone());
///
/// let request = RequestContext::new().with_ip("203.0.113.7");
/// audit.failed_login("user@example.com", &request, Some("invalid password"));
///
/// assert_eq!(sink.bodies()[0]["event"], "LOGIN_FAILED");
/// ```
#[derive(Clone)]
pub struct SecurityAuditLog {
    config: AuditConfig,
    sink: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl SecurityAuditLog {
    /// Log to stdout and stderr.
    pub fn new(config: AuditConfig) -> Self {
        Self::with_sink(config, Arc::new(StdioSink))
    }

    pub fn with_sink(config: AuditConfig, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            config,
            sink,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source used for record timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    fn is_development(&self) -> bool {
        self.config.mode.is_development()
    }

    fn timestamp(&self) -> String {
        format_timestamp(&self.clock.now())
    }

    fn event(&self, kind: SecurityEventKind) -> SecurityLogEvent {
        SecurityLogEvent::new(kind, self.clock.now())
    }

    /// Write a security event to the informational channel.
    ///
    /// `details` are sanitized here, so callers may pass raw values.
    pub fn emit(&self, mut event: SecurityLogEvent) {
        if let Some(details) = event.details.take() {
            event.details = Some(sanitize(&details));
        }

        let body = serde_json::to_value(SecurityRecord {
            level: RecordLevel::Security.as_str(),
            event: &event,
        })
        .unwrap_or_else(|e| {
            json!({
                "level": RecordLevel::Security.as_str(),
                "event": event.event.to_string(),
                "timestamp": format_timestamp(&event.timestamp),
                "serializationError": e.to_string(),
            })
        });

        self.write(RecordLevel::Security, body, false);
    }

    pub fn failed_login(&self, email: &str, request: &RequestContext, reason: Option<&str>) {
        let event = self
            .event(SecurityEventKind::LoginFailed)
            .with_email(email)
            .with_request(request);
        let mut details = Map::new();
        if let Some(reason) = reason {
            details.insert("reason".into(), Value::String(reason.to_string()));
        }
        self.emit(event.with_details(details));
    }

    pub fn successful_login(&self, email: &str, request: &RequestContext) {
        self.emit(
            self.event(SecurityEventKind::LoginSuccess)
                .with_email(email)
                .with_request(request),
        );
    }

    pub fn password_reset_requested(&self, email: &str, request: &RequestContext) {
        self.emit(
            self.event(SecurityEventKind::PasswordResetRequested)
                .with_email(email)
                .with_request(request),
        );
    }

    pub fn user_registered(&self, email: &str, request: &RequestContext) {
        self.emit(
            self.event(SecurityEventKind::UserRegistered)
                .with_email(email)
                .with_request(request),
        );
    }

    pub fn account_locked(&self, email: &str, request: &RequestContext) {
        self.emit(
            self.event(SecurityEventKind::AccountLocked)
                .with_email(email)
                .with_request(request),
        );
    }

    /// Log suspicious activity as `SECURITY_<name>`, including the user agent.
    pub fn security_event(
        &self,
        name: &str,
        request: &RequestContext,
        details: Option<&Map<String, Value>>,
    ) {
        let mut event = self
            .event(SecurityEventKind::Security(name.to_string()))
            .with_request(request)
            .with_user_agent(request.user_agent.clone());
        if let Some(details) = details {
            event = event.with_details(details.clone());
        }
        self.emit(event);
    }

    /// Write an error record to the error channel.
    ///
    /// The stack trace is only included in development mode, where it is
    /// captured here unless the report already carries one. Upstream
    /// connectivity failures and timeouts are classified under `errorType`.
    pub fn log_error(
        &self,
        error: &ErrorReport,
        request: Option<&RequestContext>,
        context: Option<&Map<String, Value>>,
    ) {
        let mut body = Map::new();
        body.insert("level".into(), json!(RecordLevel::Error.as_str()));
        body.insert("timestamp".into(), json!(self.timestamp()));
        body.insert("name".into(), json!(error.name));
        body.insert("message".into(), json!(error.message));

        if self.is_development() {
            let stack = error
                .stack()
                .unwrap_or_else(|| Backtrace::force_capture().to_string());
            body.insert("stack".into(), json!(stack));
        }

        if let Some(request) = request {
            insert_opt(&mut body, "requestId", &request.request_id);
            insert_opt(&mut body, "ip", &request.ip);
            insert_opt(&mut body, "method", &request.method);
            insert_opt(&mut body, "url", &request.url);
            insert_opt(&mut body, "userAgent", &request.user_agent);
        }

        if let Some(context) = context {
            body.insert("context".into(), Value::Object(sanitize(context)));
        }

        if let Some(cause) = &error.cause {
            let mut cause_body = Map::new();
            cause_body.insert("name".into(), json!(cause.name));
            cause_body.insert("message".into(), json!(cause.message));
            insert_opt(&mut cause_body, "code", &cause.code);
            body.insert("cause".into(), Value::Object(cause_body));
        }

        if error.is_retryable_upstream() {
            body.insert("errorType".into(), json!(UPSTREAM_CONNECTION_ERROR));
            body.insert("isRetryable".into(), json!(true));
            if let Some(status) = error.status {
                body.insert("httpStatus".into(), json!(status));
            }
            insert_opt(&mut body, "errorCode", &error.code);
        }

        if error.is_timeout() {
            body.insert("errorType".into(), json!(CONNECTION_TIMEOUT));
            body.insert(
                "troubleshooting".into(),
                json!({ "suggestions": TIMEOUT_SUGGESTIONS }),
            );
        }

        self.write(RecordLevel::Error, Value::Object(body), self.is_development());
    }

    /// [`log_error`](Self::log_error) for any Rust error type.
    pub fn log_std_error<E: std::error::Error + 'static>(
        &self,
        error: &E,
        request: Option<&RequestContext>,
        context: Option<&Map<String, Value>>,
    ) {
        self.log_error(&ErrorReport::from_error(error), request, context);
    }

    /// Log a failed registration as a `REGISTRATION_FAILED` security event,
    /// then log the error itself with the operation and email as context.
    pub fn log_registration_error(
        &self,
        email: &str,
        error: &ErrorReport,
        request: &RequestContext,
    ) {
        let mut details = Map::new();
        details.insert("errorName".into(), json!(error.name));
        if let Some(code) = &error.code {
            details.insert("errorCode".into(), json!(code));
        }
        details.insert("isRetryable".into(), json!(error.is_retryable_upstream()));
        if self.is_development() {
            details.insert("errorMessage".into(), json!(error.message));
        }

        self.emit(
            self.event(SecurityEventKind::RegistrationFailed)
                .with_email(email)
                .with_request(request)
                .with_details(details),
        );

        let mut context = Map::new();
        context.insert("operation".into(), json!("registration"));
        context.insert("email".into(), json!(email));
        self.log_error(error, Some(request), Some(&context));
    }

    /// Write a warning with sanitized context to the informational channel.
    pub fn warn(&self, message: &str, context: Option<&Map<String, Value>>) {
        let mut body = Map::new();
        body.insert("level".into(), json!(RecordLevel::Warn.as_str()));
        body.insert("timestamp".into(), json!(self.timestamp()));
        body.insert("message".into(), json!(message));
        if let Some(context) = context {
            body.insert("context".into(), Value::Object(sanitize(context)));
        }
        self.write(RecordLevel::Warn, Value::Object(body), false);
    }

    fn write(&self, level: RecordLevel, body: Value, pretty: bool) {
        let record = AuditRecord {
            level,
            body,
            pretty,
        };
        if let Err(e) = self.sink.write(&record) {
            tracing::warn!(error = %e, level = level.as_str(), "Failed to write audit record");
        }
    }
}

impl std::fmt::Debug for SecurityAuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityAuditLog")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn insert_opt(body: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        body.insert(key.to_string(), json!(value));
    }
}
