//! Security audit event types

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Category tag of a security event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityEventKind {
    LoginFailed,
    LoginSuccess,
    PasswordResetRequested,
    UserRegistered,
    RegistrationFailed,
    AccountLocked,
    /// Application-defined suspicious activity, tagged `SECURITY_<name>`.
    Security(String),
}

impl std::fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoginFailed => write!(f, "LOGIN_FAILED"),
            Self::LoginSuccess => write!(f, "LOGIN_SUCCESS"),
            Self::PasswordResetRequested => write!(f, "PASSWORD_RESET_REQUESTED"),
            Self::UserRegistered => write!(f, "USER_REGISTERED"),
            Self::RegistrationFailed => write!(f, "REGISTRATION_FAILED"),
            Self::AccountLocked => write!(f, "ACCOUNT_LOCKED"),
            Self::Security(name) => write!(f, "SECURITY_{name}"),
        }
    }
}

impl Serialize for SecurityEventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Request metadata attached to audit records.
///
/// Every field is optional; absent fields are left out of the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Correlation id for the request
    pub request_id: Option<String>,
    /// Client IP address
    pub ip: Option<String>,
    /// HTTP method
    pub method: Option<String>,
    /// Original request URL
    pub url: Option<String>,
    /// Client user agent
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// A security event as written to the audit log.
///
/// Serialized in camelCase with absent fields omitted. `details` is passed
/// through [`sanitize`](super::sanitize) by
/// [`SecurityAuditLog::emit`](super::SecurityAuditLog::emit) before it is written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityLogEvent {
    pub event: SecurityEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl SecurityLogEvent {
    pub fn new(event: SecurityEventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            event,
            email: None,
            ip: None,
            timestamp,
            request_id: None,
            details: None,
            user_agent: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Copy the IP address and request id from a request.
    pub fn with_request(mut self, request: &RequestContext) -> Self {
        self.ip = request.ip.clone();
        self.request_id = request.request_id.clone();
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = Some(details);
        self
    }
}

/// ISO 8601 with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`.
pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_event_kind_display() {
        assert_eq!(SecurityEventKind::LoginFailed.to_string(), "LOGIN_FAILED");
        assert_eq!(SecurityEventKind::AccountLocked.to_string(), "ACCOUNT_LOCKED");
        assert_eq!(
            SecurityEventKind::Security("RATE_LIMIT_HIT".into()).to_string(),
            "SECURITY_RATE_LIMIT_HIT"
        );
    }

    #[test]
    fn test_event_serializes_camel_case_and_omits_absent_fields() {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let request = RequestContext::new()
            .with_ip("10.0.0.1")
            .with_request_id("req-1")
            .with_user_agent("curl/8.0");
        let event = SecurityLogEvent::new(SecurityEventKind::LoginSuccess, timestamp)
            .with_email("a@x.com")
            .with_request(&request);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "LOGIN_SUCCESS",
                "email": "a@x.com",
                "ip": "10.0.0.1",
                "timestamp": "2024-05-01T12:00:00.000Z",
                "requestId": "req-1",
            })
        );
    }

    #[test]
    fn test_with_user_agent_and_details() {
        let mut details = Map::new();
        details.insert("path".into(), json!("/admin"));
        let event = SecurityLogEvent::new(SecurityEventKind::Security("PROBE".into()), Utc::now())
            .with_user_agent(Some("bot".into()))
            .with_details(details);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["userAgent"], "bot");
        assert_eq!(value["details"]["path"], "/admin");
        assert_eq!(value["event"], "SECURITY_PROBE");
    }
}
