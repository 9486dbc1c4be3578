//! Error descriptions for the error channel.

use std::backtrace::Backtrace;
use std::sync::Arc;

/// An error as seen by [`SecurityAuditLog::log_error`](super::SecurityAuditLog::log_error).
///
/// Captures the error's name and message along with the optional code and
/// HTTP status that upstream clients attach to their errors. No backtrace is
/// captured unless [`with_backtrace`](Self::with_backtrace) is called; in
/// development mode the log captures one at the logging call instead.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub name: String,
    pub message: String,
    pub code: Option<String>,
    pub status: Option<u16>,
    pub cause: Option<ErrorCause>,
    backtrace: Option<Arc<Backtrace>>,
}

/// The error that caused an [`ErrorReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCause {
    pub name: String,
    pub message: String,
    pub code: Option<String>,
}

impl ErrorCause {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl ErrorReport {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            code: None,
            status: None,
            cause: None,
            backtrace: None,
        }
    }

    /// Describe a Rust error. The name is the error's type name without its
    /// module path; the source error, if any, becomes the cause.
    pub fn from_error<E: std::error::Error + 'static>(error: &E) -> Self {
        let mut report = Self::new(short_type_name::<E>(), error.to_string());
        report.cause = error
            .source()
            .map(|source| ErrorCause::new("Error", source.to_string()));
        report
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_cause(mut self, cause: ErrorCause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Capture a backtrace at the error site.
    pub fn with_backtrace(mut self) -> Self {
        self.backtrace = Some(Arc::new(Backtrace::force_capture()));
        self
    }

    /// The captured backtrace, rendered.
    pub fn stack(&self) -> Option<String> {
        self.backtrace.as_ref().map(|bt| bt.to_string())
    }

    /// Name or message identifies a failed call to an upstream service that
    /// is worth retrying.
    pub fn is_retryable_upstream(&self) -> bool {
        self.name.ends_with("RetryableFetchError") || self.message == "fetch failed"
    }

    pub fn is_timeout(&self) -> bool {
        self.message.contains("timeout") || self.message.contains("CONNECT_TIMEOUT")
    }
}

fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("upstream unavailable")]
    struct UpstreamError {
        #[source]
        source: std::io::Error,
    }

    #[test]
    fn test_from_error_uses_type_name_and_source() {
        let err = UpstreamError {
            source: std::io::Error::other("connection refused"),
        };
        let report = ErrorReport::from_error(&err);

        assert_eq!(report.name, "UpstreamError");
        assert_eq!(report.message, "upstream unavailable");
        let cause = report.cause.unwrap();
        assert_eq!(cause.message, "connection refused");
        assert!(cause.code.is_none());
    }

    #[test]
    fn test_from_error_without_source() {
        let err = std::io::Error::other("boom");
        let report = ErrorReport::from_error(&err);
        assert_eq!(report.name, "Error");
        assert!(report.cause.is_none());
    }

    #[test]
    fn test_backtrace_is_only_captured_on_request() {
        let report = ErrorReport::new("Error", "boom");
        assert!(report.stack().is_none());
        assert!(report.with_backtrace().stack().is_some());
    }

    #[test]
    fn test_retryable_upstream_detection() {
        assert!(ErrorReport::new("AuthRetryableFetchError", "x").is_retryable_upstream());
        assert!(ErrorReport::new("TypeError", "fetch failed").is_retryable_upstream());
        assert!(!ErrorReport::new("TypeError", "fetch failed badly").is_retryable_upstream());
        assert!(!ErrorReport::new("Error", "boom").is_retryable_upstream());
    }

    #[test]
    fn test_timeout_detection() {
        assert!(ErrorReport::new("Error", "request timeout after 10s").is_timeout());
        assert!(ErrorReport::new("Error", "UND_ERR_CONNECT_TIMEOUT").is_timeout());
        assert!(!ErrorReport::new("Error", "Timeout").is_timeout());
    }

    #[test]
    fn test_short_type_name_strips_path_and_generics() {
        assert_eq!(short_type_name::<std::io::Error>(), "Error");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
    }
}
