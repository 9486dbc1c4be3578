//! Security audit logging
//!
//! This module provides:
//! - [`SecurityAuditLog`]: builds structured records for authentication events and errors
//! - [`SecurityLogEvent`]: the security event schema
//! - [`ErrorReport`]: an error description for the error channel
//! - [`sanitize`]: redaction of sensitive context values
//! - [`AuditSink`]: where records are written ([`StdioSink`], [`TracingSink`], [`MemorySink`])
//!
//! Records are safe by default: context and details never carry the value of
//! a key that looks like a password, token, secret, key or credential.

mod event;
mod logger;
mod report;
mod sanitize;
mod sink;

pub use event::{RequestContext, SecurityEventKind, SecurityLogEvent};
pub use logger::{
    CONNECTION_TIMEOUT, SecurityAuditLog, TIMEOUT_SUGGESTIONS, UPSTREAM_CONNECTION_ERROR,
};
pub use report::{ErrorCause, ErrorReport};
pub use sanitize::{MAX_STRING_LEN, REDACTED, SENSITIVE_KEY_FRAGMENTS, TRUNCATED_SUFFIX, sanitize};
pub use sink::{AuditRecord, AuditSink, Channel, MemorySink, RecordLevel, StdioSink, TracingSink};
