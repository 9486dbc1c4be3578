//! # Latchkey
//!
//! Latchkey protects login endpoints against credential guessing. It counts
//! failed attempts per identifier, locks the identifier out for a while once a
//! threshold is reached, and writes structured, redaction-safe audit records
//! for every security-relevant transition.
//!
//! State lives in process memory. Running several instances of a service
//! gives each instance its own counters.
//!
//! ## Example
//!
//! ```rust,no_run
//! use latchkey::{Latchkey, RequestContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let latchkey = Latchkey::builder().build()?;
//!     let request = RequestContext::new().with_ip("203.0.113.7");
//!
//!     // Before checking credentials
//!     latchkey.ensure_not_locked("user@example.com")?;
//!
//!     // After the identity provider rejected the password
//!     latchkey.login_failed("user@example.com", &request, Some("invalid password"));
//!
//!     latchkey.shutdown().await?;
//!     Ok(())
//! }
//! ```
pub mod builder;

use std::sync::Arc;

pub use builder::{LatchkeyBuilder, LatchkeyBuilderError};

/// Re-export core types from latchkey_core
pub use latchkey_core::{
    AuditConfig, Clock, DeploymentMode, ErrorReport, LockoutConfig, LockoutStatus, LockoutTracker,
    ManualClock, RequestContext, SecurityAuditLog, SystemClock,
};

/// Re-export audit sinks
pub use latchkey_core::audit::{AuditSink, MemorySink, StdioSink, TracingSink};

/// Errors that can occur when using Latchkey.
#[derive(Debug, thiserror::Error)]
pub enum LatchkeyError {
    /// The identifier is locked out
    #[error("Account locked, try again in {retry_after_minutes} minutes")]
    AccountLocked { retry_after_minutes: u64 },
    /// The cleanup task panicked or was aborted
    #[error("Cleanup task failed: {0}")]
    CleanupTask(String),
}

pub(crate) struct CleanupTask {
    pub(crate) shutdown: tokio::sync::watch::Sender<bool>,
    pub(crate) handle: tokio::task::JoinHandle<()>,
}

/// Lockout tracking and audit logging for one process.
///
/// Construct once at startup with [`Latchkey::builder`] and share it with
/// request handlers (it is `Send + Sync`; wrap it in an `Arc`). The tracker
/// and audit log can also be used directly through [`tracker`](Self::tracker)
/// and [`audit`](Self::audit).
///
/// Dropping a `Latchkey` stops the cleanup task at its next wake-up; call
/// [`shutdown`](Self::shutdown) to stop it and wait for it.
pub struct Latchkey {
    tracker: Arc<LockoutTracker>,
    audit: SecurityAuditLog,
    cleanup: Option<CleanupTask>,
}

impl Latchkey {
    pub fn builder() -> LatchkeyBuilder {
        LatchkeyBuilder::new()
    }

    pub(crate) fn from_parts(
        tracker: Arc<LockoutTracker>,
        audit: SecurityAuditLog,
        cleanup: Option<CleanupTask>,
    ) -> Self {
        Self {
            tracker,
            audit,
            cleanup,
        }
    }

    pub fn tracker(&self) -> &Arc<LockoutTracker> {
        &self.tracker
    }

    pub fn audit(&self) -> &SecurityAuditLog {
        &self.audit
    }

    pub fn is_cleanup_running(&self) -> bool {
        self.cleanup
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Reject the attempt up front if the identifier is locked out.
    ///
    /// # Errors
    ///
    /// Returns [`LatchkeyError::AccountLocked`] with the minutes remaining.
    pub fn ensure_not_locked(&self, identifier: &str) -> Result<(), LatchkeyError> {
        if self.tracker.is_locked(identifier) {
            return Err(LatchkeyError::AccountLocked {
                retry_after_minutes: self.tracker.get_remaining_lockout_time(identifier),
            });
        }
        Ok(())
    }

    /// Record a failed login and write the matching audit records.
    ///
    /// Writes `LOGIN_FAILED`, followed by `ACCOUNT_LOCKED` when this failure
    /// locked the identifier. Returns whether the identifier is now locked.
    pub fn login_failed(
        &self,
        identifier: &str,
        request: &RequestContext,
        reason: Option<&str>,
    ) -> bool {
        let locked = self.tracker.record_failed_attempt(identifier);
        self.audit.failed_login(identifier, request, reason);
        if locked {
            self.audit.account_locked(identifier, request);
        }
        locked
    }

    /// Clear the identifier's failed attempts and write `LOGIN_SUCCESS`.
    pub fn login_succeeded(&self, identifier: &str, request: &RequestContext) {
        self.tracker.clear_attempts(identifier);
        self.audit.successful_login(identifier, request);
    }

    /// Stop the cleanup task and wait for it to finish.
    pub async fn shutdown(mut self) -> Result<(), LatchkeyError> {
        let Some(task) = self.cleanup.take() else {
            return Ok(());
        };

        // The task also stops if the receiver sees the sender dropped
        let _ = task.shutdown.send(true);
        task.handle
            .await
            .map_err(|e| LatchkeyError::CleanupTask(e.to_string()))
    }
}

impl std::fmt::Debug for Latchkey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Latchkey")
            .field("tracker", &self.tracker)
            .field("audit", &self.audit)
            .field("cleanup_running", &self.is_cleanup_running())
            .finish()
    }
}
