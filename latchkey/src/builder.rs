//! Builder for constructing [`Latchkey`] instances
//!
//! # Example
//!
//! ```rust,no_run
//! use latchkey::LatchkeyBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Defaults: 5 attempts, 15 minute lockout, hourly cleanup,
//!     // deployment mode from LATCHKEY_ENV, records on stdout/stderr
//!     let latchkey = LatchkeyBuilder::new().build()?;
//!
//!     latchkey.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use latchkey_core::{
    AuditConfig, Clock, LockoutConfig, LockoutTracker, SecurityAuditLog, SystemClock,
    audit::{AuditSink, StdioSink},
    error::ConfigError,
};

use crate::{CleanupTask, Latchkey};

/// Errors that can occur when building a Latchkey instance.
#[derive(Debug, thiserror::Error)]
pub enum LatchkeyBuilderError {
    /// Invalid lockout configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    /// The cleanup task was requested outside of a tokio runtime
    #[error("Background cleanup requires a running tokio runtime")]
    NoRuntime,
}

/// Builder for [`Latchkey`].
///
/// # Example
///
/// ```rust
/// use chrono::Duration;
/// use latchkey::{AuditConfig, LatchkeyBuilder, LockoutConfig};
///
/// let latchkey = LatchkeyBuilder::new()
///     .with_lockout(LockoutConfig {
///         max_failed_attempts: 3,
///         lockout_period: Duration::minutes(30),
///         ..Default::default()
///     })
///     .with_audit_config(AuditConfig::production())
///     .start_cleanup(false)
///     .build()
///     .unwrap();
///
/// assert_eq!(latchkey.tracker().config().max_failed_attempts, 3);
/// ```
pub struct LatchkeyBuilder {
    lockout_config: LockoutConfig,
    audit_config: Option<AuditConfig>,
    sink: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    start_cleanup: bool,
}

impl Default for LatchkeyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LatchkeyBuilder {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Lockout: enabled, 5 attempts, 15 minute lockout, hourly cleanup
    /// - Audit mode: read from `LATCHKEY_ENV` at build time
    /// - Audit sink: stdout/stderr
    /// - Clock: system clock
    /// - Background cleanup: started
    pub fn new() -> Self {
        Self {
            lockout_config: LockoutConfig::default(),
            audit_config: None,
            sink: Arc::new(StdioSink),
            clock: Arc::new(SystemClock),
            start_cleanup: true,
        }
    }

    /// Configure lockout thresholds and cleanup interval.
    pub fn with_lockout(mut self, config: LockoutConfig) -> Self {
        self.lockout_config = config;
        self
    }

    /// Set the audit configuration instead of reading it from the environment.
    pub fn with_audit_config(mut self, config: AuditConfig) -> Self {
        self.audit_config = Some(config);
        self
    }

    /// Send audit records somewhere other than stdout/stderr.
    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use a custom time source for both the tracker and the audit log.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set whether to spawn the background cleanup task during build.
    ///
    /// Default: true
    pub fn start_cleanup(mut self, start: bool) -> Self {
        self.start_cleanup = start;
        self
    }

    /// Build the Latchkey instance.
    ///
    /// Fails if the lockout configuration is invalid, or if the cleanup task
    /// was requested and no tokio runtime is running.
    pub fn build(self) -> Result<Latchkey, LatchkeyBuilderError> {
        self.lockout_config.validate()?;

        let audit_config = self.audit_config.unwrap_or_else(AuditConfig::from_env);
        let tracker = Arc::new(LockoutTracker::with_clock(
            self.lockout_config,
            Arc::clone(&self.clock),
        ));
        let audit = SecurityAuditLog::with_sink(audit_config, self.sink).with_clock(self.clock);

        let cleanup = if self.start_cleanup {
            if tokio::runtime::Handle::try_current().is_err() {
                return Err(LatchkeyBuilderError::NoRuntime);
            }
            let (shutdown, shutdown_rx) = tokio::sync::watch::channel(false);
            let handle = tracker.start_cleanup_task(shutdown_rx);
            tracing::debug!(
                interval_secs = tracker.config().cleanup_interval.as_secs(),
                "Started lockout cleanup task"
            );
            Some(CleanupTask { shutdown, handle })
        } else {
            None
        };

        Ok(Latchkey::from_parts(tracker, audit, cleanup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_without_cleanup_outside_runtime() {
        let latchkey = LatchkeyBuilder::new()
            .with_audit_config(AuditConfig::production())
            .start_cleanup(false)
            .build()
            .unwrap();

        assert!(!latchkey.is_cleanup_running());
        assert_eq!(latchkey.tracker().config(), &LockoutConfig::default());
    }

    #[test]
    fn test_build_with_cleanup_requires_runtime() {
        let result = LatchkeyBuilder::new().build();
        assert!(matches!(result, Err(LatchkeyBuilderError::NoRuntime)));
    }

    #[test]
    fn test_build_rejects_oversized_lockout_period() {
        let result = LatchkeyBuilder::new()
            .with_lockout(LockoutConfig {
                lockout_period: chrono::Duration::days(100_000_000),
                ..Default::default()
            })
            .start_cleanup(false)
            .build();

        assert!(matches!(
            result,
            Err(LatchkeyBuilderError::InvalidConfiguration(
                ConfigError::LockoutPeriodTooLong(_)
            ))
        ));
    }

    #[test]
    fn test_build_rejects_invalid_lockout_config() {
        let result = LatchkeyBuilder::new()
            .with_lockout(LockoutConfig {
                max_failed_attempts: 0,
                ..Default::default()
            })
            .start_cleanup(false)
            .build();

        assert!(matches!(
            result,
            Err(LatchkeyBuilderError::InvalidConfiguration(
                ConfigError::InvalidMaxAttempts
            ))
        ));
    }

    #[tokio::test]
    async fn test_build_starts_cleanup_inside_runtime() {
        let latchkey = LatchkeyBuilder::new()
            .with_audit_config(AuditConfig::production())
            .build()
            .unwrap();

        assert!(latchkey.is_cleanup_running());
        latchkey.shutdown().await.unwrap();
    }
}
