//! Configuration for lockout tracking and audit logging.

use chrono::Duration;

use crate::error::ConfigError;

/// Environment variable holding the deployment mode.
pub const DEPLOYMENT_MODE_ENV: &str = "LATCHKEY_ENV";

/// Longest accepted lockout period, in days.
pub const MAX_LOCKOUT_PERIOD_DAYS: i64 = 365;

/// Configuration for brute force lockout.
///
/// # Example
///
/// ```rust
/// use chrono::Duration;
/// use latchkey_core::config::LockoutConfig;
///
/// let config = LockoutConfig {
///     max_failed_attempts: 3,
///     lockout_period: Duration::minutes(30),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutConfig {
    /// When false, nothing is recorded and no identifier is ever locked.
    pub enabled: bool,
    /// Failed attempts that trigger a lockout.
    pub max_failed_attempts: u32,
    /// How long a lockout lasts, measured from the most recent failure.
    pub lockout_period: Duration,
    /// How often the background sweep removes expired lockouts.
    pub cleanup_interval: std::time::Duration,
}

impl Default for LockoutConfig {
    /// Enabled, 5 attempts, 15 minute lockout, hourly cleanup.
    fn default() -> Self {
        Self {
            enabled: true,
            max_failed_attempts: 5,
            lockout_period: Duration::minutes(15),
            cleanup_interval: std::time::Duration::from_secs(60 * 60),
        }
    }
}

impl LockoutConfig {
    /// A configuration with protection turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Lockout period in whole minutes, rounded up.
    pub fn lockout_minutes(&self) -> u64 {
        let secs = self.lockout_period.num_seconds().max(0) as u64;
        secs.div_ceil(60)
    }

    /// Check the configuration before handing it to a tracker.
    ///
    /// The lockout period must be positive and at most
    /// [`MAX_LOCKOUT_PERIOD_DAYS`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_failed_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts);
        }
        if self.lockout_period <= Duration::zero() {
            return Err(ConfigError::InvalidLockoutPeriod(
                self.lockout_period.num_seconds(),
            ));
        }
        if self.lockout_period > Duration::days(MAX_LOCKOUT_PERIOD_DAYS) {
            return Err(ConfigError::LockoutPeriodTooLong(
                self.lockout_period.num_seconds(),
            ));
        }
        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::InvalidCleanupInterval);
        }
        Ok(())
    }
}

/// Deployment mode controlling how much error detail reaches the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeploymentMode {
    /// Stack traces and raw error messages are included.
    Development,
    /// Stack traces and raw error messages are omitted.
    #[default]
    Production,
}

impl DeploymentMode {
    /// Parse a mode name. Only `development` (case-insensitive) selects
    /// development mode.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("development") {
            Self::Development
        } else {
            Self::Production
        }
    }

    /// Read the mode from [`DEPLOYMENT_MODE_ENV`], defaulting to production.
    pub fn from_env() -> Self {
        std::env::var(DEPLOYMENT_MODE_ENV)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Configuration for the security audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuditConfig {
    pub mode: DeploymentMode,
}

impl AuditConfig {
    pub fn new(mode: DeploymentMode) -> Self {
        Self { mode }
    }

    pub fn development() -> Self {
        Self::new(DeploymentMode::Development)
    }

    pub fn production() -> Self {
        Self::new(DeploymentMode::Production)
    }

    /// Resolve the deployment mode from the environment once.
    pub fn from_env() -> Self {
        Self::new(DeploymentMode::from_env())
    }
}
