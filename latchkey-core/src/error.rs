use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_failed_attempts must be greater than 0")]
    InvalidMaxAttempts,

    #[error("lockout_period must be positive, got {0} seconds")]
    InvalidLockoutPeriod(i64),

    #[error("lockout_period must be at most 365 days, got {0} seconds")]
    LockoutPeriodTooLong(i64),

    #[error("cleanup_interval must be greater than 0")]
    InvalidCleanupInterval,
}
