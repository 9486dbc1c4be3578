//! Brute force lockout tracking.
//!
//! This module implements per-identifier failed login counting with a
//! time-bounded lockout once a threshold is reached.
//!
//! # Features
//!
//! - Per-identifier attempt tracking (identifiers are opaque strings, usually emails)
//! - Automatic lockout after a configurable number of failures
//! - Lazy expiry: an expired lockout is forgotten the next time it is checked
//! - Background sweep of expired lockouts to bound memory
//!
//! # Example
//!
//! ```rust
//! use latchkey_core::config::LockoutConfig;
//! use latchkey_core::services::LockoutTracker;
//!
//! let tracker = LockoutTracker::new(LockoutConfig::default());
//!
//! // Check before verifying credentials
//! if tracker.is_locked("user@example.com") {
//!     let minutes = tracker.get_remaining_lockout_time("user@example.com");
//!     println!("try again in {minutes} minutes");
//! }
//!
//! // Report the outcome afterwards
//! let now_locked = tracker.record_failed_attempt("user@example.com");
//! assert!(!now_locked);
//! tracker.clear_attempts("user@example.com");
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::{
    clock::{Clock, SystemClock},
    config::LockoutConfig,
};

/// Failed attempt state for one identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Consecutive failures since the last success or expiry.
    pub count: u32,
    /// Set only once `count` has reached the threshold.
    pub locked_until: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    /// A lockout exists and `now` is strictly past it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now > until)
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now <= until)
    }
}

/// Point-in-time view of an identifier's lockout state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutStatus {
    pub identifier: String,
    pub failed_attempts: u32,
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
    /// When this snapshot was taken.
    pub checked_at: DateTime<Utc>,
}

impl LockoutStatus {
    /// Seconds until the lockout ends, rounded up. `None` when not locked.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        if !self.is_locked {
            return None;
        }
        let remaining_ms = (self.locked_until? - self.checked_at).num_milliseconds();
        Some((remaining_ms.max(0) as u64).div_ceil(1000))
    }
}

/// In-memory brute force lockout tracker.
///
/// Tracks consecutive failed attempts per identifier and locks the identifier
/// once `max_failed_attempts` is reached. Every failure while at or above the
/// threshold pushes `locked_until` forward to `now + lockout_period`.
///
/// # Thread Safety
///
/// The tracker is `Send + Sync` and is meant to be shared behind an `Arc`.
/// Each operation holds the shard lock for the identifier's record for the
/// whole read-modify-write, so concurrent failures and lazy expiry of the same
/// identifier never interleave.
pub struct LockoutTracker {
    records: Arc<DashMap<String, AttemptRecord>>,
    config: LockoutConfig,
    clock: Arc<dyn Clock>,
}

impl LockoutTracker {
    /// Create a tracker that reads the system clock.
    ///
    /// The configuration is not validated here; call
    /// [`LockoutConfig::validate`] first (`LatchkeyBuilder::build` does).
    /// A zero `max_failed_attempts` locks on the first failure and a zero
    /// `cleanup_interval` makes the cleanup task panic.
    pub fn new(config: LockoutConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a tracker with an explicit time source.
    ///
    /// Same contract as [`new`](Self::new). Debug builds assert that the
    /// configuration validates.
    pub fn with_clock(config: LockoutConfig, clock: Arc<dyn Clock>) -> Self {
        debug_assert!(
            config.validate().is_ok(),
            "invalid lockout configuration: {config:?}"
        );
        Self {
            records: Arc::new(DashMap::new()),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Check whether an identifier is currently locked out.
    ///
    /// A lockout that has expired is removed together with the attempt count,
    /// so the identifier starts over from zero.
    pub fn is_locked(&self, identifier: &str) -> bool {
        if !self.config.enabled {
            return false;
        }

        let now = self.clock.now();
        if self
            .records
            .remove_if(identifier, |_, record| record.is_expired(now))
            .is_some()
        {
            tracing::debug!(identifier, "Lockout expired");
            return false;
        }

        self.records
            .get(identifier)
            .is_some_and(|record| record.is_locked(now))
    }

    /// Record a failed attempt.
    ///
    /// Returns `true` if the identifier is locked after this attempt.
    pub fn record_failed_attempt(&self, identifier: &str) -> bool {
        if !self.config.enabled {
            return false;
        }

        let now = self.clock.now();
        let mut record = self.records.entry(identifier.to_string()).or_default();
        record.count += 1;

        tracing::debug!(
            identifier,
            failed_attempts = record.count,
            max_failed_attempts = self.config.max_failed_attempts,
            "Failed attempt recorded"
        );

        if record.count >= self.config.max_failed_attempts {
            // Saturates for clocks near the end of the representable range
            let locked_until = now
                .checked_add_signed(self.config.lockout_period)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            record.locked_until = Some(locked_until);
            tracing::warn!(
                identifier,
                failed_attempts = record.count,
                locked_until = %locked_until,
                "Identifier locked out"
            );
            return true;
        }

        false
    }

    /// Forget all attempts for an identifier. Called after a successful login.
    pub fn clear_attempts(&self, identifier: &str) {
        self.records.remove(identifier);
    }

    /// Clear an identifier's state, returning whether it was locked.
    pub fn unlock_account(&self, identifier: &str) -> bool {
        let now = self.clock.now();
        self.records
            .remove(identifier)
            .is_some_and(|(_, record)| record.is_locked(now))
    }

    /// Minutes until the lockout ends, rounded up. Zero when not locked.
    ///
    /// A lockout that ended a moment ago reports 0 rather than a negative
    /// value. This does not expire the record; [`is_locked`](Self::is_locked)
    /// does that.
    pub fn get_remaining_lockout_time(&self, identifier: &str) -> u64 {
        let Some(locked_until) = self
            .records
            .get(identifier)
            .and_then(|record| record.locked_until)
        else {
            return 0;
        };

        let remaining_ms = (locked_until - self.clock.now()).num_milliseconds();
        if remaining_ms <= 0 {
            return 0;
        }
        (remaining_ms as u64).div_ceil(60_000)
    }

    /// Current failed attempt count, 0 for unknown identifiers.
    pub fn get_failed_attempts(&self, identifier: &str) -> u32 {
        self.records
            .get(identifier)
            .map(|record| record.count)
            .unwrap_or(0)
    }

    /// Snapshot an identifier's state without mutating it.
    pub fn lockout_status(&self, identifier: &str) -> LockoutStatus {
        let now = self.clock.now();
        let record = self
            .records
            .get(identifier)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        let is_locked = self.config.enabled && record.is_locked(now);

        LockoutStatus {
            identifier: identifier.to_string(),
            failed_attempts: record.count,
            is_locked,
            locked_until: if is_locked { record.locked_until } else { None },
            checked_at: now,
        }
    }

    /// Number of identifiers with tracked state.
    pub fn tracked_identifiers(&self) -> usize {
        self.records.len()
    }

    /// Remove every record whose lockout has expired.
    ///
    /// Records that are accumulating failures but not locked are kept.
    /// Returns the number of records removed.
    pub fn sweep(&self) -> usize {
        sweep_expired(&self.records, self.clock.now())
    }

    /// Start the background cleanup task.
    ///
    /// This spawns a task that runs [`sweep`](Self::sweep) every
    /// `cleanup_interval` until `shutdown` changes or its sender is dropped.
    ///
    /// # Arguments
    ///
    /// * `shutdown` - A watch receiver that signals when to stop the task
    ///
    /// # Returns
    ///
    /// A `JoinHandle` for the spawned task.
    pub fn start_cleanup_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let records = Arc::clone(&self.records);
        let clock = Arc::clone(&self.clock);
        let period = self.config.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let count = sweep_expired(&records, clock.now());
                        if count > 0 {
                            tracing::info!(
                                count = count,
                                "Cleaned up expired lockout records"
                            );
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down lockout cleanup task");
                        break;
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for LockoutTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockoutTracker")
            .field("config", &self.config)
            .field("tracked_identifiers", &self.records.len())
            .finish()
    }
}

fn sweep_expired(records: &DashMap<String, AttemptRecord>, now: DateTime<Utc>) -> usize {
    let before = records.len();
    records.retain(|_, record| !record.is_expired(now));
    before.saturating_sub(records.len())
}
