//! Core functionality for latchkey
//!
//! This crate contains the two pieces an authentication handler needs to resist
//! credential guessing:
//!
//! - [`LockoutTracker`]: per-identifier failed attempt counting with a
//!   time-bounded lockout, lazy expiry and a background sweep.
//! - [`SecurityAuditLog`]: structured, redaction-safe audit records for login
//!   outcomes, lockouts and errors.
//!
//! The two are independent. Handlers call the tracker around credential
//! verification and report each transition to the audit log themselves.
//!
//! ```rust
//! use latchkey_core::{LockoutConfig, LockoutTracker};
//!
//! let tracker = LockoutTracker::new(LockoutConfig::default());
//! for _ in 0..4 {
//!     assert!(!tracker.record_failed_attempt("a@x.com"));
//! }
//! assert!(tracker.record_failed_attempt("a@x.com"));
//! assert!(tracker.is_locked("a@x.com"));
//! ```
pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod services;

pub use audit::{ErrorReport, RequestContext, SecurityAuditLog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuditConfig, DeploymentMode, LockoutConfig};
pub use error::Error;
pub use services::{LockoutStatus, LockoutTracker};
