//! Service layer
//!
//! This module contains the stateful services consumed by authentication
//! handlers.

pub mod lockout;

pub use lockout::{AttemptRecord, LockoutStatus, LockoutTracker};
