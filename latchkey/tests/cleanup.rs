//! Tests for the background cleanup task lifecycle

use std::sync::Arc;

use chrono::Duration;
use latchkey::{AuditConfig, Latchkey, LockoutConfig, ManualClock, MemorySink};

#[tokio::test]
async fn test_cleanup_task_removes_expired_lockouts() {
    let _ = tracing_subscriber::fmt::try_init();

    let clock = Arc::new(ManualClock::default());
    let latchkey = Latchkey::builder()
        .with_lockout(LockoutConfig {
            max_failed_attempts: 2,
            cleanup_interval: std::time::Duration::from_millis(20),
            ..Default::default()
        })
        .with_audit_config(AuditConfig::production())
        .with_sink(Arc::new(MemorySink::new()))
        .with_clock(clock.clone())
        .build()
        .expect("Failed to build Latchkey");

    let tracker = latchkey.tracker();
    tracker.record_failed_attempt("locked@x.com");
    tracker.record_failed_attempt("locked@x.com");
    tracker.record_failed_attempt("pending@x.com");
    assert_eq!(tracker.tracked_identifiers(), 2);

    clock.advance(Duration::minutes(16));
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    // Only the expired lockout is swept; the pending count survives
    assert_eq!(tracker.tracked_identifiers(), 1);
    assert_eq!(tracker.get_failed_attempts("pending@x.com"), 1);

    latchkey.shutdown().await.expect("Cleanup task failed");
}

#[tokio::test]
async fn test_shutdown_stops_the_task() {
    let latchkey = Latchkey::builder()
        .with_audit_config(AuditConfig::production())
        .with_sink(Arc::new(MemorySink::new()))
        .build()
        .expect("Failed to build Latchkey");
    assert!(latchkey.is_cleanup_running());

    let tracker = Arc::clone(latchkey.tracker());
    latchkey.shutdown().await.expect("Cleanup task failed");

    // The tracker outlives the facade and keeps working
    tracker.record_failed_attempt("a@x.com");
    assert_eq!(tracker.get_failed_attempts("a@x.com"), 1);
}

#[tokio::test]
async fn test_shutdown_without_cleanup_is_a_noop() {
    let latchkey = Latchkey::builder()
        .with_audit_config(AuditConfig::production())
        .start_cleanup(false)
        .build()
        .expect("Failed to build Latchkey");

    latchkey.shutdown().await.expect("Shutdown failed");
}
