//! End-to-end login flows through the Latchkey facade

use std::sync::Arc;

use chrono::Duration;
use latchkey::{
    AuditConfig, Latchkey, LatchkeyError, LockoutConfig, ManualClock, MemorySink, RequestContext,
};

fn setup(config: LockoutConfig) -> (Latchkey, Arc<MemorySink>, Arc<ManualClock>) {
    let sink = Arc::new(MemorySink::new());
    let clock = Arc::new(ManualClock::default());
    let latchkey = Latchkey::builder()
        .with_lockout(config)
        .with_audit_config(AuditConfig::production())
        .with_sink(sink.clone())
        .with_clock(clock.clone())
        .start_cleanup(false)
        .build()
        .expect("Failed to build Latchkey");
    (latchkey, sink, clock)
}

fn request() -> RequestContext {
    RequestContext::new()
        .with_request_id("req-1")
        .with_ip("192.0.2.10")
        .with_user_agent("integration-test")
}

fn events(sink: &MemorySink) -> Vec<String> {
    sink.bodies()
        .iter()
        .map(|b| b["event"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn test_five_failures_lock_the_account() {
    let (latchkey, sink, _clock) = setup(LockoutConfig::default());
    let req = request();

    for _ in 0..4 {
        latchkey.ensure_not_locked("a@x.com").unwrap();
        assert!(!latchkey.login_failed("a@x.com", &req, Some("invalid password")));
    }
    assert!(latchkey.login_failed("a@x.com", &req, Some("invalid password")));

    match latchkey.ensure_not_locked("a@x.com") {
        Err(LatchkeyError::AccountLocked {
            retry_after_minutes,
        }) => assert_eq!(retry_after_minutes, 15),
        other => panic!("Expected AccountLocked, got {other:?}"),
    }
    assert_eq!(latchkey.tracker().get_failed_attempts("a@x.com"), 5);

    let events = events(&sink);
    assert_eq!(events.len(), 6);
    assert!(events[..5].iter().all(|e| e == "LOGIN_FAILED"));
    assert_eq!(events[5], "ACCOUNT_LOCKED");
}

#[test]
fn test_success_resets_the_counter() {
    let (latchkey, sink, _clock) = setup(LockoutConfig::default());
    let req = request();

    for _ in 0..3 {
        latchkey.login_failed("a@x.com", &req, None);
    }
    latchkey.login_succeeded("a@x.com", &req);

    assert_eq!(latchkey.tracker().get_failed_attempts("a@x.com"), 0);
    assert_eq!(events(&sink).last().map(String::as_str), Some("LOGIN_SUCCESS"));

    // A fresh window: four more failures still do not lock
    for _ in 0..4 {
        assert!(!latchkey.login_failed("a@x.com", &req, None));
    }
    assert!(latchkey.ensure_not_locked("a@x.com").is_ok());
}

#[test]
fn test_lockout_expires_and_history_is_forgotten() {
    let (latchkey, _sink, clock) = setup(LockoutConfig {
        max_failed_attempts: 3,
        ..Default::default()
    });
    let req = request();

    for _ in 0..3 {
        latchkey.login_failed("a@x.com", &req, None);
    }
    assert!(latchkey.ensure_not_locked("a@x.com").is_err());

    clock.advance(Duration::minutes(15) + Duration::seconds(1));

    assert!(latchkey.ensure_not_locked("a@x.com").is_ok());
    assert_eq!(latchkey.tracker().get_failed_attempts("a@x.com"), 0);
    assert!(!latchkey.login_failed("a@x.com", &req, None));
}

#[test]
fn test_failures_while_locked_keep_extending_the_lockout() {
    let (latchkey, _sink, clock) = setup(LockoutConfig::default());
    let req = request();

    for _ in 0..5 {
        latchkey.login_failed("a@x.com", &req, None);
    }

    // An attacker who keeps failing every ten minutes never ages out
    for _ in 0..3 {
        clock.advance(Duration::minutes(10));
        assert!(latchkey.login_failed("a@x.com", &req, None));
        assert_eq!(latchkey.tracker().get_remaining_lockout_time("a@x.com"), 15);
    }

    clock.advance(Duration::minutes(14));
    assert!(latchkey.ensure_not_locked("a@x.com").is_err());
}

#[test]
fn test_audit_records_carry_request_context() {
    let (latchkey, sink, _clock) = setup(LockoutConfig::default());

    latchkey.login_failed("a@x.com", &request(), Some("unknown user"));

    let body = &sink.bodies()[0];
    assert_eq!(body["level"], "security");
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["ip"], "192.0.2.10");
    assert_eq!(body["requestId"], "req-1");
    assert_eq!(body["details"]["reason"], "unknown user");
}

#[test]
fn test_disabled_protection_still_audits() {
    let (latchkey, sink, _clock) = setup(LockoutConfig::disabled());
    let req = request();

    for _ in 0..10 {
        assert!(!latchkey.login_failed("a@x.com", &req, None));
    }

    assert!(latchkey.ensure_not_locked("a@x.com").is_ok());
    assert_eq!(sink.len(), 10);
}

#[test]
fn test_shared_across_threads() {
    let (latchkey, _sink, _clock) = setup(LockoutConfig {
        max_failed_attempts: 100,
        ..Default::default()
    });
    let latchkey = Arc::new(latchkey);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let latchkey = Arc::clone(&latchkey);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    latchkey.login_failed("shared@x.com", &RequestContext::new(), None);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(latchkey.tracker().get_failed_attempts("shared@x.com"), 100);
    assert!(latchkey.tracker().is_locked("shared@x.com"));
}
