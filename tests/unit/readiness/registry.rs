use super::*;
use crate::foundation::clock::ManualClock;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn registry(default_ms: u64) -> (ManualClock, ReadinessRegistry) {
    let clock = ManualClock::new();
    let reg = ReadinessRegistry::new(Arc::new(clock.clone()), ms(default_ms));
    (clock, reg)
}

#[test]
fn ready_iff_no_unresolved_registrations() {
    let (_clock, mut reg) = registry(1_000);
    assert!(reg.is_ready());

    let a = reg.register(Some("a"));
    let b = reg.register(None);
    let c = reg.register(Some("c"));
    assert!(!reg.is_ready());
    assert_eq!(reg.pending_count(), 3);

    // Completion order is independent of registration order.
    assert_eq!(reg.resolve(b), ResolveOutcome::Resolved { now_ready: false });
    assert_eq!(reg.resolve(c), ResolveOutcome::Resolved { now_ready: false });
    assert!(!reg.is_ready());
    assert_eq!(reg.resolve(a), ResolveOutcome::Resolved { now_ready: true });
    assert!(reg.is_ready());
}

#[test]
fn handle_ids_are_unique() {
    let (_clock, mut reg) = registry(1_000);
    let ids: std::collections::HashSet<_> = (0..50).map(|_| reg.register(None)).collect();
    assert_eq!(ids.len(), 50);
}

#[test]
fn duplicate_and_unknown_resolution_is_ignored() {
    let (_clock, mut reg) = registry(1_000);
    let a = reg.register(Some("a"));
    let b = reg.register(Some("b"));
    assert!(matches!(reg.resolve(a), ResolveOutcome::Resolved { .. }));

    let before = reg.is_ready();
    match reg.resolve(a) {
        ResolveOutcome::Ignored { reason } => assert_eq!(reason, "already continued"),
        other => panic!("expected ignored, got {other:?}"),
    }
    match reg.resolve(HandleId(999)) {
        ResolveOutcome::Ignored { reason } => assert_eq!(reason, "unknown handle"),
        other => panic!("expected ignored, got {other:?}"),
    }
    assert_eq!(reg.is_ready(), before);
    assert_eq!(reg.pending_count(), 1);

    // A duplicate never re-arms: resolving the remaining one still makes us ready.
    assert_eq!(reg.resolve(b), ResolveOutcome::Resolved { now_ready: true });
    assert!(matches!(reg.cancel(b), ResolveOutcome::Ignored { .. }));
    assert!(reg.is_ready());
}

#[test]
fn resolve_before_deadline_leaves_no_error() {
    let (clock, mut reg) = registry(30_000);
    let h1 = reg.register_with_timeout(Some("h1"), Some(ms(1_000)));
    clock.advance(ms(500));
    assert_eq!(reg.poll_timeouts(), 0);
    assert!(matches!(reg.resolve(h1), ResolveOutcome::Resolved { now_ready: true }));

    clock.advance(ms(10_000));
    assert_eq!(reg.poll_timeouts(), 0);
    assert!(reg.is_ready());
    assert!(reg.last_error().is_none());
}

#[test]
fn expired_handle_blocks_readiness_until_reset() {
    let (clock, mut reg) = registry(30_000);
    let h2 = reg.register_with_timeout(Some("h2"), Some(ms(100)));
    let other = reg.register(Some("other"));

    clock.advance(ms(99));
    assert_eq!(reg.poll_timeouts(), 0);
    assert!(reg.last_error().is_none());

    clock.advance(ms(1));
    assert_eq!(reg.poll_timeouts(), 1);
    assert!(!reg.is_ready());
    assert_eq!(
        reg.last_error(),
        Some(&RenderFailure::Timeout {
            id: h2,
            label: Some("h2".to_owned()),
            timeout: ms(100),
        })
    );

    // Everything else resolving does not bring readiness back.
    assert!(matches!(reg.resolve(other), ResolveOutcome::Resolved { now_ready: false }));
    assert!(!reg.is_ready());
    match reg.resolve(h2) {
        ResolveOutcome::Ignored { reason } => assert_eq!(reason, "already timed out"),
        other => panic!("expected ignored, got {other:?}"),
    }
    let err = reg.check().unwrap_err();
    assert!(err.to_string().contains("h2"));

    reg.reset();
    assert!(reg.is_ready());
    assert!(reg.check().is_ok());
}

#[test]
fn independent_deadlines_do_not_interact() {
    let (clock, mut reg) = registry(30_000);
    let slow = reg.register_with_timeout(Some("slow"), Some(ms(500)));
    let fast = reg.register_with_timeout(Some("fast"), Some(ms(50)));
    assert!(matches!(reg.resolve(fast), ResolveOutcome::Resolved { .. }));

    clock.advance(ms(200));
    assert_eq!(reg.poll_timeouts(), 0);
    assert_eq!(reg.pending()[0].id, slow);
    assert_eq!(reg.pending()[0].remaining, ms(300));
}

#[test]
fn first_failure_wins() {
    let (clock, mut reg) = registry(10);
    let a = reg.register(Some("a"));
    clock.advance(ms(10));
    reg.poll_timeouts();
    reg.fail("later crash");
    assert!(matches!(
        reg.last_error(),
        Some(RenderFailure::Timeout { id, .. }) if *id == a
    ));
}

#[test]
fn cancel_render_sets_page_error() {
    let (_clock, mut reg) = registry(1_000);
    reg.fail("font failed to load");
    assert!(!reg.is_ready());
    let err = reg.check().unwrap_err();
    assert!(matches!(err, BridgeError::Cancelled(ref m) if m == "font failed to load"));
}

#[test]
fn cancel_all_defuses_every_timer() {
    let (clock, mut reg) = registry(100);
    let a = reg.register(None);
    reg.register(None);
    assert_eq!(reg.cancel_all(), 2);
    assert!(reg.is_ready());
    assert_eq!(reg.next_deadline(), None);

    clock.advance(ms(1_000));
    assert_eq!(reg.poll_timeouts(), 0);
    assert!(reg.last_error().is_none());
    assert!(matches!(reg.resolve(a), ResolveOutcome::Ignored { .. }));
}

#[test]
fn ids_are_not_reused_after_reset() {
    let (_clock, mut reg) = registry(100);
    let before = reg.register(None);
    reg.reset();
    let after = reg.register(None);
    assert!(after > before);
    match reg.resolve(before) {
        ResolveOutcome::Ignored { reason } => assert_eq!(reason, "unknown handle"),
        other => panic!("expected ignored, got {other:?}"),
    }
    assert!(!reg.is_ready());
}

#[test]
fn settlement_history_is_bounded() {
    let (_clock, mut reg) = registry(1_000);
    let first = reg.register(Some("first"));
    assert!(matches!(reg.resolve(first), ResolveOutcome::Resolved { .. }));
    for _ in 0..SETTLED_HISTORY + 10 {
        let id = reg.register(None);
        let _ = reg.resolve(id);
    }
    assert_eq!(reg.settled.len(), SETTLED_HISTORY);

    // Evicted entries are still recognised as settled, never as unknown.
    match reg.resolve(first) {
        ResolveOutcome::Ignored { reason } => assert_eq!(reason, "already settled"),
        other => panic!("expected ignored, got {other:?}"),
    }
    let last = reg.register(None);
    let _ = reg.cancel(last);
    match reg.resolve(last) {
        ResolveOutcome::Ignored { reason } => assert_eq!(reason, "already cancelled"),
        other => panic!("expected ignored, got {other:?}"),
    }
    assert!(reg.is_ready());
}
