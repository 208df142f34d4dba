use super::*;

#[test]
fn manual_clock_is_shared_between_clones() {
    let a = ManualClock::new();
    let b = a.clone();
    assert_eq!(b.now(), Duration::ZERO);
    a.advance(Duration::from_millis(250));
    assert_eq!(b.now(), Duration::from_millis(250));
}

#[test]
fn manual_clock_never_moves_backwards() {
    let c = ManualClock::new();
    c.set(Duration::from_secs(2));
    c.set(Duration::from_secs(1));
    assert_eq!(c.now(), Duration::from_secs(2));
}

#[test]
fn system_clock_is_monotonic() {
    let c = SystemClock::new();
    let a = c.now();
    let b = c.now();
    assert!(b >= a);
}
