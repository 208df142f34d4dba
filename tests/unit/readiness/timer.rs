use super::*;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[test]
fn expired_returns_earliest_first_and_removes() {
    let mut w = TimerWheel::new();
    w.schedule(HandleId(1), ms(300));
    w.schedule(HandleId(2), ms(100));
    w.schedule(HandleId(3), ms(200));

    let fired = w.expired(ms(250));
    assert_eq!(fired.as_slice(), &[HandleId(2), HandleId(3)]);
    assert_eq!(w.len(), 1);
    assert!(w.expired(ms(250)).is_empty());
    assert_eq!(w.next_deadline(), Some(ms(300)));
}

#[test]
fn defused_timer_never_fires() {
    let mut w = TimerWheel::new();
    w.schedule(HandleId(1), ms(10));
    assert!(w.defuse(HandleId(1)));
    assert!(!w.defuse(HandleId(1)));
    assert!(w.expired(ms(1_000)).is_empty());
}

#[test]
fn reschedule_replaces_previous_deadline() {
    let mut w = TimerWheel::new();
    w.schedule(HandleId(4), ms(10));
    w.schedule(HandleId(4), ms(50));
    assert_eq!(w.len(), 1);
    assert!(w.expired(ms(20)).is_empty());
    assert_eq!(w.deadline_of(HandleId(4)), Some(ms(50)));
}

#[test]
fn equal_deadlines_fire_in_id_order() {
    let mut w = TimerWheel::new();
    w.schedule(HandleId(9), ms(5));
    w.schedule(HandleId(3), ms(5));
    let fired = w.expired(ms(5));
    assert_eq!(fired.as_slice(), &[HandleId(3), HandleId(9)]);
}

#[test]
fn clear_disarms_everything() {
    let mut w = TimerWheel::new();
    w.schedule(HandleId(1), ms(1));
    w.schedule(HandleId(2), ms(2));
    w.clear();
    assert_eq!(w.len(), 0);
    assert_eq!(w.next_deadline(), None);
    assert!(w.expired(ms(10)).is_empty());
}
