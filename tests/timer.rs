use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::sleep;
use std::time::Duration;

use parking_lot::Mutex;
use strand::TimerSet;

#[test]
fn collect_expired_returns_due_subset_in_order() {
    let set = TimerSet::new();
    let fired = Arc::new(Mutex::new(Vec::new()));
    for (tag, ms) in [("a", 10u64), ("b", 30), ("c", 500)] {
        let fired = fired.clone();
        set.add_timer(ms, move || fired.lock().push(tag), false);
    }

    sleep(Duration::from_millis(60));
    let callbacks = set.collect_expired();
    assert_eq!(callbacks.len(), 2);
    for cb in &callbacks {
        cb();
    }
    assert_eq!(*fired.lock(), vec!["a", "b"]);
    // the 500ms timer is still armed
    assert!(set.has_timer());
}

#[test]
fn cancelled_timer_is_never_delivered() {
    let set = TimerSet::new();
    let fired = Arc::new(AtomicBool::new(false));
    let f = fired.clone();
    let timer = set.add_timer(10, move || f.store(true, Ordering::SeqCst), false);

    assert!(timer.cancel());
    assert!(!timer.cancel());
    sleep(Duration::from_millis(30));
    assert!(set.collect_expired().is_empty());
    assert!(!set.has_timer());
    assert!(!fired.load(Ordering::SeqCst));
}

#[test]
fn cancel_wins_even_after_the_deadline_passed() {
    let set = TimerSet::new();
    let fired = Arc::new(AtomicBool::new(false));
    let f = fired.clone();
    let timer = set.add_timer(5, move || f.store(true, Ordering::SeqCst), false);

    sleep(Duration::from_millis(20));
    // overdue, but not collected yet: cancellation must still win
    assert!(timer.cancel());
    assert!(set.collect_expired().is_empty());
    assert!(!fired.load(Ordering::SeqCst));
}

#[test]
fn recurring_timer_rearms_a_full_period_out() {
    let set = TimerSet::new();
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    set.add_timer(
        20,
        move || {
            c.fetch_add(1, Ordering::SeqCst);
        },
        true,
    );

    sleep(Duration::from_millis(30));
    for cb in set.collect_expired() {
        cb();
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(set.has_timer());
    let next = set.next_deadline().expect("recurring timer re-armed");
    assert!(next > 0 && next <= 20, "re-armed deadline out of range: {next}");

    sleep(Duration::from_millis(30));
    for cb in set.collect_expired() {
        cb();
    }
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn refresh_restarts_the_full_period() {
    let set = TimerSet::new();
    let timer = set.add_timer(30, || {}, false);

    sleep(Duration::from_millis(10));
    assert!(timer.refresh());
    let next = set.next_deadline().expect("timer present");
    assert!(next > 20, "refresh should restart the full period, got {next}");

    assert!(timer.cancel());
    assert!(!timer.refresh());
}

#[test]
fn refresh_fails_once_collected() {
    let set = TimerSet::new();
    let timer = set.add_timer(5, || {}, false);
    sleep(Duration::from_millis(15));
    let _ = set.collect_expired();
    assert!(!timer.refresh());
}

#[test]
fn reset_changes_the_period() {
    let set = TimerSet::new();
    let timer = set.add_timer(500, || {}, false);
    assert!(timer.reset(50, true));
    let next = set.next_deadline().expect("timer present");
    assert!(next <= 50, "reset deadline should count from now, got {next}");
}

#[test]
fn conditional_timer_is_a_noop_after_token_drop() {
    let set = TimerSet::new();
    let fired = Arc::new(AtomicBool::new(false));
    let f = fired.clone();
    let token = Arc::new(());
    set.add_condition_timer(
        5,
        move || f.store(true, Ordering::SeqCst),
        Arc::downgrade(&token),
        false,
    );
    drop(token);

    sleep(Duration::from_millis(15));
    for cb in set.collect_expired() {
        cb();
    }
    assert!(!fired.load(Ordering::SeqCst));
}

#[test]
fn earliest_insert_invokes_the_waker() {
    let wakes = Arc::new(AtomicUsize::new(0));
    let w = wakes.clone();
    let set = TimerSet::with_waker(move || {
        w.fetch_add(1, Ordering::SeqCst);
    });

    set.add_timer(500, || {}, false);
    assert_eq!(wakes.load(Ordering::SeqCst), 1);

    // simulate the idle loop observing the bound, re-arming the wake latch
    set.next_deadline();

    // a later deadline does not change the front and must not wake
    set.add_timer(800, || {}, false);
    assert_eq!(wakes.load(Ordering::SeqCst), 1);

    // an earlier deadline must wake whatever is blocked on the old bound
    set.add_timer(100, || {}, false);
    assert_eq!(wakes.load(Ordering::SeqCst), 2);
    let next = set.next_deadline().expect("timers present");
    assert!(next <= 100, "bound did not shrink: {next}");
}
