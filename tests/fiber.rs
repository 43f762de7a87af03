use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use strand::{Fiber, FiberState};

#[test]
fn state_machine_walk() {
    let steps = Arc::new(AtomicUsize::new(0));
    let s = steps.clone();
    let fiber = Fiber::new(
        move || {
            s.fetch_add(1, Ordering::SeqCst);
            Fiber::yield_hold();
            s.fetch_add(1, Ordering::SeqCst);
            Fiber::yield_ready();
            s.fetch_add(1, Ordering::SeqCst);
        },
        0,
    );
    assert_eq!(fiber.state(), FiberState::Init);

    fiber.resume();
    assert_eq!(fiber.state(), FiberState::Hold);
    assert_eq!(steps.load(Ordering::SeqCst), 1);

    fiber.resume();
    assert_eq!(fiber.state(), FiberState::Ready);
    assert_eq!(steps.load(Ordering::SeqCst), 2);

    fiber.resume();
    assert_eq!(fiber.state(), FiberState::Term);
    assert_eq!(steps.load(Ordering::SeqCst), 3);
}

#[test]
fn current_tracks_executing_fiber() {
    assert_eq!(Fiber::current_id(), 0);
    assert!(Fiber::current().is_none());

    let fiber = Fiber::new(
        || {
            let cur = Fiber::current().expect("inside a fiber");
            assert_eq!(cur.id(), Fiber::current_id());
            assert_eq!(cur.state(), FiberState::Exec);
        },
        0,
    );
    fiber.resume();
    // A panic inside the entry would have left the fiber in Except.
    assert_eq!(fiber.state(), FiberState::Term);
    assert_eq!(Fiber::current_id(), 0);
}

#[test]
fn reset_reuses_fiber_identity() {
    let first = Arc::new(AtomicUsize::new(0));
    let f = first.clone();
    let fiber = Fiber::new(
        move || {
            f.fetch_add(1, Ordering::SeqCst);
        },
        0,
    );
    fiber.resume();
    assert_eq!(fiber.state(), FiberState::Term);
    assert_eq!(first.load(Ordering::SeqCst), 1);
    let id = fiber.id();

    let second = Arc::new(AtomicUsize::new(0));
    let s = second.clone();
    fiber.reset(move || {
        s.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(fiber.state(), FiberState::Init);
    assert_eq!(fiber.id(), id);

    fiber.resume();
    assert_eq!(fiber.state(), FiberState::Term);
    assert_eq!(second.load(Ordering::SeqCst), 1);
    assert_eq!(first.load(Ordering::SeqCst), 1);
}

#[test]
fn panic_in_entry_becomes_except() {
    let fiber = Fiber::new(|| panic!("entry blew up"), 0);
    fiber.resume();
    assert_eq!(fiber.state(), FiberState::Except);
}

#[test]
#[should_panic(expected = "non-resumable")]
fn resuming_finished_fiber_panics() {
    let fiber = Fiber::new(|| {}, 0);
    fiber.resume();
    fiber.resume();
}

#[test]
fn exec_state_is_per_thread() {
    let handles: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(|| {
                for _ in 0..50 {
                    let fiber = Fiber::new(
                        || {
                            let cur = Fiber::current().expect("inside a fiber");
                            assert_eq!(cur.state(), FiberState::Exec);
                            Fiber::yield_ready();
                        },
                        0,
                    );
                    fiber.resume();
                    assert_eq!(fiber.state(), FiberState::Ready);
                    fiber.resume();
                    assert_eq!(fiber.state(), FiberState::Term);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
}
