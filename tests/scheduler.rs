use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use strand::{Fiber, FiberTask, Scheduler};

fn wait_for(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("timed out waiting for {what}");
}

#[test]
fn callbacks_run_exactly_once_each() {
    let sched = Scheduler::new(2, false, "sched_abc");
    let count = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let count = count.clone();
        sched.spawn(move || {
            count.fetch_add(1, Ordering::SeqCst);
        });
    }

    sched.start();
    wait_for("3 callbacks", || count.load(Ordering::SeqCst) == 3);
    sched.stop();

    assert_eq!(count.load(Ordering::SeqCst), 3);
    assert!(sched.stopping());
}

#[test]
fn pinned_task_runs_on_its_worker() {
    let sched = Scheduler::new(2, false, "sched_pin");
    sched.start();

    let name = Arc::new(Mutex::new(String::new()));
    let n = name.clone();
    sched.schedule(
        FiberTask::call(move || {
            *n.lock() = thread::current().name().unwrap_or("").to_string();
        })
        .pinned(1),
    );

    wait_for("pinned task", || !name.lock().is_empty());
    sched.stop();
    assert_eq!(&*name.lock(), "sched_pin_1");
}

#[test]
fn ready_yield_requeues_the_fiber() {
    let sched = Scheduler::new(1, false, "sched_rr");
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let fiber = Fiber::new(
        move || {
            for _ in 0..3 {
                c.fetch_add(1, Ordering::SeqCst);
                Fiber::yield_ready();
            }
            c.fetch_add(1, Ordering::SeqCst);
        },
        0,
    );
    sched.schedule(FiberTask::fiber(fiber));

    sched.start();
    wait_for("fiber completion", || count.load(Ordering::SeqCst) == 4);
    sched.stop();
    assert!(sched.stopping());
}

#[test]
fn use_caller_flushes_remaining_work_on_stop() {
    let sched = Scheduler::new(1, true, "sched_uc");
    let ran = Arc::new(AtomicUsize::new(0));
    let r = ran.clone();
    sched.spawn(move || {
        r.fetch_add(1, Ordering::SeqCst);
    });

    // no thread is spawned; the work drains on this thread inside stop()
    sched.start();
    sched.stop();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert!(sched.stopping());
}

#[test]
fn tasks_spread_across_workers() {
    let sched = Scheduler::new(2, false, "sched_spread");
    sched.start();

    let count = Arc::new(AtomicUsize::new(0));
    for _ in 0..16 {
        let count = count.clone();
        sched.spawn(move || {
            // keep the worker busy long enough for the queue to back up
            thread::sleep(Duration::from_millis(5));
            count.fetch_add(1, Ordering::SeqCst);
        });
    }
    wait_for("16 callbacks", || count.load(Ordering::SeqCst) == 16);
    sched.stop();
    assert_eq!(count.load(Ordering::SeqCst), 16);
}
