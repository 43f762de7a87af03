use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use strand::{EventKind, Reactor};

fn pipe() -> (RawFd, RawFd) {
    let mut fds = [0 as RawFd; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0, "pipe() failed");
    (fds[0], fds[1])
}

fn close(fd: RawFd) {
    unsafe { libc::close(fd) };
}

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
fn read_readiness_fires_the_callback() {
    let _ = env_logger::builder().is_test(true).try_init();
    let reactor = Reactor::new(1, false, "re_read");
    reactor.start();
    let (rfd, wfd) = pipe();

    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    reactor
        .add_event(
            rfd,
            EventKind::Read,
            Some(Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .expect("add_event failed");

    assert_eq!(unsafe { libc::write(wfd, b"x".as_ptr() as *const _, 1) }, 1);
    wait_for("read callback", || hits.load(Ordering::SeqCst) == 1);

    reactor.stop();
    close(rfd);
    close(wfd);
}

#[test]
fn cancel_event_fires_exactly_once_and_disarms() {
    let reactor = Reactor::new(1, false, "re_cancel");
    reactor.start();
    let (rfd, wfd) = pipe();

    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    reactor
        .add_event(
            rfd,
            EventKind::Read,
            Some(Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .expect("add_event failed");

    // cancelled before the fd ever became readable
    assert!(reactor.cancel_event(rfd, EventKind::Read));
    wait_for("cancelled callback", || hits.load(Ordering::SeqCst) == 1);
    // the slot was consumed: a second cancel has nothing to fire
    assert!(!reactor.cancel_event(rfd, EventKind::Read));

    // interest is disarmed, so readiness no longer fires anything
    assert_eq!(unsafe { libc::write(wfd, b"x".as_ptr() as *const _, 1) }, 1);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // and the kind can be re-armed without tripping the double-arm check;
    // the byte is already pending, so the edge is reported on re-add
    let hits2 = Arc::new(AtomicUsize::new(0));
    let h2 = hits2.clone();
    reactor
        .add_event(
            rfd,
            EventKind::Read,
            Some(Box::new(move || {
                h2.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .expect("re-arm failed");
    wait_for("re-armed callback", || hits2.load(Ordering::SeqCst) == 1);

    reactor.stop();
    close(rfd);
    close(wfd);
}

#[test]
fn del_event_disarms_without_firing() {
    let reactor = Reactor::new(1, false, "re_del");
    reactor.start();
    let (rfd, wfd) = pipe();

    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    reactor
        .add_event(
            rfd,
            EventKind::Read,
            Some(Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .expect("add_event failed");

    assert!(reactor.del_event(rfd, EventKind::Read));
    assert!(!reactor.del_event(rfd, EventKind::Read));

    assert_eq!(unsafe { libc::write(wfd, b"x".as_ptr() as *const _, 1) }, 1);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    reactor.stop();
    close(rfd);
    close(wfd);
}

#[test]
#[should_panic(expected = "already armed")]
fn double_arm_is_an_invariant_violation() {
    let reactor = Reactor::new(1, false, "re_dup");
    let (rfd, _wfd) = pipe();
    reactor
        .add_event(rfd, EventKind::Read, Some(Box::new(|| {})))
        .expect("first arm failed");
    let _ = reactor.add_event(rfd, EventKind::Read, Some(Box::new(|| {})));
}

#[test]
fn stop_waits_for_pending_timers() {
    let reactor = Reactor::new(1, false, "re_timer");
    reactor.start();

    let fired = Arc::new(AtomicUsize::new(0));
    let f = fired.clone();
    let start = Instant::now();
    reactor.add_timer(
        80,
        move || {
            f.fetch_add(1, Ordering::SeqCst);
        },
        false,
    );

    thread::sleep(Duration::from_millis(10));
    reactor.stop();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() >= Duration::from_millis(80));
    assert!(reactor.stopping());
}

#[test]
fn cancel_all_fires_both_kinds() {
    let reactor = Reactor::new(1, false, "re_all");
    reactor.start();
    let (rfd, wfd) = pipe();

    // both kinds armed on the idle read end: neither fires on its own
    let hits = Arc::new(AtomicUsize::new(0));
    let h1 = hits.clone();
    let h2 = hits.clone();
    reactor
        .add_event(
            rfd,
            EventKind::Read,
            Some(Box::new(move || {
                h1.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .expect("arm read failed");
    reactor
        .add_event(
            rfd,
            EventKind::Write,
            Some(Box::new(move || {
                h2.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .expect("arm write failed");

    assert!(reactor.cancel_all(rfd));
    wait_for("both cancellations", || hits.load(Ordering::SeqCst) == 2);
    assert!(!reactor.cancel_all(rfd));

    reactor.stop();
    close(rfd);
    close(wfd);
}
