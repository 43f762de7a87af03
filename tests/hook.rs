use std::io;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use strand::Reactor;
use strand::hook::{self, TimeoutKind};

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
fn hooked_sleep_yields_to_other_tasks() {
    let _ = env_logger::builder().is_test(true).try_init();
    let reactor = Reactor::new(1, false, "hook_sleep");
    reactor.start();

    let order = Arc::new(Mutex::new(Vec::new()));
    let elapsed = Arc::new(Mutex::new(Duration::ZERO));
    let start = Instant::now();
    {
        let order = order.clone();
        let elapsed = elapsed.clone();
        reactor.spawn(move || {
            hook::sleep(Duration::from_millis(200));
            order.lock().push("sleeper");
            *elapsed.lock() = start.elapsed();
        });
    }
    {
        let order = order.clone();
        reactor.spawn(move || order.lock().push("other"));
    }

    wait_for("both tasks", || order.lock().len() == 2);
    reactor.stop();

    // the single worker ran the second task to completion while the first
    // one was parked on its timer
    assert_eq!(*order.lock(), vec!["other", "sleeper"]);
    assert!(*elapsed.lock() >= Duration::from_millis(200));
}

#[test]
fn sleep_outside_the_runtime_blocks_the_thread() {
    assert!(!hook::is_enabled());
    let start = Instant::now();
    hook::sleep_ms(30);
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[test]
fn recv_times_out_on_a_managed_socket() {
    let reactor = Reactor::new(1, false, "hook_to");
    reactor.start();

    let mut fds = [0 as RawFd; 2];
    assert_eq!(
        unsafe { libc::socketpair(libc::AF_UNIX, libc::SOCK_STREAM, 0, fds.as_mut_ptr()) },
        0,
        "socketpair() failed"
    );
    let (a, b) = (fds[0], fds[1]);

    let outcome: Arc<Mutex<Option<(io::ErrorKind, Duration)>>> = Arc::new(Mutex::new(None));
    let o = outcome.clone();
    let r = reactor.clone();
    reactor.spawn(move || {
        let ctx = r.fd_registry().create(a);
        ctx.set_timeout(TimeoutKind::Recv, Some(100));
        let start = Instant::now();
        let mut buf = [0u8; 8];
        let err = hook::recv(a, &mut buf, 0).expect_err("nothing was sent");
        *o.lock() = Some((err.kind(), start.elapsed()));
    });

    wait_for("recv timeout", || outcome.lock().is_some());
    reactor.stop();

    let (kind, elapsed) = outcome.lock().take().expect("outcome recorded");
    assert_eq!(kind, io::ErrorKind::TimedOut);
    assert!(elapsed >= Duration::from_millis(100));

    unsafe {
        libc::close(a);
        libc::close(b);
    }
}

#[test]
fn recv_resumes_when_data_arrives() {
    let reactor = Reactor::new(1, false, "hook_rw");
    reactor.start();

    let mut fds = [0 as RawFd; 2];
    assert_eq!(
        unsafe { libc::socketpair(libc::AF_UNIX, libc::SOCK_STREAM, 0, fds.as_mut_ptr()) },
        0,
        "socketpair() failed"
    );
    let (a, b) = (fds[0], fds[1]);

    let got = Arc::new(Mutex::new(Vec::new()));
    let g = got.clone();
    let r = reactor.clone();
    reactor.spawn(move || {
        r.fd_registry().create(a);
        let mut buf = [0u8; 16];
        let n = hook::recv(a, &mut buf, 0).expect("recv failed");
        g.lock().extend_from_slice(&buf[..n]);
    });

    // let the fiber reach its suspension point, then satisfy it
    thread::sleep(Duration::from_millis(50));
    assert_eq!(
        unsafe { libc::write(b, b"ping".as_ptr() as *const _, 4) },
        4
    );

    wait_for("recv completion", || !got.lock().is_empty());
    reactor.stop();
    assert_eq!(&*got.lock(), b"ping");

    unsafe {
        libc::close(a);
        libc::close(b);
    }
}

#[test]
fn pipe_fds_pass_straight_through() {
    let reactor = Reactor::new(1, false, "hook_pipe");
    reactor.start();

    let mut fds = [0 as RawFd; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0, "pipe() failed");
    let (rfd, wfd) = (fds[0], fds[1]);

    let done = Arc::new(AtomicBool::new(false));
    let d = done.clone();
    let r = reactor.clone();
    reactor.spawn(move || {
        // registered but not a socket: every call hits the plain syscall
        r.fd_registry().create(rfd);
        assert_eq!(hook::write(wfd, b"ping").expect("write failed"), 4);
        let mut buf = [0u8; 8];
        assert_eq!(hook::read(rfd, &mut buf).expect("read failed"), 4);
        assert_eq!(&buf[..4], b"ping");
        d.store(true, Ordering::SeqCst);
    });

    wait_for("pipe round trip", || done.load(Ordering::SeqCst));
    reactor.stop();
    unsafe {
        libc::close(rfd);
        libc::close(wfd);
    }
}

#[test]
fn hook_flag_is_scoped_to_worker_threads() {
    assert!(!hook::is_enabled());
    let reactor = Reactor::new(1, false, "hook_flag");
    reactor.start();

    let on_worker = Arc::new(AtomicBool::new(false));
    let o = on_worker.clone();
    reactor.spawn(move || o.store(hook::is_enabled(), Ordering::SeqCst));

    wait_for("flag probe", || on_worker.load(Ordering::SeqCst));
    reactor.stop();
    assert!(on_worker.load(Ordering::SeqCst));
    assert!(!hook::is_enabled());
}

#[test]
fn user_nonblock_mode_surfaces_would_block() {
    let reactor = Reactor::new(1, false, "hook_nb");
    reactor.start();

    let mut fds = [0 as RawFd; 2];
    assert_eq!(
        unsafe { libc::socketpair(libc::AF_UNIX, libc::SOCK_STREAM, 0, fds.as_mut_ptr()) },
        0,
        "socketpair() failed"
    );
    let (a, b) = (fds[0], fds[1]);

    let outcome: Arc<Mutex<Option<io::ErrorKind>>> = Arc::new(Mutex::new(None));
    let o = outcome.clone();
    let r = reactor.clone();
    reactor.spawn(move || {
        r.fd_registry().create(a);
        // the application asked for non-blocking mode itself: no suspension
        hook::ioctl_fionbio(a, true).expect("ioctl failed");
        let mut buf = [0u8; 8];
        let err = hook::recv(a, &mut buf, 0).expect_err("nothing was sent");
        *o.lock() = Some(err.kind());
    });

    wait_for("nonblocking recv", || outcome.lock().is_some());
    reactor.stop();
    assert_eq!(
        outcome.lock().take().expect("outcome recorded"),
        io::ErrorKind::WouldBlock
    );

    unsafe {
        libc::close(a);
        libc::close(b);
    }
}
