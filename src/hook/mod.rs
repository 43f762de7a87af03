//! Cooperative replacements for blocking calls.
//!
//! Worker threads of a [`Reactor`](crate::Reactor) run with hooking enabled.
//! When a call in this module targets a managed non-blocking socket from such
//! a thread, a would-block result turns into "register interest, suspend the
//! fiber, retry once resumed"; the sleep family never reaches the OS at all
//! and arms a timer instead. Everything else (the flag off, unmanaged
//! descriptors, user-requested non-blocking mode) falls through to the plain
//! syscall.

mod fd;

pub use fd::{FdCtx, FdRegistry, TimeoutKind};

use log::error;

use std::cell::Cell;
use std::io::{self, IoSlice, IoSliceMut};
use std::mem;
use std::net::SocketAddr;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::time::Duration;

use crate::fiber::Fiber;
use crate::reactor::{EventKind, Reactor};
use crate::scheduler::FiberTask;

thread_local! {
    static HOOK_ENABLED: Cell<bool> = const { Cell::new(false) };
}

/// Whether blocking-call hooking is active on the calling thread.
pub fn is_enabled() -> bool {
    HOOK_ENABLED.with(|flag| flag.get())
}

/// Turns hooking on or off for the calling thread. Worker loops enable it on
/// entry; application threads are off by default.
pub fn set_enabled(enabled: bool) {
    HOOK_ENABLED.with(|flag| flag.set(enabled));
}

// Process-wide default deadline for connect(); u64::MAX is the "no timeout"
// sentinel.
static CONNECT_TIMEOUT_MS: AtomicU64 = AtomicU64::new(u64::MAX);

/// Sets the default [`connect`] deadline, `None` for unbounded.
pub fn set_connect_timeout(ms: Option<u64>) {
    CONNECT_TIMEOUT_MS.store(ms.unwrap_or(u64::MAX), Ordering::SeqCst);
}

pub fn connect_timeout() -> Option<u64> {
    match CONNECT_TIMEOUT_MS.load(Ordering::SeqCst) {
        u64::MAX => None,
        ms => Some(ms),
    }
}

// Cancellation handshake between a suspended call and its timeout timer. The
// timer holds only a weak reference, so a call that already resumed (and
// dropped its flag) cannot be cancelled after the fact.
#[derive(Default)]
struct CancelFlag {
    errno: AtomicI32,
}

impl CancelFlag {
    fn set(&self, code: i32) {
        self.errno.store(code, Ordering::SeqCst);
    }

    fn get(&self) -> i32 {
        self.errno.load(Ordering::SeqCst)
    }
}

fn last_errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

fn check(n: libc::ssize_t) -> io::Result<usize> {
    if n < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(n as usize)
    }
}

/// Cooperative sleep. On a hooked fiber this arms a one-shot timer that
/// re-enqueues the fiber and suspends; elsewhere it is a plain thread sleep.
pub fn sleep(dur: Duration) {
    sleep_ms(dur.as_millis() as u64);
}

pub fn sleep_ms(ms: u64) {
    if is_enabled()
        && let Some(reactor) = Reactor::current()
        && let Some(fiber) = Fiber::current()
    {
        let target = reactor.clone();
        reactor.add_timer(
            ms,
            move || target.schedule(FiberTask::fiber(fiber.clone())),
            false,
        );
        Fiber::yield_hold();
        return;
    }
    std::thread::sleep(Duration::from_millis(ms));
}

/// Microsecond sleep; sub-millisecond remainders round down when hooked.
pub fn usleep(us: u64) {
    if is_enabled() && Reactor::current().is_some() {
        sleep_ms(us / 1000);
    } else {
        std::thread::sleep(Duration::from_micros(us));
    }
}

/// `socket(2)`. The new descriptor joins the calling reactor's managed table
/// when hooking is active (which also puts it into non-blocking mode).
pub fn socket(domain: i32, ty: i32, protocol: i32) -> io::Result<RawFd> {
    let fd = unsafe { libc::socket(domain, ty, protocol) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    if is_enabled()
        && let Some(reactor) = Reactor::current()
    {
        reactor.fd_registry().create(fd);
    }
    Ok(fd)
}

/// `connect(2)` with the process-wide default timeout.
pub fn connect(fd: RawFd, addr: &SocketAddr) -> io::Result<()> {
    connect_with_timeout(fd, addr, connect_timeout())
}

/// `connect(2)`. A hooked in-progress connect parks the fiber on write
/// readiness, bounded by `timeout_ms`, then reads the handshake outcome from
/// `SO_ERROR`.
pub fn connect_with_timeout(
    fd: RawFd,
    addr: &SocketAddr,
    timeout_ms: Option<u64>,
) -> io::Result<()> {
    let (storage, len) = sockaddr_from(addr);
    let raw = || unsafe { libc::connect(fd, &storage as *const _ as *const libc::sockaddr, len) };

    let reactor = if is_enabled() { Reactor::current() } else { None };
    let Some(reactor) = reactor else {
        return if raw() < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        };
    };
    let Some(ctx) = reactor.fd_registry().get(fd) else {
        return if raw() < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        };
    };
    if ctx.is_closed() {
        return Err(io::Error::from_raw_os_error(libc::EBADF));
    }
    if !ctx.is_socket() || ctx.user_nonblock() {
        return if raw() < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        };
    }

    if raw() == 0 {
        return Ok(());
    }
    if last_errno() != libc::EINPROGRESS {
        return Err(io::Error::last_os_error());
    }

    let flag = Arc::new(CancelFlag::default());
    let timer = timeout_ms.map(|ms| {
        let winfo = Arc::downgrade(&flag);
        let target = reactor.clone();
        reactor.add_condition_timer(
            ms,
            move || {
                let Some(flag) = winfo.upgrade() else {
                    return;
                };
                if flag.get() != 0 {
                    return;
                }
                flag.set(libc::ETIMEDOUT);
                target.cancel_event(fd, EventKind::Write);
            },
            Arc::downgrade(&flag),
            false,
        )
    });

    if let Err(err) = reactor.add_event(fd, EventKind::Write, None) {
        error!("connect: {err}");
        if let Some(timer) = &timer {
            timer.cancel();
        }
        return Err(err.into());
    }
    Fiber::yield_hold();
    if let Some(timer) = &timer {
        timer.cancel();
    }
    if flag.get() != 0 {
        return Err(io::Error::from_raw_os_error(flag.get()));
    }

    // Writable now; fetch the final outcome of the handshake.
    let mut err: libc::c_int = 0;
    let mut err_len = mem::size_of::<libc::c_int>() as libc::socklen_t;
    if unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_ERROR,
            &mut err as *mut _ as *mut _,
            &mut err_len,
        )
    } < 0
    {
        return Err(io::Error::last_os_error());
    }
    if err != 0 {
        return Err(io::Error::from_raw_os_error(err));
    }
    Ok(())
}

/// `accept(2)`; suspends until the listener is readable when hooked. The
/// accepted descriptor joins the reactor's managed table.
pub fn accept(fd: RawFd) -> io::Result<RawFd> {
    let n = do_io(fd, EventKind::Read, TimeoutKind::Recv, "accept", || unsafe {
        libc::accept(fd, std::ptr::null_mut(), std::ptr::null_mut()) as libc::ssize_t
    })?;
    let accepted = n as RawFd;
    if is_enabled()
        && let Some(reactor) = Reactor::current()
    {
        reactor.fd_registry().create(accepted);
    }
    Ok(accepted)
}

/// `close(2)`. A managed descriptor has both its event slots cancelled and
/// leaves the registry before the real close.
pub fn close(fd: RawFd) -> io::Result<()> {
    if is_enabled()
        && let Some(reactor) = Reactor::current()
        && reactor.fd_registry().get(fd).is_some()
    {
        reactor.cancel_all(fd);
        reactor.fd_registry().remove(fd);
    }
    if unsafe { libc::close(fd) } < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

pub fn read(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    do_io(fd, EventKind::Read, TimeoutKind::Recv, "read", || unsafe {
        libc::read(fd, buf.as_mut_ptr() as *mut _, buf.len())
    })
}

pub fn readv(fd: RawFd, bufs: &mut [IoSliceMut<'_>]) -> io::Result<usize> {
    do_io(fd, EventKind::Read, TimeoutKind::Recv, "readv", || unsafe {
        libc::readv(
            fd,
            bufs.as_mut_ptr() as *mut libc::iovec,
            bufs.len() as libc::c_int,
        )
    })
}

pub fn recv(fd: RawFd, buf: &mut [u8], flags: i32) -> io::Result<usize> {
    do_io(fd, EventKind::Read, TimeoutKind::Recv, "recv", || unsafe {
        libc::recv(fd, buf.as_mut_ptr() as *mut _, buf.len(), flags)
    })
}

/// `recvfrom(2)`; the peer address, when requested, lands in `src`.
pub fn recvfrom(
    fd: RawFd,
    buf: &mut [u8],
    flags: i32,
    src: Option<&mut libc::sockaddr_storage>,
) -> io::Result<usize> {
    let mut addr: *mut libc::sockaddr = std::ptr::null_mut();
    let mut addr_len: libc::socklen_t = 0;
    if let Some(storage) = src {
        addr = storage as *mut _ as *mut libc::sockaddr;
        addr_len = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
    }
    do_io(fd, EventKind::Read, TimeoutKind::Recv, "recvfrom", || unsafe {
        libc::recvfrom(
            fd,
            buf.as_mut_ptr() as *mut _,
            buf.len(),
            flags,
            addr,
            if addr.is_null() {
                std::ptr::null_mut()
            } else {
                &mut addr_len
            },
        )
    })
}

pub fn write(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    do_io(fd, EventKind::Write, TimeoutKind::Send, "write", || unsafe {
        libc::write(fd, buf.as_ptr() as *const _, buf.len())
    })
}

pub fn writev(fd: RawFd, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
    do_io(fd, EventKind::Write, TimeoutKind::Send, "writev", || unsafe {
        libc::writev(
            fd,
            bufs.as_ptr() as *const libc::iovec,
            bufs.len() as libc::c_int,
        )
    })
}

pub fn send(fd: RawFd, buf: &[u8], flags: i32) -> io::Result<usize> {
    do_io(fd, EventKind::Write, TimeoutKind::Send, "send", || unsafe {
        libc::send(fd, buf.as_ptr() as *const _, buf.len(), flags)
    })
}

pub fn sendto(fd: RawFd, buf: &[u8], flags: i32, addr: &SocketAddr) -> io::Result<usize> {
    let (storage, len) = sockaddr_from(addr);
    do_io(fd, EventKind::Write, TimeoutKind::Send, "sendto", || unsafe {
        libc::sendto(
            fd,
            buf.as_ptr() as *const _,
            buf.len(),
            flags,
            &storage as *const _ as *const libc::sockaddr,
            len,
        )
    })
}

/// `fcntl(F_SETFL)`. For a managed socket the user-visible `O_NONBLOCK` bit
/// is recorded in its context while the real descriptor stays non-blocking;
/// other flags pass through untouched.
pub fn fcntl_setfl(fd: RawFd, flags: i32) -> io::Result<()> {
    let mut real = flags;
    if let Some(ctx) = managed(fd)
        && ctx.is_socket()
        && !ctx.is_closed()
    {
        ctx.set_user_nonblock(flags & libc::O_NONBLOCK != 0);
        if ctx.sys_nonblock() {
            real |= libc::O_NONBLOCK;
        } else {
            real &= !libc::O_NONBLOCK;
        }
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, real) } < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// `fcntl(F_GETFL)`, reporting the mode the application last asked for on a
/// managed socket rather than the always-non-blocking real mode.
pub fn fcntl_getfl(fd: RawFd) -> io::Result<i32> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL, 0) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if let Some(ctx) = managed(fd)
        && ctx.is_socket()
        && !ctx.is_closed()
    {
        return Ok(if ctx.user_nonblock() {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        });
    }
    Ok(flags)
}

/// `ioctl(FIONBIO)`. For a managed socket only the user-visible mode is
/// recorded (the real descriptor stays non-blocking); other descriptors get
/// the real ioctl.
pub fn ioctl_fionbio(fd: RawFd, nonblocking: bool) -> io::Result<()> {
    if let Some(ctx) = managed(fd)
        && ctx.is_socket()
        && !ctx.is_closed()
    {
        ctx.set_user_nonblock(nonblocking);
        return Ok(());
    }
    let mut arg: libc::c_int = nonblocking as libc::c_int;
    if unsafe { libc::ioctl(fd, libc::FIONBIO as _, &mut arg as *mut libc::c_int) } < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn managed(fd: RawFd) -> Option<Arc<FdCtx>> {
    if !is_enabled() {
        return None;
    }
    Reactor::current()?.fd_registry().get(fd)
}

// The shared skeleton of every hooked I/O call: attempt, retry in place on
// EINTR, and on would-block park the calling fiber on the reactor (with an
// optional cancellation timer for the descriptor's configured timeout), then
// retry the call once resumed.
fn do_io(
    fd: RawFd,
    kind: EventKind,
    timeout_kind: TimeoutKind,
    name: &str,
    mut op: impl FnMut() -> libc::ssize_t,
) -> io::Result<usize> {
    if !is_enabled() {
        return check(op());
    }
    let Some(reactor) = Reactor::current() else {
        return check(op());
    };
    let Some(ctx) = reactor.fd_registry().get(fd) else {
        return check(op());
    };
    if ctx.is_closed() {
        return Err(io::Error::from_raw_os_error(libc::EBADF));
    }
    if !ctx.is_socket() || ctx.user_nonblock() {
        return check(op());
    }

    let timeout = ctx.timeout(timeout_kind);
    let flag = Arc::new(CancelFlag::default());

    loop {
        let mut n = op();
        while n < 0 && last_errno() == libc::EINTR {
            n = op();
        }
        if n >= 0 || last_errno() != libc::EAGAIN {
            return check(n);
        }

        let timer = timeout.map(|ms| {
            let winfo = Arc::downgrade(&flag);
            let target = reactor.clone();
            reactor.add_condition_timer(
                ms,
                move || {
                    let Some(flag) = winfo.upgrade() else {
                        return;
                    };
                    if flag.get() != 0 {
                        return;
                    }
                    flag.set(libc::ETIMEDOUT);
                    target.cancel_event(fd, kind);
                },
                Arc::downgrade(&flag),
                false,
            )
        });

        if let Err(err) = reactor.add_event(fd, kind, None) {
            error!("{name}: {err}");
            if let Some(timer) = &timer {
                timer.cancel();
            }
            return Err(err.into());
        }
        Fiber::yield_hold();
        if let Some(timer) = &timer {
            timer.cancel();
        }
        if flag.get() != 0 {
            return Err(io::Error::from_raw_os_error(flag.get()));
        }
        // Resumed by readiness; go around and retry the call.
    }
}

fn sockaddr_from(addr: &SocketAddr) -> (libc::sockaddr_storage, libc::socklen_t) {
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    match addr {
        SocketAddr::V4(v4) => {
            let sin = libc::sockaddr_in {
                sin_family: libc::AF_INET as libc::sa_family_t,
                sin_port: v4.port().to_be(),
                sin_addr: libc::in_addr {
                    s_addr: u32::from_ne_bytes(v4.ip().octets()),
                },
                sin_zero: [0; 8],
            };
            unsafe {
                std::ptr::write(&mut storage as *mut _ as *mut libc::sockaddr_in, sin);
            }
            (storage, mem::size_of::<libc::sockaddr_in>() as libc::socklen_t)
        }
        SocketAddr::V6(v6) => {
            let sin6 = libc::sockaddr_in6 {
                sin6_family: libc::AF_INET6 as libc::sa_family_t,
                sin6_port: v6.port().to_be(),
                sin6_flowinfo: v6.flowinfo(),
                sin6_addr: libc::in6_addr {
                    s6_addr: v6.ip().octets(),
                },
                sin6_scope_id: v6.scope_id(),
            };
            unsafe {
                std::ptr::write(&mut storage as *mut _ as *mut libc::sockaddr_in6, sin6);
            }
            (storage, mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t)
        }
    }
}
