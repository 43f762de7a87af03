//! Managed-descriptor bookkeeping.
//!
//! The hook layer only rewrites calls against descriptors it knows about.
//! An [`FdCtx`] records whether the descriptor is a socket, its blocking
//! modes (the user-visible one and the real one) and its per-direction
//! timeouts; the [`FdRegistry`] is the fd-indexed table a reactor owns.

use parking_lot::RwLock;

use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

// Internal "no timeout" sentinel.
const NO_TIMEOUT: u64 = u64::MAX;

/// Direction selector for [`FdCtx`] timeouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeoutKind {
    Recv,
    Send,
}

/// Hook-layer state for one managed descriptor.
pub struct FdCtx {
    fd: RawFd,
    is_socket: bool,
    sys_nonblock: AtomicBool,
    user_nonblock: AtomicBool,
    closed: AtomicBool,
    recv_timeout: AtomicU64,
    send_timeout: AtomicU64,
}

impl FdCtx {
    // Probes the descriptor kind; sockets are switched to non-blocking mode
    // on registration so a hooked call can never stall its worker thread.
    fn new(fd: RawFd) -> FdCtx {
        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        let is_socket = unsafe { libc::fstat(fd, &mut stat) } == 0
            && (stat.st_mode & libc::S_IFMT) == libc::S_IFSOCK;
        let mut sys_nonblock = false;
        if is_socket {
            let flags = unsafe { libc::fcntl(fd, libc::F_GETFL, 0) };
            if flags >= 0 && flags & libc::O_NONBLOCK == 0 {
                unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
            }
            sys_nonblock = true;
        }
        FdCtx {
            fd,
            is_socket,
            sys_nonblock: AtomicBool::new(sys_nonblock),
            user_nonblock: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            recv_timeout: AtomicU64::new(NO_TIMEOUT),
            send_timeout: AtomicU64::new(NO_TIMEOUT),
        }
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    pub fn is_socket(&self) -> bool {
        self.is_socket
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn set_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether the real descriptor was put into non-blocking mode by the
    /// runtime.
    pub fn sys_nonblock(&self) -> bool {
        self.sys_nonblock.load(Ordering::SeqCst)
    }

    /// The blocking mode the application asked for. While set, hooked calls
    /// pass straight through and would-block results reach the caller.
    pub fn user_nonblock(&self) -> bool {
        self.user_nonblock.load(Ordering::SeqCst)
    }

    pub fn set_user_nonblock(&self, v: bool) {
        self.user_nonblock.store(v, Ordering::SeqCst);
    }

    /// Timeout in milliseconds for the given direction, `None` for no bound.
    pub fn timeout(&self, kind: TimeoutKind) -> Option<u64> {
        match self.slot(kind).load(Ordering::SeqCst) {
            NO_TIMEOUT => None,
            ms => Some(ms),
        }
    }

    pub fn set_timeout(&self, kind: TimeoutKind, ms: Option<u64>) {
        self.slot(kind).store(ms.unwrap_or(NO_TIMEOUT), Ordering::SeqCst);
    }

    fn slot(&self, kind: TimeoutKind) -> &AtomicU64 {
        match kind {
            TimeoutKind::Recv => &self.recv_timeout,
            TimeoutKind::Send => &self.send_timeout,
        }
    }
}

/// The reactor-owned table of managed descriptors, indexed by fd.
pub struct FdRegistry {
    table: RwLock<Vec<Option<Arc<FdCtx>>>>,
}

impl FdRegistry {
    pub(crate) fn new() -> FdRegistry {
        FdRegistry {
            table: RwLock::new(Vec::new()),
        }
    }

    /// The context for `fd`, if it is managed.
    pub fn get(&self, fd: RawFd) -> Option<Arc<FdCtx>> {
        if fd < 0 {
            return None;
        }
        self.table.read().get(fd as usize).and_then(|slot| slot.clone())
    }

    /// Registers `fd`, creating its context on first sight.
    pub fn create(&self, fd: RawFd) -> Arc<FdCtx> {
        assert!(fd >= 0, "registered a negative fd");
        if let Some(ctx) = self.get(fd) {
            return ctx;
        }
        let mut table = self.table.write();
        let idx = fd as usize;
        if table.len() <= idx {
            table.resize(idx * 3 / 2 + 1, None);
        }
        let slot = &mut table[idx];
        if let Some(ctx) = slot {
            return ctx.clone();
        }
        let ctx = Arc::new(FdCtx::new(fd));
        *slot = Some(ctx.clone());
        ctx
    }

    /// Forgets `fd`. The context is marked closed for any handle still held.
    pub fn remove(&self, fd: RawFd) {
        if fd < 0 {
            return;
        }
        if let Some(ctx) = self.table.write().get_mut(fd as usize).and_then(|s| s.take()) {
            ctx.set_closed();
        }
    }
}
