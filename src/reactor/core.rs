//! Reactor core: the fd table, the registration surface and the idle loop.

use libc::{EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLOUT, epoll_event};
use log::{debug, error, info};
use parking_lot::{Mutex, RwLock};

use std::cell::RefCell;
use std::io;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crate::fiber::{Fiber, FiberState};
use crate::hook::FdRegistry;
use crate::reactor::RegisterError;
use crate::reactor::fd::{EventContext, EventKind, FdContext};
use crate::reactor::poller::Poller;
use crate::scheduler::{FiberTask, IdleHandler, MAX_IDLE_WAIT_MS, Scheduler, TaskKind};
use crate::timer::{Timer, TimerSet};

// One epoll_wait drain processes at most this many events before yielding.
const MAX_EVENTS: usize = 256;

const EPOLLET: u32 = libc::EPOLLET as u32;

thread_local! {
    static CURRENT_REACTOR: RefCell<Option<Arc<Reactor>>> = const { RefCell::new(None) };
}

/// Configures and builds a [`Reactor`].
pub struct ReactorBuilder {
    threads: usize,
    use_caller: bool,
    name: String,
    stack_size: usize,
}

impl ReactorBuilder {
    pub fn new() -> ReactorBuilder {
        ReactorBuilder {
            threads: 1,
            use_caller: false,
            name: "reactor".to_string(),
            stack_size: 0,
        }
    }

    /// Number of worker threads (including the borrowed caller, if any).
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Borrow the constructing thread as worker 0 instead of spawning one.
    pub fn use_caller(mut self, use_caller: bool) -> Self {
        self.use_caller = use_caller;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Fiber stack size in bytes; 0 selects the default.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    pub fn build(self) -> Arc<Reactor> {
        let sched =
            Scheduler::with_stack_size(self.threads, self.use_caller, self.name, self.stack_size);
        let poller = Poller::new().expect("failed to create the readiness multiplexer");
        let wake = poller.wake_handle();
        let reactor = Arc::new_cyclic(|me| Reactor {
            me: me.clone(),
            sched,
            timers: TimerSet::with_waker(move || wake.wake()),
            poller,
            table: RwLock::new(Vec::new()),
            pending: AtomicUsize::new(0),
            fds: FdRegistry::new(),
        });
        let reactor_dyn: Arc<dyn IdleHandler> = reactor.clone();
        let handler: Weak<dyn IdleHandler> = Arc::downgrade(&reactor_dyn);
        reactor.sched.set_idle_handler(handler);
        info!("reactor {} created", reactor.name());
        reactor
    }
}

impl Default for ReactorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A scheduler whose idle activity drives epoll and a timer set.
///
/// Workers dispatch queued tasks as usual; with nothing to run they resume
/// the reactor's idle fiber, which blocks in `epoll_wait` bounded by the
/// nearest timer deadline and re-injects whatever fires as new tasks.
pub struct Reactor {
    me: Weak<Reactor>,
    sched: Arc<Scheduler>,
    timers: TimerSet,
    poller: Poller,
    // Dense fd-indexed table; entries are created lazily and reset, never
    // removed. Grown 1.5x under the write lock.
    table: RwLock<Vec<Arc<Mutex<FdContext>>>>,
    pending: AtomicUsize,
    fds: FdRegistry,
}

impl Reactor {
    /// A reactor over `threads` workers. See [`ReactorBuilder`] for the
    /// remaining knobs.
    pub fn new(threads: usize, use_caller: bool, name: impl Into<String>) -> Arc<Reactor> {
        ReactorBuilder::new()
            .threads(threads)
            .use_caller(use_caller)
            .name(name)
            .build()
    }

    /// The reactor driving the calling worker thread, if any.
    pub fn current() -> Option<Arc<Reactor>> {
        CURRENT_REACTOR.with(|cell| cell.borrow().clone())
    }

    pub fn name(&self) -> &str {
        self.sched.name()
    }

    pub fn start(&self) {
        self.sched.start();
    }

    /// Stops the underlying scheduler; returns once every worker has drained
    /// its pending events and timers and exited.
    pub fn stop(&self) {
        self.sched.stop();
    }

    pub fn stopping(&self) -> bool {
        self.sched.stopping()
    }

    pub fn schedule(&self, task: FiberTask) {
        self.sched.schedule(task);
    }

    /// Schedules a plain callback.
    pub fn spawn(&self, f: impl FnOnce() + Send + 'static) {
        self.sched.spawn(f);
    }

    /// Mean busy percentage of this reactor's workers.
    pub fn load(&self) -> usize {
        self.sched.load()
    }

    /// Interrupts a worker blocked in the multiplexer wait.
    pub fn tickle(&self) {
        self.poller.wake_handle().wake();
    }

    /// The hook layer's managed-descriptor table.
    pub fn fd_registry(&self) -> &FdRegistry {
        &self.fds
    }

    pub fn add_timer(
        &self,
        ms: u64,
        callback: impl Fn() + Send + Sync + 'static,
        recurring: bool,
    ) -> Arc<Timer> {
        self.timers.add_timer(ms, callback, recurring)
    }

    pub fn add_condition_timer<T: Send + Sync + 'static>(
        &self,
        ms: u64,
        callback: impl Fn() + Send + Sync + 'static,
        condition: Weak<T>,
        recurring: bool,
    ) -> Arc<Timer> {
        self.timers
            .add_condition_timer(ms, callback, condition, recurring)
    }

    pub fn has_timer(&self) -> bool {
        self.timers.has_timer()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.sched.is_running()
    }

    pub(crate) fn worker_exited(&self) -> bool {
        self.sched.worker_exited()
    }

    // Entry for `fd`, growing the table if this is the highest fd seen.
    fn fd_context(&self, fd: RawFd) -> Arc<Mutex<FdContext>> {
        let idx = fd as usize;
        {
            let table = self.table.read();
            if let Some(ctx) = table.get(idx) {
                return ctx.clone();
            }
        }
        let mut table = self.table.write();
        if table.len() <= idx {
            let new_len = (idx * 3 / 2 + 1).max(32);
            let mut next = table.len() as RawFd;
            table.resize_with(new_len, || {
                let ctx = Arc::new(Mutex::new(FdContext::new(next)));
                next += 1;
                ctx
            });
        }
        table[idx].clone()
    }

    fn lookup(&self, fd: RawFd) -> Option<Arc<Mutex<FdContext>>> {
        self.table.read().get(fd as usize).cloned()
    }

    /// Arms `kind` interest on `fd`.
    ///
    /// With a callback the firing schedules it as a task; without one the
    /// calling fiber is parked in the slot and resumed on readiness. Arming a
    /// kind that is already armed is an invariant violation and panics;
    /// registration failure against the OS is logged and returned.
    pub fn add_event(
        &self,
        fd: RawFd,
        kind: EventKind,
        cb: Option<Box<dyn FnOnce() + Send + 'static>>,
    ) -> Result<(), RegisterError> {
        let fd_ctx = self.fd_context(fd);
        let mut ctx = fd_ctx.lock();
        if ctx.armed() & kind.bit() != 0 {
            error!(
                "add_event: fd {} already armed for {:?} (mask {:#x})",
                fd,
                kind,
                ctx.armed()
            );
            panic!("event {:?} already armed on fd {}", kind, fd);
        }

        let modify = ctx.armed() != 0;
        let events = EPOLLET | ctx.armed() | kind.bit();
        if let Err(source) = self.poller.arm(fd, events, modify) {
            error!("add_event: epoll_ctl failed for fd {fd} ({kind:?}): {source}");
            return Err(RegisterError { fd, kind, source });
        }

        self.pending.fetch_add(1, Ordering::SeqCst);
        let task = match cb {
            Some(f) => TaskKind::Call(f),
            None => {
                let fiber = Fiber::current().expect("add_event without a callback needs a fiber");
                assert_eq!(fiber.state(), FiberState::Exec);
                TaskKind::Fiber(fiber)
            }
        };
        ctx.store(kind, EventContext::new(self.sched.clone(), task));
        Ok(())
    }

    /// Disarms `kind` on `fd` without firing the stored context.
    pub fn del_event(&self, fd: RawFd, kind: EventKind) -> bool {
        let Some(fd_ctx) = self.lookup(fd) else {
            return false;
        };
        let mut ctx = fd_ctx.lock();
        if ctx.armed() & kind.bit() == 0 {
            return false;
        }
        if !self.rearm_without(ctx.armed(), fd, kind.bit()) {
            return false;
        }
        ctx.clear(kind);
        self.pending.fetch_sub(1, Ordering::SeqCst);
        true
    }

    /// Disarms `kind` on `fd` and fires the stored context immediately
    /// (cancelled semantics); used on shutdown, timeouts and fd close.
    pub fn cancel_event(&self, fd: RawFd, kind: EventKind) -> bool {
        let Some(fd_ctx) = self.lookup(fd) else {
            return false;
        };
        let mut ctx = fd_ctx.lock();
        if ctx.armed() & kind.bit() == 0 {
            return false;
        }
        if !self.rearm_without(ctx.armed(), fd, kind.bit()) {
            return false;
        }
        ctx.trigger(kind);
        self.pending.fetch_sub(1, Ordering::SeqCst);
        true
    }

    /// Fires and disarms both kinds on `fd`.
    pub fn cancel_all(&self, fd: RawFd) -> bool {
        let Some(fd_ctx) = self.lookup(fd) else {
            return false;
        };
        let mut ctx = fd_ctx.lock();
        if ctx.armed() == 0 {
            return false;
        }
        if !self.rearm_without(ctx.armed(), fd, ctx.armed()) {
            return false;
        }
        if ctx.armed() & EventKind::Read.bit() != 0 {
            ctx.trigger(EventKind::Read);
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        if ctx.armed() & EventKind::Write.bit() != 0 {
            ctx.trigger(EventKind::Write);
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        debug_assert_eq!(ctx.armed(), 0);
        true
    }

    // Re-arms `fd` with its interest minus `bits`, or fully disarms it when
    // nothing remains.
    fn rearm_without(&self, armed: u32, fd: RawFd, bits: u32) -> bool {
        let left = armed & !bits;
        let res = if left != 0 {
            self.poller.arm(fd, EPOLLET | left, true)
        } else {
            self.poller.disarm(fd)
        };
        if let Err(err) = res {
            error!("epoll_ctl failed for fd {fd}: {err}");
            return false;
        }
        true
    }

    // One readiness event from the multiplexer. Spurious bits (kinds no
    // longer armed) are dropped; error/hangup conditions fire whatever is
    // armed so waiters observe the failure through their retried call.
    fn process_event(&self, fd: RawFd, bits: u32) {
        if fd == self.poller.wake_fd() {
            // The wake pipe exists purely to interrupt the wait.
            self.poller.drain_wake();
            return;
        }
        let Some(fd_ctx) = self.lookup(fd) else {
            return;
        };
        let mut ctx = fd_ctx.lock();

        let mut bits = bits;
        if bits & (EPOLLERR as u32 | EPOLLHUP as u32) != 0 {
            bits |= (EPOLLIN as u32 | EPOLLOUT as u32) & ctx.armed();
        }
        let mut real = 0u32;
        if bits & EPOLLIN as u32 != 0 {
            real |= EventKind::Read.bit();
        }
        if bits & EPOLLOUT as u32 != 0 {
            real |= EventKind::Write.bit();
        }
        real &= ctx.armed();
        if real == 0 {
            return;
        }

        if !self.rearm_without(ctx.armed(), fd, real) {
            return;
        }
        if real & EventKind::Read.bit() != 0 {
            ctx.trigger(EventKind::Read);
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        if real & EventKind::Write.bit() != 0 {
            ctx.trigger(EventKind::Write);
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl IdleHandler for Reactor {
    // Runs as each worker's idle fiber.
    fn idle(&self, sched: &Arc<Scheduler>) {
        let mut events = vec![epoll_event { events: 0, u64: 0 }; MAX_EVENTS];
        loop {
            if sched.stopping() {
                break;
            }

            // Wait at most until the nearest timer, capped so external stop
            // requests and cross-thread wakes are never missed for long.
            let timeout = self
                .timers
                .next_deadline()
                .map_or(MAX_IDLE_WAIT_MS, |ms| ms.min(MAX_IDLE_WAIT_MS));
            let n = loop {
                match self.poller.wait(&mut events, timeout) {
                    Ok(n) => break n,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        error!("reactor {}: epoll_wait failed: {err}", self.name());
                        break 0;
                    }
                }
            };

            let expired = self.timers.collect_expired();
            if !expired.is_empty() {
                debug!("reactor {}: scheduling {} timer(s)", self.name(), expired.len());
                for cb in expired {
                    sched.schedule(FiberTask::call(move || cb()));
                }
            }

            for event in events.iter().take(n) {
                // epoll_event is packed; copy the fields out.
                let (bits, fd) = (event.events, event.u64 as RawFd);
                self.process_event(fd, bits);
            }

            // Give the dispatch loop a turn at whatever was just injected.
            Fiber::yield_hold();
        }
        debug!("reactor {} idle fiber exiting", self.name());
    }

    fn tickle(&self) {
        Reactor::tickle(self);
    }

    fn drained(&self) -> bool {
        self.pending.load(Ordering::SeqCst) == 0 && !self.timers.has_timer()
    }

    fn on_worker_start(&self) {
        if let Some(me) = self.me.upgrade() {
            CURRENT_REACTOR.with(|cell| *cell.borrow_mut() = Some(me));
        }
    }

    fn on_worker_stop(&self) {
        CURRENT_REACTOR.with(|cell| cell.borrow_mut().take());
    }
}
