//! Multi-threaded fiber scheduler.
//!
//! A [`Scheduler`] owns a pool of worker threads draining a single locked
//! task queue of [`FiberTask`] items. Each worker runs the dispatch loop:
//! pop the first entry whose affinity matches, resume it, and when nothing
//! qualifies resume the shared idle fiber supplied by the scheduler's
//! [`IdleHandler`]. The default handler parks workers on a condition
//! variable; a reactor installs itself instead so idle workers block in the
//! readiness multiplexer.

use log::{debug, info};
use parking_lot::{Condvar, Mutex};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::fiber::{Fiber, FiberState};
use crate::hook;
use crate::load::LoadCounter;

// Upper bound on any idle park so external stop requests are never missed
// for long.
pub(crate) const MAX_IDLE_WAIT_MS: u64 = 3000;

thread_local! {
    static CURRENT_SCHEDULER: RefCell<Option<Arc<Scheduler>>> = const { RefCell::new(None) };
}

pub(crate) enum TaskKind {
    Fiber(Arc<Fiber>),
    Call(Box<dyn FnOnce() + Send + 'static>),
}

/// A queued unit of work: a fiber to resume or a callback to run on a fresh
/// (recycled) fiber, optionally pinned to one worker index.
pub struct FiberTask {
    pub(crate) kind: TaskKind,
    pub(crate) affinity: Option<usize>,
}

impl FiberTask {
    /// A task that resumes `fiber`.
    pub fn fiber(fiber: Arc<Fiber>) -> FiberTask {
        FiberTask {
            kind: TaskKind::Fiber(fiber),
            affinity: None,
        }
    }

    /// A task that runs `f` on a worker-owned fiber.
    pub fn call(f: impl FnOnce() + Send + 'static) -> FiberTask {
        FiberTask {
            kind: TaskKind::Call(Box::new(f)),
            affinity: None,
        }
    }

    pub(crate) fn from_kind(kind: TaskKind) -> FiberTask {
        FiberTask {
            kind,
            affinity: None,
        }
    }

    /// Pins the task to the worker with the given index.
    pub fn pinned(mut self, worker: usize) -> FiberTask {
        self.affinity = Some(worker);
        self
    }

    pub fn affinity(&self) -> Option<usize> {
        self.affinity
    }
}

impl From<Arc<Fiber>> for FiberTask {
    fn from(fiber: Arc<Fiber>) -> FiberTask {
        FiberTask::fiber(fiber)
    }
}

/// Pluggable idle behavior: what a worker does when the queue holds nothing
/// for it, how a sleeping worker is woken, and any extra condition required
/// before the scheduler may report itself fully stopped.
pub(crate) trait IdleHandler: Send + Sync {
    /// Body of the per-worker idle fiber. Must yield back to the dispatch
    /// loop regularly and return once `sched.stopping()` holds.
    fn idle(&self, sched: &Arc<Scheduler>);

    /// Wakes one (or all) idle workers.
    fn tickle(&self);

    /// Extra stopping condition beyond the base scheduler's.
    fn drained(&self) -> bool {
        true
    }

    /// Called on each worker thread before (after) its dispatch loop, for
    /// installing (clearing) ambient per-thread context.
    fn on_worker_start(&self) {}
    fn on_worker_stop(&self) {}
}

// Default idle behavior: park on a condvar until tickled, bounded by
// MAX_IDLE_WAIT_MS.
struct CondvarIdle {
    notified: Mutex<bool>,
    cond: Condvar,
}

impl CondvarIdle {
    fn new() -> CondvarIdle {
        CondvarIdle {
            notified: Mutex::new(false),
            cond: Condvar::new(),
        }
    }
}

impl IdleHandler for CondvarIdle {
    fn idle(&self, sched: &Arc<Scheduler>) {
        loop {
            if sched.stopping() {
                break;
            }
            {
                let mut notified = self.notified.lock();
                if !*notified {
                    self.cond
                        .wait_for(&mut notified, Duration::from_millis(MAX_IDLE_WAIT_MS));
                }
                *notified = false;
            }
            Fiber::yield_hold();
        }
    }

    fn tickle(&self) {
        let mut notified = self.notified.lock();
        *notified = true;
        self.cond.notify_all();
    }
}

/// A fair, affinity-aware fiber scheduler over a pool of worker threads.
pub struct Scheduler {
    name: String,
    queue: Mutex<VecDeque<FiberTask>>,
    running: AtomicBool,
    auto_stop: AtomicBool,
    // Total worker slots, including the borrowed caller thread when
    // `use_caller` is set.
    worker_count: usize,
    use_caller: bool,
    stack_size: usize,
    active: AtomicUsize,
    threads: Mutex<Vec<JoinHandle<()>>>,
    // Dispatch loop for the borrowed caller thread; resumed during stop().
    main_fiber: Mutex<Option<Arc<Fiber>>>,
    loads: Vec<Arc<LoadCounter>>,
    handler: OnceLock<Weak<dyn IdleHandler>>,
    fallback_idle: Arc<CondvarIdle>,
}

impl Scheduler {
    /// Creates a scheduler with `threads` worker slots.
    ///
    /// With `use_caller` the constructing thread is borrowed as worker 0 (so
    /// one fewer thread is spawned); its dispatch loop only runs inside
    /// [`stop`](Self::stop), flushing whatever work remains.
    pub fn new(threads: usize, use_caller: bool, name: impl Into<String>) -> Arc<Scheduler> {
        Self::with_stack_size(threads, use_caller, name, 0)
    }

    /// Like [`new`](Self::new) with an explicit fiber stack size in bytes
    /// (0 selects the default).
    pub fn with_stack_size(
        threads: usize,
        use_caller: bool,
        name: impl Into<String>,
        stack_size: usize,
    ) -> Arc<Scheduler> {
        assert!(threads > 0, "scheduler needs at least one worker");
        let name = name.into();
        let sched = Arc::new(Scheduler {
            name,
            queue: Mutex::new(VecDeque::new()),
            running: AtomicBool::new(false),
            auto_stop: AtomicBool::new(false),
            worker_count: threads,
            use_caller,
            stack_size,
            active: AtomicUsize::new(0),
            threads: Mutex::new(Vec::new()),
            main_fiber: Mutex::new(None),
            loads: (0..threads).map(|_| Arc::new(LoadCounter::new(0))).collect(),
            handler: OnceLock::new(),
            fallback_idle: Arc::new(CondvarIdle::new()),
        });

        if use_caller {
            let weak = Arc::downgrade(&sched);
            let main = Fiber::new(
                move || {
                    if let Some(sched) = weak.upgrade() {
                        sched.run(0);
                    }
                },
                stack_size,
            );
            *sched.main_fiber.lock() = Some(main);
        }
        sched
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scheduler driving the calling worker thread, if any.
    pub fn current() -> Option<Arc<Scheduler>> {
        CURRENT_SCHEDULER.with(|cell| cell.borrow().clone())
    }

    /// Installs the idle handler; may only happen before `start`.
    pub(crate) fn set_idle_handler(&self, handler: Weak<dyn IdleHandler>) {
        let _ = self.handler.set(handler);
    }

    fn handler(&self) -> Arc<dyn IdleHandler> {
        if let Some(weak) = self.handler.get()
            && let Some(handler) = weak.upgrade()
        {
            return handler;
        }
        self.fallback_idle.clone()
    }

    /// Appends a task; wakes one idle worker when the queue was empty.
    pub fn schedule(&self, task: FiberTask) {
        let was_empty = {
            let mut queue = self.queue.lock();
            let was_empty = queue.is_empty();
            queue.push_back(task);
            was_empty
        };
        if was_empty {
            self.handler().tickle();
        }
    }

    /// Appends a task pinned to the worker with the given index.
    pub fn schedule_to(&self, task: FiberTask, worker: usize) {
        self.schedule(task.pinned(worker));
    }

    /// Convenience for scheduling a plain callback.
    pub fn spawn(&self, f: impl FnOnce() + Send + 'static) {
        self.schedule(FiberTask::call(f));
    }

    /// Spawns the worker threads. Idempotent.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("scheduler {} starting", self.name);
        let spawn_count = self.worker_count - usize::from(self.use_caller);

        let mut threads = self.threads.lock();
        for i in 0..spawn_count {
            let index = if self.use_caller { i + 1 } else { i };
            let sched = self.clone();
            let handle = thread::Builder::new()
                .name(format!("{}_{}", self.name, index))
                .spawn(move || sched.run(index))
                .expect("failed to spawn scheduler worker");
            threads.push(handle);
        }
    }

    /// Requests shutdown, wakes every worker, joins them, then (with
    /// `use_caller`) runs the caller-thread dispatch loop to flush whatever
    /// the workers left behind.
    pub fn stop(self: &Arc<Self>) {
        info!("scheduler {} stopping", self.name);
        self.auto_stop.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);

        let handler = self.handler();
        for _ in 0..self.worker_count {
            handler.tickle();
        }

        let threads = std::mem::take(&mut *self.threads.lock());
        let current = thread::current().id();
        for handle in threads {
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }

        if let Some(main) = self.main_fiber.lock().take() {
            handler.tickle();
            if !self.stopping() {
                main.resume();
            }
        }
        debug!("scheduler {} stopped", self.name);
    }

    /// True once shutdown was requested and no queued or running work
    /// remains (including the idle handler's own drain condition).
    pub fn stopping(&self) -> bool {
        self.auto_stop.load(Ordering::SeqCst)
            && !self.running.load(Ordering::SeqCst)
            && self.queue.lock().is_empty()
            && self.active.load(Ordering::SeqCst) == 0
            && self.handler().drained()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // A worker thread finished while the scheduler was still running; the
    // pool supervisor uses this to spot crashed workers.
    pub(crate) fn worker_exited(&self) -> bool {
        self.threads.lock().iter().any(|handle| handle.is_finished())
    }

    /// Mean busy percentage across this scheduler's workers.
    pub fn load(&self) -> usize {
        let sum: usize = self.loads.iter().map(|l| l.load()).sum();
        sum / self.loads.len()
    }

    // The dispatch loop. `index` is this worker's affinity slot.
    fn run(self: &Arc<Self>, index: usize) {
        debug!("worker {}[{}] running", self.name, index);
        hook::set_enabled(true);
        let handler = self.handler();
        handler.on_worker_start();
        CURRENT_SCHEDULER.with(|cell| *cell.borrow_mut() = Some(self.clone()));

        let load = self.loads[index].clone();
        load.start_work();
        let idle_fiber = {
            let sched = self.clone();
            let handler = handler.clone();
            Fiber::new(move || handler.idle(&sched), self.stack_size)
        };
        // Worker-owned fiber recycled across callback tasks.
        let mut call_fiber: Option<Arc<Fiber>> = None;

        loop {
            let mut task = None;
            let mut need_tickle = false;
            {
                let mut queue = self.queue.lock();
                let mut i = 0;
                while i < queue.len() {
                    if let Some(pin) = queue[i].affinity
                        && pin != index
                    {
                        // Pinned to another worker: leave it, make sure that
                        // worker gets woken.
                        need_tickle = true;
                        i += 1;
                        continue;
                    }
                    if let TaskKind::Fiber(fiber) = &queue[i].kind
                        && fiber.state() == FiberState::Exec
                    {
                        // Still running on another worker; not resumable yet.
                        i += 1;
                        continue;
                    }
                    task = queue.remove(i);
                    self.active.fetch_add(1, Ordering::SeqCst);
                    break;
                }
                need_tickle |= !queue.is_empty();
            }
            if need_tickle {
                handler.tickle();
            }

            let Some(task) = task else {
                if idle_fiber.state().finished() {
                    debug!("worker {}[{}] idle fiber terminated", self.name, index);
                    break;
                }
                load.start_sleep();
                idle_fiber.resume();
                load.start_work();
                if !idle_fiber.state().finished() {
                    idle_fiber.set_state(FiberState::Hold);
                }
                continue;
            };

            match task.kind {
                TaskKind::Fiber(fiber) => {
                    if !fiber.state().finished() {
                        fiber.resume();
                        self.after_resume(fiber, task.affinity);
                    }
                    self.active.fetch_sub(1, Ordering::SeqCst);
                }
                TaskKind::Call(f) => {
                    let fiber = match call_fiber.take() {
                        Some(fiber) => {
                            fiber.reset(f);
                            fiber
                        }
                        None => Fiber::new(f, self.stack_size),
                    };
                    fiber.resume();
                    self.active.fetch_sub(1, Ordering::SeqCst);
                    if fiber.state().finished() {
                        // Keep the fiber for the next callback.
                        call_fiber = Some(fiber);
                    } else {
                        self.after_resume(fiber, task.affinity);
                    }
                }
            }
        }

        CURRENT_SCHEDULER.with(|cell| *cell.borrow_mut() = None);
        handler.on_worker_stop();
        hook::set_enabled(false);
        debug!("worker {}[{}] finished", self.name, index);
    }

    // Post-resume bookkeeping shared by both task kinds: re-queue READY
    // fibers, park everything else as HOLD and drop our reference (whoever
    // suspended it has stashed a handle that re-schedules it).
    fn after_resume(&self, fiber: Arc<Fiber>, affinity: Option<usize>) {
        match fiber.state() {
            FiberState::Ready => {
                let mut task = FiberTask::fiber(fiber);
                task.affinity = affinity;
                self.schedule(task);
            }
            state if !state.finished() => fiber.set_state(FiberState::Hold),
            _ => {}
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        debug!("scheduler {} dropped", self.name);
    }
}
