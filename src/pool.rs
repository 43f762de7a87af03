//! Worker-pool manager: several independent reactors behind one submission
//! surface.
//!
//! A [`WorkerPool`] buffers assigned tasks and lets a root supervisory thread
//! drain them to the least-loaded worker reactor, batch size smoothed by how
//! long the same worker keeps winning. The same supervisory pass notices
//! worker threads that died without being stopped and respawns a fresh
//! reactor in the slot.

use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex, RwLock};

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::reactor::Reactor;
use crate::scheduler::FiberTask;

// How long the supervisor sleeps between passes when nothing is buffered.
const SUPERVISE_INTERVAL_MS: u64 = 1000;

struct Buffered {
    task: FiberTask,
    // Pool worker slot, not a scheduler thread index.
    slot: Option<usize>,
}

/// A supervisor over `workers` single-threaded reactors with load-balanced
/// task submission.
pub struct WorkerPool {
    name: String,
    worker_count: usize,
    running: AtomicBool,
    tasks: Mutex<VecDeque<Buffered>>,
    nudge: Condvar,
    workers: RwLock<Vec<Arc<Reactor>>>,
    root: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerPool {
    /// A pool of `workers` reactors; 0 selects one per CPU.
    pub fn new(workers: usize, name: impl Into<String>) -> Arc<WorkerPool> {
        let worker_count = if workers == 0 { num_cpus::get() } else { workers };
        Arc::new(WorkerPool {
            name: name.into(),
            worker_count,
            running: AtomicBool::new(false),
            tasks: Mutex::new(VecDeque::new()),
            nudge: Condvar::new(),
            workers: RwLock::new(Vec::new()),
            root: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Spawns the worker reactors and the root supervisory thread.
    /// Idempotent.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("pool {} starting {} workers", self.name, self.worker_count);
        {
            let mut workers = self.workers.write();
            for i in 0..self.worker_count {
                workers.push(self.spawn_worker(i));
            }
        }
        let pool = self.clone();
        let handle = thread::Builder::new()
            .name(format!("{}_0", self.name))
            .spawn(move || pool.run())
            .expect("failed to spawn pool supervisor");
        *self.root.lock() = Some(handle);
    }

    /// Joins the supervisor, flushes whatever is still buffered, then stops
    /// every worker reactor.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("pool {} stopping", self.name);
        self.nudge.notify_all();
        if let Some(root) = self.root.lock().take() {
            let _ = root.join();
        }
        {
            let mut tasks = self.tasks.lock();
            let workers = self.workers.read();
            let mut next = 0;
            while let Some(buffered) = tasks.pop_front() {
                if workers.is_empty() {
                    break;
                }
                let idx = buffered.slot.unwrap_or(next) % workers.len();
                workers[idx].schedule(buffered.task);
                next += 1;
            }
        }
        for worker in self.workers.read().iter() {
            worker.stop();
        }
        debug!("pool {} stopped", self.name);
    }

    /// Buffers a task for the next supervisory pass.
    pub fn assign(&self, task: FiberTask) {
        self.buffer(task, None);
    }

    /// Buffers a task bound to one pool worker slot.
    pub fn assign_to(&self, task: FiberTask, worker: usize) {
        self.buffer(task, Some(worker));
    }

    /// Convenience for assigning a plain callback.
    pub fn spawn(&self, f: impl FnOnce() + Send + 'static) {
        self.assign(FiberTask::call(f));
    }

    fn buffer(&self, task: FiberTask, slot: Option<usize>) {
        self.tasks.lock().push_back(Buffered { task, slot });
        self.nudge.notify_one();
    }

    fn spawn_worker(&self, slot: usize) -> Arc<Reactor> {
        let reactor = Reactor::new(1, false, format!("{}_{}", self.name, slot + 1));
        reactor.start();
        reactor
    }

    // Root thread body: drain, resurrect, park.
    fn run(self: Arc<Self>) {
        let mut last = 0usize;
        let mut batch = 1usize;
        while self.running.load(Ordering::SeqCst) {
            self.drain(&mut last, &mut batch);
            self.pullup();

            let mut tasks = self.tasks.lock();
            if tasks.is_empty() {
                self.nudge
                    .wait_for(&mut tasks, Duration::from_millis(SUPERVISE_INTERVAL_MS));
            }
        }
        debug!("pool {} supervisor exiting", self.name);
    }

    // Lowest-load worker, scanning forward from the previous pick so ties
    // rotate instead of piling onto one slot.
    fn pick_worker(&self, last: usize) -> usize {
        let workers = self.workers.read();
        let mut best = last % workers.len();
        let mut best_load = workers[best].load();
        for off in 1..workers.len() {
            let cur = (last + off) % workers.len();
            let load = workers[cur].load();
            if load < best_load {
                best = cur;
                best_load = load;
            }
        }
        best
    }

    fn drain(&self, last: &mut usize, batch: &mut usize) {
        let mut tasks = self.tasks.lock();
        if tasks.is_empty() {
            return;
        }
        let chosen = self.pick_worker(*last);
        // The longer the same worker stays the least loaded, the bigger the
        // batch it gets.
        if chosen == *last {
            *batch += 1;
        } else {
            *batch = 1;
        }
        *last = chosen;

        let n = (*batch).min(tasks.len());
        let workers = self.workers.read();
        debug!(
            "pool {}: draining {} task(s) to worker {} (load {})",
            self.name,
            n,
            chosen,
            workers[chosen].load()
        );
        for _ in 0..n {
            let Some(buffered) = tasks.pop_front() else {
                break;
            };
            match buffered.slot {
                Some(slot) => workers[slot % workers.len()].schedule(buffered.task),
                None => workers[chosen].schedule(buffered.task),
            }
        }
        drop(tasks);
        workers[chosen].tickle();
    }

    // Resurrects workers whose threads exited without stop().
    fn pullup(&self) {
        let mut dead = Vec::new();
        {
            let workers = self.workers.read();
            for (i, worker) in workers.iter().enumerate() {
                if worker.is_running() && worker.worker_exited() {
                    dead.push(i);
                }
            }
        }
        if dead.is_empty() {
            return;
        }
        let mut workers = self.workers.write();
        for i in dead {
            warn!("pool {}: worker {} died, respawning", self.name, i);
            workers[i] = self.spawn_worker(i);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        debug!("pool {} dropped", self.name);
    }
}
