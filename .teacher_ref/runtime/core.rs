//! Async runtime that executes futures and manages task scheduling.
//!
//! The runtime coordinates the execution of a main future via `block_on` and handles
//! spawned background tasks. It uses a task queue and executor to manage concurrent execution.

use crate::reactor::core::{Reactor, set_current_reactor};
use crate::runtime::{Executor, TaskQueue, enter_context};
use crate::task::Task;
use crate::timer;

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Main async runtime for executing futures.
///
/// Provides the core API for running futures to completion and spawning background tasks.
/// The runtime maintains an executor and task queue for managing concurrent task execution.
pub struct Runtime {
    queue: Arc<TaskQueue>,
    executor: Executor,
    reactor: Reactor,
}

impl Runtime {
    /// Creates a new runtime with an empty task queue and executor.
    ///
    /// Initializes the runtime components needed for executing futures and managing
    /// spawned tasks.
    ///
    /// # Example
    /// ```ignore
    /// let rt = Runtime::new();
    /// ```
    pub fn new() -> Self {
        let queue = Arc::new(TaskQueue::new());
        let executor = Executor::new(queue.clone());
        let reactor = Reactor::new();

        Self {
            queue,
            executor,
            reactor,
        }
    }

    /// Spawns a background task to be executed concurrently.
    ///
    /// Creates a new task from the provided future and enqueues it for execution.
    /// The task will be executed when `block_on` drains the task queue.
    ///
    /// # Arguments
    /// * `fut` - A future with `Output = ()` that will be executed as a background task
    ///
    /// # Example
    /// ```ignore
    /// rt.spawn(async {
    ///     println!("Background task");
    /// });
    /// ```
    pub fn spawn<F: Future<Output = ()> + Send + 'static>(&self, fut: F) {
        let task = Task::new(fut, self.queue.clone());
        self.queue.push(task);
    }

    /// Blocks until the given future completes, processing spawned tasks along the way.
    ///
    /// Runs the provided future to completion, executing any spawned tasks from the queue
    /// when the main future is pending. Returns the output of the completed future.
    ///
    /// This method also establishes a runtime context, allowing tasks spawned within
    /// the future to use the global `spawn()` function without an explicit runtime reference.
    ///
    /// # Arguments
    /// * `fut` - The future to execute and wait for completion
    ///
    /// # Returns
    /// The output value of the completed future
    ///
    /// # Example
    /// ```ignore
    /// let result = rt.block_on(async { 42 });
    /// assert_eq!(result, 42);
    /// ```
    pub fn block_on<F: Future>(&mut self, fut: F) -> F::Output {
        // Make the runtime's reactor available to futures on this thread
        set_current_reactor(&mut self.reactor);

        enter_context(self.queue.clone(), || {
            let mut fut = Box::pin(fut);

            // Main-future waker that sets a local notification flag on wake.
            // This avoids blocking on I/O when the main future requests a yield.
            let mut notified = false;
            fn clone(ptr: *const ()) -> std::task::RawWaker {
                std::task::RawWaker::new(ptr, &VTABLE)
            }
            fn wake(ptr: *const ()) {
                unsafe {
                    *(ptr as *mut bool) = true;
                }
            }
            fn wake_by_ref(ptr: *const ()) {
                unsafe {
                    *(ptr as *mut bool) = true;
                }
            }
            fn drop(_: *const ()) {}
            static VTABLE: std::task::RawWakerVTable =
                std::task::RawWakerVTable::new(clone, wake, wake_by_ref, drop);
            let raw = std::task::RawWaker::new(&mut notified as *mut bool as *const (), &VTABLE);
            let w = unsafe { std::task::Waker::from_raw(raw) };
            let mut cx = Context::from_waker(&w);

            loop {
                // Try to make progress on the main future
                if let Poll::Ready(val) = fut.as_mut().poll(&mut cx) {
                    self.executor.run();
                    return val;
                }

                // Execute all spawned tasks
                self.executor.run();

                // Opportunistically poll I/O each tick to deliver wakes promptly
                self.reactor.poll_events();
                self.reactor.wake_ready();

                // Check and fire any expired timers (this wakes sleeping tasks)
                let has_pending_timers = timer::process_timers();

                // If the main future requested a wake (yield_now), avoid blocking and poll again.
                if notified {
                    notified = false;
                    continue;
                }

                if !self.queue.is_empty() {
                    continue;
                }

                // If only timers are pending, sleep until the next deadline
                if has_pending_timers {
                    // Opportunistically poll I/O to avoid delaying wakes while timers are pending
                    self.reactor.poll_events();
                    self.reactor.wake_ready();

                    if let Some(dur) = timer::next_timer_remaining()
                        && dur > std::time::Duration::from_millis(0)
                    {
                        std::thread::sleep(dur);
                    }
                    continue;
                }

                // Otherwise, block on I/O events
                self.reactor.wait_for_event();
                self.reactor.handle_events();
                // Wake all futures that became ready
                self.reactor.wake_ready();
            }
        })
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
