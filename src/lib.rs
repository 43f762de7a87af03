//! Stackful-coroutine M:N runtime: fibers multiplexed over a pool of worker
//! threads, driven by an epoll reactor and a cancellable timer set, with a
//! hook layer that turns blocking-style calls cooperative.
//!
//! # Architecture
//!
//! - **Fiber**: a cooperatively scheduled execution context with its own
//!   stack, explicit resume/yield primitives and a small state machine
//! - **Scheduler**: worker threads draining a shared, affinity-aware task
//!   queue of fibers and callbacks
//! - **TimerSet**: deadline-ordered, cancellable, optionally recurring
//!   timers on a monotonic millisecond clock
//! - **Reactor**: scheduler + timers + epoll; the idle activity workers run
//!   when the queue holds nothing for them
//! - **hook**: blocking-call replacements that suspend the calling fiber
//!   until readiness or timeout instead of stalling the thread
//! - **WorkerPool**: several single-threaded reactors behind one
//!   load-balanced submission surface, with dead-worker resurrection
//!
//! Linux-only: the reactor is built directly on `epoll(7)`.

mod fiber;
pub mod hook;
mod load;
mod pool;
mod reactor;
mod scheduler;
mod timer;

pub use fiber::{DEFAULT_STACK_SIZE, Fiber, FiberState};
pub use load::LoadCounter;
pub use pool::WorkerPool;
pub use reactor::{EventKind, Reactor, ReactorBuilder, RegisterError};
pub use scheduler::{FiberTask, Scheduler};
pub use timer::{Timer, TimerSet};
