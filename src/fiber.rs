//! Stackful fibers: cooperatively scheduled execution contexts.
//!
//! A [`Fiber`] owns a dedicated execution stack and a small state machine.
//! Control enters a fiber through [`Fiber::resume`] and leaves it through the
//! explicit yield points [`Fiber::yield_hold`] / [`Fiber::yield_ready`], or by
//! the entry closure returning (or panicking). At most one fiber per OS thread
//! is executing at any instant.
//!
//! The context switch itself is delegated to the `generator` crate; this
//! module layers identity, lifecycle states and panic containment on top.

use generator::{Generator, Gn};
use log::{debug, warn};
use parking_lot::Mutex;

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// Default stack size for a fiber when the caller passes 0.
pub const DEFAULT_STACK_SIZE: usize = 128 * 1024;

static NEXT_FIBER_ID: AtomicU64 = AtomicU64::new(1);
static FIBER_COUNT: AtomicU64 = AtomicU64::new(0);

thread_local! {
    // Stack of fibers executing on this thread; the top entry is the one in
    // Exec state. Nested resumes (worker main fiber -> task fiber) push.
    static CURRENT_FIBER: RefCell<Vec<Arc<Fiber>>> = const { RefCell::new(Vec::new()) };
}

/// Lifecycle states of a fiber.
///
/// Transitions: `Init -> Exec` on the first resume, then `Exec -> Hold |
/// Ready` at a yield point (resumable again), or `Exec -> Term | Except` when
/// the entry closure returns or panics. `Term` and `Except` are final.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FiberState {
    Init = 0,
    Ready = 1,
    Exec = 2,
    Hold = 3,
    Term = 4,
    Except = 5,
}

impl FiberState {
    fn from_u8(v: u8) -> FiberState {
        match v {
            0 => FiberState::Init,
            1 => FiberState::Ready,
            2 => FiberState::Exec,
            3 => FiberState::Hold,
            4 => FiberState::Term,
            _ => FiberState::Except,
        }
    }

    /// A fiber in this state may be handed to `resume`.
    pub fn resumable(self) -> bool {
        matches!(self, FiberState::Init | FiberState::Ready | FiberState::Hold)
    }

    /// `Term` or `Except`: the fiber will never run again.
    pub fn finished(self) -> bool {
        matches!(self, FiberState::Term | FiberState::Except)
    }
}

type EntryFn = Box<dyn FnOnce() + Send + 'static>;
type FiberGen = Generator<'static, (), ()>;

// State and entry slot shared with the trampoline closure. The closure holds
// this (not the Fiber itself) so dropping the last external handle to a
// suspended fiber still frees it: Fiber -> Generator -> Shared has no cycle.
struct Shared {
    id: u64,
    state: AtomicU8,
    entry: Mutex<Option<EntryFn>>,
}

impl Shared {
    fn set_state(&self, state: FiberState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

/// A cooperatively scheduled unit of execution with its own stack.
///
/// Handles are `Arc<Fiber>`; the same handle is what schedulers queue and
/// what reactor event slots park while the fiber waits for readiness.
pub struct Fiber {
    shared: Arc<Shared>,
    stack_size: usize,
    r#gen: Mutex<Option<FiberGen>>,
}

impl Fiber {
    /// Creates a fiber in `Init` state around `entry`.
    ///
    /// `stack_size` of 0 selects [`DEFAULT_STACK_SIZE`]. The entry does not
    /// run until the first [`resume`](Self::resume).
    pub fn new(entry: impl FnOnce() + Send + 'static, stack_size: usize) -> Arc<Fiber> {
        let stack_size = if stack_size == 0 { DEFAULT_STACK_SIZE } else { stack_size };
        let shared = Arc::new(Shared {
            id: NEXT_FIBER_ID.fetch_add(1, Ordering::Relaxed),
            state: AtomicU8::new(FiberState::Init as u8),
            entry: Mutex::new(Some(Box::new(entry))),
        });
        FIBER_COUNT.fetch_add(1, Ordering::Relaxed);
        debug!("fiber {} created, {} alive", shared.id, Self::total());

        let r#gen = spawn_gen(shared.clone(), stack_size);
        Arc::new(Fiber {
            shared,
            stack_size,
            r#gen: Mutex::new(Some(r#gen)),
        })
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn state(&self) -> FiberState {
        FiberState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_state(&self, state: FiberState) {
        self.shared.set_state(state);
    }

    /// Number of fibers currently alive in the process.
    pub fn total() -> u64 {
        FIBER_COUNT.load(Ordering::Relaxed)
    }

    /// The fiber executing on the calling thread, if any.
    pub fn current() -> Option<Arc<Fiber>> {
        CURRENT_FIBER.with(|stack| stack.borrow().last().cloned())
    }

    /// Id of the executing fiber, or 0 when called outside any fiber.
    pub fn current_id() -> u64 {
        CURRENT_FIBER.with(|stack| stack.borrow().last().map_or(0, |f| f.id()))
    }

    /// Switches the calling context into this fiber.
    ///
    /// Returns once the fiber yields, finishes or panics. The fiber must be
    /// in a resumable state; resuming a finished fiber, or one already
    /// executing on another thread, is an invariant violation and aborts.
    pub fn resume(self: &Arc<Self>) {
        let prev = FiberState::from_u8(
            self.shared.state.swap(FiberState::Exec as u8, Ordering::SeqCst),
        );
        assert!(
            prev.resumable(),
            "fiber {} resumed in non-resumable state {:?}",
            self.id(),
            prev
        );

        CURRENT_FIBER.with(|stack| stack.borrow_mut().push(self.clone()));
        {
            let mut r#gen = self.r#gen.lock();
            let r#gen = r#gen
                .as_mut()
                .unwrap_or_else(|| panic!("fiber {} has no execution context", self.shared.id));
            r#gen.resume();
        }
        CURRENT_FIBER.with(|stack| {
            stack.borrow_mut().pop();
        });
    }

    /// Suspends the executing fiber in `Hold` state.
    ///
    /// The fiber will not be re-queued by anyone automatically: the caller
    /// must have parked a handle somewhere (a timer, an event slot) that
    /// re-schedules it later.
    pub fn yield_hold() {
        Self::yield_with(FiberState::Hold);
    }

    /// Suspends the executing fiber in `Ready` state; the dispatch loop that
    /// resumed it will re-queue it immediately.
    pub fn yield_ready() {
        Self::yield_with(FiberState::Ready);
    }

    fn yield_with(state: FiberState) {
        let cur = Fiber::current().expect("yield outside of a fiber");
        debug_assert_eq!(cur.state(), FiberState::Exec);
        cur.set_state(state);
        drop(cur);
        generator::yield_with(());
        // Execution continues here on the next resume; the resumer has
        // already moved the state back to Exec.
    }

    /// Recycles a finished (or never-started) fiber for a new entry.
    ///
    /// The fiber keeps its id and its stack budget; only `Init`, `Term` and
    /// `Except` fibers may be reset.
    pub fn reset(self: &Arc<Self>, entry: impl FnOnce() + Send + 'static) {
        let state = self.state();
        assert!(
            matches!(state, FiberState::Init | FiberState::Term | FiberState::Except),
            "fiber {} reset in state {:?}",
            self.id(),
            state
        );

        *self.shared.entry.lock() = Some(Box::new(entry));
        let mut r#gen = self.r#gen.lock();
        *r#gen = Some(spawn_gen(self.shared.clone(), self.stack_size));
        self.set_state(FiberState::Init);
    }
}

impl Drop for Fiber {
    fn drop(&mut self) {
        FIBER_COUNT.fetch_sub(1, Ordering::Relaxed);
        debug!("fiber {} dropped", self.shared.id);
    }
}

impl std::fmt::Debug for Fiber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fiber")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

// Builds the execution context. The closure is the trampoline: it runs the
// entry under catch_unwind and records the outcome, so a panic never crosses
// the context switch back into the resumer.
fn spawn_gen(shared: Arc<Shared>, stack_size: usize) -> FiberGen {
    Gn::<()>::new_scoped_opt(stack_size, move |_scope| {
        let entry = shared
            .entry
            .lock()
            .take()
            .expect("fiber started without an entry");

        match panic::catch_unwind(AssertUnwindSafe(entry)) {
            Ok(()) => shared.set_state(FiberState::Term),
            Err(payload) => {
                // The generator runtime cancels suspended fibers by raising
                // its own payload through the yield point; that unwind must
                // keep going or the stack would never be reclaimed.
                if payload.downcast_ref::<generator::Error>().is_some() {
                    shared.set_state(FiberState::Term);
                    panic::resume_unwind(payload);
                }
                shared.set_state(FiberState::Except);
                let msg = panic_message(&payload);
                warn!("fiber {} panicked: {}", shared.id, msg);
            }
        }
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
