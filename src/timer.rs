//! Deadline-ordered, cancellable timers.
//!
//! A [`TimerSet`] stores timers keyed by `(deadline, id)` so ties on the
//! deadline are totally ordered by insertion identity. Expired callbacks are
//! detached by [`TimerSet::collect_expired`] and handed back to the caller
//! for scheduling; they are never invoked under the set's lock.
//!
//! Deadlines are integer milliseconds on a process-local monotonic clock, so
//! wall-clock adjustments can neither fire every timer at once nor starve
//! them.

use log::debug;
use parking_lot::{Mutex, RwLock};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Instant;

pub(crate) type TimerCallback = Arc<dyn Fn() + Send + Sync>;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Milliseconds elapsed on the process-local monotonic clock.
pub(crate) fn current_ms() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_millis() as u64
}

/// A single armed timer. Handles stay valid after expiry or cancellation;
/// the mutating operations simply report failure then.
pub struct Timer {
    id: u64,
    // Both fields only change under the owning set's write lock.
    deadline: AtomicU64,
    period: AtomicU64,
    recurring: bool,
    callback: Mutex<Option<TimerCallback>>,
    set: Weak<Shared>,
}

impl Timer {
    fn key(&self) -> (u64, u64) {
        (self.deadline.load(Ordering::SeqCst), self.id)
    }

    /// Disarms the timer: atomically clears the callback and removes the
    /// entry from its set. Returns false if it already fired or was
    /// cancelled.
    pub fn cancel(&self) -> bool {
        let Some(shared) = self.set.upgrade() else {
            return false;
        };
        let mut timers = shared.timers.write();
        let mut callback = self.callback.lock();
        if callback.take().is_some() {
            timers.remove(&self.key());
            true
        } else {
            false
        }
    }

    /// Re-arms the timer for one full period from now. Fails unless the
    /// timer is still live and currently present in the set.
    pub fn refresh(self: &Arc<Self>) -> bool {
        let Some(shared) = self.set.upgrade() else {
            return false;
        };
        let mut timers = shared.timers.write();
        if self.callback.lock().is_none() {
            return false;
        }
        if timers.remove(&self.key()).is_none() {
            return false;
        }
        self.deadline.store(
            current_ms() + self.period.load(Ordering::SeqCst),
            Ordering::SeqCst,
        );
        let at_front = Shared::insert_locked(&mut timers, self.clone());
        drop(timers);
        shared.wake_if_front(at_front);
        true
    }

    /// Changes the period to `ms`. With `from_now` the new deadline counts
    /// from the current time, otherwise from the original arming instant.
    pub fn reset(self: &Arc<Self>, ms: u64, from_now: bool) -> bool {
        if ms == self.period.load(Ordering::SeqCst) && !from_now {
            return true;
        }
        let Some(shared) = self.set.upgrade() else {
            return false;
        };
        let mut timers = shared.timers.write();
        if self.callback.lock().is_none() {
            return false;
        }
        if timers.remove(&self.key()).is_none() {
            return false;
        }
        let start = if from_now {
            current_ms()
        } else {
            self.deadline.load(Ordering::SeqCst) - self.period.load(Ordering::SeqCst)
        };
        self.period.store(ms, Ordering::SeqCst);
        self.deadline.store(start + ms, Ordering::SeqCst);
        let at_front = Shared::insert_locked(&mut timers, self.clone());
        drop(timers);
        shared.wake_if_front(at_front);
        true
    }
}

struct Shared {
    timers: RwLock<BTreeMap<(u64, u64), Arc<Timer>>>,
    // Deduplicates out-of-band wakes between two next_deadline() calls.
    tickled: AtomicBool,
    waker: Option<Box<dyn Fn() + Send + Sync>>,
}

impl Shared {
    // Returns whether the inserted timer became the earliest entry.
    fn insert_locked(timers: &mut BTreeMap<(u64, u64), Arc<Timer>>, timer: Arc<Timer>) -> bool {
        let key = timer.key();
        timers.insert(key, timer);
        timers.keys().next() == Some(&key)
    }

    fn wake_if_front(&self, at_front: bool) {
        if at_front && !self.tickled.swap(true, Ordering::SeqCst) {
            if let Some(waker) = &self.waker {
                waker();
            }
        }
    }
}

/// The timer collection owned by a reactor (or used standalone in tests).
pub struct TimerSet {
    shared: Arc<Shared>,
}

impl TimerSet {
    pub fn new() -> TimerSet {
        TimerSet {
            shared: Arc::new(Shared {
                timers: RwLock::new(BTreeMap::new()),
                tickled: AtomicBool::new(false),
                waker: None,
            }),
        }
    }

    /// A set whose earliest-deadline insertions invoke `waker` out-of-band,
    /// interrupting whatever is blocked on [`next_deadline`](Self::next_deadline).
    pub fn with_waker(waker: impl Fn() + Send + Sync + 'static) -> TimerSet {
        TimerSet {
            shared: Arc::new(Shared {
                timers: RwLock::new(BTreeMap::new()),
                tickled: AtomicBool::new(false),
                waker: Some(Box::new(waker)),
            }),
        }
    }

    /// Arms a timer `ms` milliseconds from now. A `recurring` timer re-arms
    /// itself with the same period each time it fires.
    pub fn add_timer(
        &self,
        ms: u64,
        callback: impl Fn() + Send + Sync + 'static,
        recurring: bool,
    ) -> Arc<Timer> {
        self.add_timer_arc(ms, Arc::new(callback), recurring)
    }

    fn add_timer_arc(&self, ms: u64, callback: TimerCallback, recurring: bool) -> Arc<Timer> {
        let timer = Arc::new(Timer {
            id: NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed),
            deadline: AtomicU64::new(current_ms() + ms),
            period: AtomicU64::new(ms),
            recurring,
            callback: Mutex::new(Some(callback)),
            set: Arc::downgrade(&self.shared),
        });
        let at_front = {
            let mut timers = self.shared.timers.write();
            Shared::insert_locked(&mut timers, timer.clone())
        };
        self.shared.wake_if_front(at_front);
        timer
    }

    /// Arms a timer whose callback only fires while `condition` can still be
    /// upgraded; once the token's owner is gone the firing is a no-op.
    pub fn add_condition_timer<T: Send + Sync + 'static>(
        &self,
        ms: u64,
        callback: impl Fn() + Send + Sync + 'static,
        condition: Weak<T>,
        recurring: bool,
    ) -> Arc<Timer> {
        self.add_timer(
            ms,
            move || {
                if condition.upgrade().is_some() {
                    callback();
                }
            },
            recurring,
        )
    }

    /// Milliseconds until the earliest timer: `None` when the set is empty,
    /// `Some(0)` when it is already overdue.
    pub fn next_deadline(&self) -> Option<u64> {
        let timers = self.shared.timers.read();
        self.shared.tickled.store(false, Ordering::SeqCst);
        let (&(deadline, _), _) = timers.iter().next()?;
        Some(deadline.saturating_sub(current_ms()))
    }

    pub fn has_timer(&self) -> bool {
        !self.shared.timers.read().is_empty()
    }

    /// Detaches every timer whose deadline has passed, in deadline order,
    /// re-arming recurring ones, and returns the callbacks for the caller to
    /// schedule. Cancelled timers are never returned.
    pub fn collect_expired(&self) -> Vec<TimerCallback> {
        let now = current_ms();
        if self.shared.timers.read().is_empty() {
            return Vec::new();
        }

        let mut timers = self.shared.timers.write();
        // Everything up to (now, max-id) is due; split it out of the map.
        let pending = timers.split_off(&(now + 1, 0));
        let expired = std::mem::replace(&mut *timers, pending);

        let mut callbacks = Vec::with_capacity(expired.len());
        for timer in expired.into_values() {
            let mut slot = timer.callback.lock();
            let Some(callback) = slot.as_ref() else {
                continue;
            };
            callbacks.push(callback.clone());
            if timer.recurring {
                drop(slot);
                timer
                    .deadline
                    .store(now + timer.period.load(Ordering::SeqCst), Ordering::SeqCst);
                Shared::insert_locked(&mut timers, timer);
            } else {
                *slot = None;
            }
        }
        if !callbacks.is_empty() {
            debug!("{} timer(s) expired", callbacks.len());
        }
        callbacks
    }
}

impl Default for TimerSet {
    fn default() -> Self {
        Self::new()
    }
}
