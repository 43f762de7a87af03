//! Sliding-window busy-ratio estimation for worker threads.

use parking_lot::RwLock;

use std::collections::VecDeque;
use std::time::Instant;

// One sleep/wake transition; `sleeping` tags what the recorded span was.
struct TimeRecord {
    duration: std::time::Duration,
    sleeping: bool,
}

/// Estimates what fraction of its recent history a worker spent running.
///
/// Every sleep/wake transition appends a record to a bounded window; `load`
/// folds the window (plus the in-progress span) into a 0..=100 busy
/// percentage. Readers never block writers for long: the window is tiny and
/// the lock is a read-write lock.
pub struct LoadCounter {
    max_size: usize,
    inner: RwLock<Inner>,
}

struct Inner {
    sleeping: bool,
    last_sleep: Instant,
    last_wake: Instant,
    records: VecDeque<TimeRecord>,
}

impl LoadCounter {
    /// `max_size` bounds the window; 0 selects the default of 10 records.
    pub fn new(max_size: usize) -> LoadCounter {
        let now = Instant::now();
        LoadCounter {
            max_size: if max_size == 0 { 10 } else { max_size },
            inner: RwLock::new(Inner {
                sleeping: true,
                last_sleep: now,
                last_wake: now,
                records: VecDeque::new(),
            }),
        }
    }

    /// Marks the owner as going idle; records the work span that just ended.
    pub fn start_sleep(&self) {
        let mut inner = self.inner.write();
        if inner.sleeping {
            return;
        }
        let now = Instant::now();
        inner.sleeping = true;
        let worked = now - inner.last_wake;
        inner.last_sleep = now;
        inner.records.push_back(TimeRecord {
            duration: worked,
            sleeping: false,
        });
        if inner.records.len() > self.max_size {
            inner.records.pop_front();
        }
    }

    /// Marks the owner as running again; records the sleep span that ended.
    pub fn start_work(&self) {
        let mut inner = self.inner.write();
        if !inner.sleeping {
            return;
        }
        let now = Instant::now();
        inner.sleeping = false;
        let slept = now - inner.last_sleep;
        inner.last_wake = now;
        inner.records.push_back(TimeRecord {
            duration: slept,
            sleeping: true,
        });
        if inner.records.len() > self.max_size {
            inner.records.pop_front();
        }
    }

    /// Busy percentage over the window, 0..=100.
    pub fn load(&self) -> usize {
        let inner = self.inner.read();
        let mut slept = std::time::Duration::ZERO;
        let mut worked = std::time::Duration::ZERO;
        for rec in &inner.records {
            if rec.sleeping {
                slept += rec.duration;
            } else {
                worked += rec.duration;
            }
        }
        // Fold in the span still in progress.
        let now = Instant::now();
        if inner.sleeping {
            slept += now - inner.last_sleep;
        } else {
            worked += now - inner.last_wake;
        }

        let total = slept + worked;
        if total.is_zero() {
            return 0;
        }
        (worked.as_micros() * 100 / total.as_micros()) as usize
    }
}
