//! Per-descriptor event slots.
//!
//! An [`FdContext`] records which interest kinds are armed on one descriptor
//! and, per kind, what to run when that kind fires. A slot is consumed
//! exactly once per firing or cancellation; arming a kind that is already
//! armed is an invariant violation.

use log::error;

use std::os::unix::io::RawFd;
use std::sync::Arc;

use crate::scheduler::{FiberTask, Scheduler, TaskKind};

/// Readiness interest kinds. The discriminants are the epoll bits
/// (`EPOLLIN` / `EPOLLOUT`) so interest masks translate directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum EventKind {
    Read = 0x1,
    Write = 0x4,
}

impl EventKind {
    pub(crate) fn bit(self) -> u32 {
        self as u32
    }
}

// What one armed kind resumes when it fires: the parked fiber or a callback,
// plus the scheduler that should run it.
pub(crate) struct EventContext {
    sched: Arc<Scheduler>,
    task: TaskKind,
}

impl EventContext {
    pub(crate) fn new(sched: Arc<Scheduler>, task: TaskKind) -> EventContext {
        EventContext { sched, task }
    }

    fn fire(self) {
        self.sched.schedule(FiberTask::from_kind(self.task));
    }
}

pub(crate) struct FdContext {
    fd: RawFd,
    armed: u32,
    read: Option<EventContext>,
    write: Option<EventContext>,
}

impl FdContext {
    pub(crate) fn new(fd: RawFd) -> FdContext {
        FdContext {
            fd,
            armed: 0,
            read: None,
            write: None,
        }
    }

    /// Bitmask of currently armed kinds.
    pub(crate) fn armed(&self) -> u32 {
        self.armed
    }

    fn slot_mut(&mut self, kind: EventKind) -> &mut Option<EventContext> {
        match kind {
            EventKind::Read => &mut self.read,
            EventKind::Write => &mut self.write,
        }
    }

    /// Occupies the slot for `kind`. The slot must be empty.
    pub(crate) fn store(&mut self, kind: EventKind, ctx: EventContext) {
        let fd = self.fd;
        let slot = self.slot_mut(kind);
        if slot.is_some() {
            error!("fd {fd}: {kind:?} slot already occupied");
        }
        assert!(slot.is_none(), "event {:?} already armed on fd {}", kind, fd);
        *slot = Some(ctx);
        self.armed |= kind.bit();
    }

    /// Clears the slot for `kind` without firing it.
    pub(crate) fn clear(&mut self, kind: EventKind) {
        self.armed &= !kind.bit();
        *self.slot_mut(kind) = None;
    }

    /// Consumes the slot for `kind` and schedules whatever it held.
    pub(crate) fn trigger(&mut self, kind: EventKind) {
        let fd = self.fd;
        self.armed &= !kind.bit();
        let ctx = self
            .slot_mut(kind)
            .take()
            .unwrap_or_else(|| panic!("fd {fd}: {kind:?} fired with an empty slot"));
        ctx.fire();
    }
}
