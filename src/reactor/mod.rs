//! Epoll-driven readiness reactor.
//!
//! A [`Reactor`] composes a [`Scheduler`](crate::Scheduler) with a timer set,
//! an epoll instance and a per-descriptor event table. It installs itself as
//! the scheduler's idle handler: a worker with nothing to run blocks in
//! `epoll_wait`, bounded by the nearest timer deadline, then re-injects
//! expired timers and fired I/O contexts as ordinary tasks.

mod core;
mod fd;
mod poller;

pub use self::core::{Reactor, ReactorBuilder};
pub use fd::EventKind;

use std::io;
use std::os::unix::io::RawFd;

use thiserror::Error;

/// Failure to arm the OS multiplexer for a descriptor.
///
/// Registration failures (table full, descriptor limit, bad fd) are local to
/// the caller of [`Reactor::add_event`]; they never take the reactor down.
#[derive(Debug, Error)]
#[error("failed to arm {kind:?} interest for fd {fd}: {source}")]
pub struct RegisterError {
    pub fd: RawFd,
    pub kind: EventKind,
    #[source]
    pub source: io::Error,
}

impl From<RegisterError> for io::Error {
    fn from(err: RegisterError) -> io::Error {
        let kind = err.source.kind();
        io::Error::new(kind, err)
    }
}
