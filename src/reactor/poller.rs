//! Thin wrapper over the epoll descriptor and the cross-thread wake pipe.

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLET, EPOLLIN, O_CLOEXEC,
    O_NONBLOCK, close, epoll_create1, epoll_ctl, epoll_event, epoll_wait, pipe2, read, write,
};
use std::io;
use std::os::unix::io::RawFd;

/// A cheap, clonable handle that can interrupt a blocked [`Poller::wait`]
/// from any thread by writing one byte down the wake pipe.
#[derive(Clone, Copy)]
pub(crate) struct WakeHandle {
    fd: RawFd,
}

impl WakeHandle {
    pub(crate) fn wake(&self) {
        let byte = b"T";
        unsafe {
            write(self.fd, byte.as_ptr() as *const _, 1);
        }
    }
}

pub(crate) struct Poller {
    epfd: RawFd,
    wake_fds: [RawFd; 2],
}

impl Poller {
    pub(crate) fn new() -> io::Result<Poller> {
        let epfd = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epfd < 0 {
            return Err(io::Error::last_os_error());
        }

        let mut wake_fds = [0 as RawFd; 2];
        if unsafe { pipe2(wake_fds.as_mut_ptr(), O_NONBLOCK | O_CLOEXEC) } != 0 {
            let err = io::Error::last_os_error();
            unsafe { close(epfd) };
            return Err(err);
        }

        let poller = Poller { epfd, wake_fds };
        // The read end lives in the interest set forever; waits are
        // interrupted by writing to the other end.
        poller.arm(wake_fds[0], EPOLLIN as u32 | EPOLLET as u32, false)?;
        Ok(poller)
    }

    pub(crate) fn wake_fd(&self) -> RawFd {
        self.wake_fds[0]
    }

    pub(crate) fn wake_handle(&self) -> WakeHandle {
        WakeHandle {
            fd: self.wake_fds[1],
        }
    }

    /// Registers (`modify == false`) or re-registers `fd` with the given
    /// event mask. The mask must already contain `EPOLLET`/`EPOLLIN`/... bits.
    pub(crate) fn arm(&self, fd: RawFd, events: u32, modify: bool) -> io::Result<()> {
        let op = if modify { EPOLL_CTL_MOD } else { EPOLL_CTL_ADD };
        let mut event = epoll_event {
            events,
            u64: fd as u64,
        };
        if unsafe { epoll_ctl(self.epfd, op, fd, &mut event) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub(crate) fn disarm(&self, fd: RawFd) -> io::Result<()> {
        let mut event = epoll_event { events: 0, u64: 0 };
        if unsafe { epoll_ctl(self.epfd, EPOLL_CTL_DEL, fd, &mut event) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Blocks for readiness events, at most `timeout_ms`. `EINTR` surfaces
    /// as `ErrorKind::Interrupted`; the caller decides whether to retry.
    pub(crate) fn wait(&self, events: &mut [epoll_event], timeout_ms: u64) -> io::Result<usize> {
        let timeout = timeout_ms.min(i32::MAX as u64) as i32;
        let n = unsafe {
            epoll_wait(
                self.epfd,
                events.as_mut_ptr(),
                events.len() as i32,
                timeout,
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    /// Discards every byte queued on the wake pipe.
    pub(crate) fn drain_wake(&self) {
        let mut buf = [0u8; 256];
        loop {
            let n = unsafe { read(self.wake_fds[0], buf.as_mut_ptr() as *mut _, buf.len()) };
            if n <= 0 {
                break;
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        unsafe {
            close(self.epfd);
            close(self.wake_fds[0]);
            close(self.wake_fds[1]);
        }
    }
}
