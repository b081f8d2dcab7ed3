use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

macro_rules! syscall {
    ($fn: ident ( $($arg: expr),* $(,)* ) ) => {{
        let res = unsafe { libc::$fn($($arg, )*) };
        if res == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(res)
        }
    }};
}

/// Thin wrapper over a single `epoll` instance.
///
/// Unlike a general-purpose reactor, this selector never needs to translate
/// a `Token`: the proxy's fd table is dense and fd-indexed, so the fd itself
/// is used as the epoll `data.u64` payload.
#[derive(Debug)]
pub(crate) struct Selector {
    ep: OwnedFd,
}

impl Selector {
    pub(crate) fn new() -> io::Result<Selector> {
        // SAFETY: `epoll_create1(2)` ensures the fd is valid on success.
        let ep = unsafe { OwnedFd::from_raw_fd(syscall!(epoll_create1(libc::EPOLL_CLOEXEC))?) };
        Ok(Selector { ep })
    }

    pub(crate) fn add(&self, fd: RawFd, mask: u32) -> io::Result<()> {
        let mut event = libc::epoll_event {
            events: mask,
            u64: fd as u64,
        };
        syscall!(epoll_ctl(
            self.ep.as_raw_fd(),
            libc::EPOLL_CTL_ADD,
            fd,
            &mut event
        ))
        .map(|_| ())
    }

    pub(crate) fn modify(&self, fd: RawFd, mask: u32) -> io::Result<()> {
        let mut event = libc::epoll_event {
            events: mask,
            u64: fd as u64,
        };
        syscall!(epoll_ctl(
            self.ep.as_raw_fd(),
            libc::EPOLL_CTL_MOD,
            fd,
            &mut event
        ))
        .map(|_| ())
    }

    pub(crate) fn del(&self, fd: RawFd) -> io::Result<()> {
        syscall!(epoll_ctl(
            self.ep.as_raw_fd(),
            libc::EPOLL_CTL_DEL,
            fd,
            std::ptr::null_mut()
        ))
        .map(|_| ())
    }

    /// §4.4: wait for readiness, writing up to `capacity` events into `buf`.
    /// `timeout_ms < 0` blocks indefinitely; `0` does not block at all.
    pub(crate) fn wait(
        &self,
        buf: &mut Vec<libc::epoll_event>,
        capacity: usize,
        timeout_ms: i32,
    ) -> io::Result<usize> {
        debug_assert!(capacity <= buf.capacity());
        let n = syscall!(epoll_wait(
            self.ep.as_raw_fd(),
            buf.as_mut_ptr(),
            capacity as i32,
            timeout_ms,
        ))?;
        // SAFETY: `epoll_wait` guarantees the first `n` slots were written.
        unsafe { buf.set_len(n as usize) };
        Ok(n as usize)
    }
}

impl AsRawFd for Selector {
    fn as_raw_fd(&self) -> RawFd {
        self.ep.as_raw_fd()
    }
}

pub(crate) fn event_fd(event: &libc::epoll_event) -> RawFd {
    event.u64 as RawFd
}

pub(crate) fn event_raw(event: &libc::epoll_event) -> u32 {
    event.events
}
