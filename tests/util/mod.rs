//! Shared fd helpers for the integration tests: a raw, non-blocking `pipe(2)`
//! pair is enough to drive real kernel readiness without pulling in a
//! networking dependency just for tests.
#![allow(dead_code)]

use std::io;
use std::os::unix::io::RawFd;
use std::sync::Once;

pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::try_init();
    })
}

pub fn nonblocking_pipe() -> (RawFd, RawFd) {
    let mut fds = [0; 2];
    let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
    assert_eq!(ret, 0, "pipe(2) failed: {}", io::Error::last_os_error());
    for fd in fds {
        set_nonblocking(fd);
    }
    (fds[0], fds[1])
}

pub fn set_nonblocking(fd: RawFd) {
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
    }
}

pub fn write_byte(fd: RawFd, byte: u8) {
    let buf = [byte];
    let n = unsafe { libc::write(fd, buf.as_ptr().cast(), 1) };
    assert_eq!(n, 1, "write(2) failed: {}", io::Error::last_os_error());
}

/// `None` on `EAGAIN`/`EWOULDBLOCK` (nothing to read), `Some(byte)` otherwise.
pub fn try_read_byte(fd: RawFd) -> Option<u8> {
    let mut buf = [0u8; 1];
    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), 1) };
    if n == 1 {
        Some(buf[0])
    } else {
        None
    }
}

pub fn close_fd(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}
