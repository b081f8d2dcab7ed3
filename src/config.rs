//! §4.10 configuration surface.
//!
//! This crate reads no config file, environment variable, or remote store
//! itself; the host process threads its own configuration values in through
//! this struct, matching §6's "Configuration (read at init)" contract.

/// Knobs consumed at [`Poller::init`](crate::Poller::init).
#[derive(Copy, Clone, Debug)]
pub struct PollerConfig {
    /// Hard cap on concurrent fds; also the size the OS poll object and the
    /// fd table are allocated for.
    pub maxsock: usize,
    /// Kernel wait batch size: the maximum number of events one
    /// `epoll_wait` call returns at a time.
    pub maxpollevents: usize,
}

impl PollerConfig {
    /// A conservative default suitable for tests and small embedders.
    pub const fn new(maxsock: usize, maxpollevents: usize) -> Self {
        PollerConfig {
            maxsock,
            maxpollevents,
        }
    }

    pub(crate) fn validate(&self) -> bool {
        self.maxsock > 0 && self.maxpollevents > 0
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        PollerConfig {
            maxsock: 1024,
            maxpollevents: 200,
        }
    }
}
