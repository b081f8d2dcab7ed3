//! §4.9 / §7 error handling.
//!
//! Almost everything this crate does is recovered locally and only
//! surfaced through `log` (kernel-mutation failures, kernel-wait failures —
//! see §7.2, §7.3). `PollerError` exists only for the handful of conditions
//! that actually need to propagate to the caller.

use std::fmt;
use std::io;

/// Errors returned from the small set of operations that are allowed to
/// fail outwardly (§7, propagation policy).
#[derive(Debug)]
pub enum PollerError {
    /// `epoll_create1` or the event-buffer allocation failed at `init`
    /// (§4.7, §7 kind 1). The caller should consult the poller registry and
    /// select a different poller.
    Init(io::Error),
    /// `register` was called with `fd >= maxsock`.
    CapacityExceeded {
        /// The `maxsock` limit that was exceeded.
        maxsock: usize,
    },
}

impl fmt::Display for PollerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollerError::Init(err) => write!(f, "poller initialization failed: {err}"),
            PollerError::CapacityExceeded { maxsock } => {
                write!(f, "fd exceeds configured maxsock ({maxsock})")
            }
        }
    }
}

impl std::error::Error for PollerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PollerError::Init(err) => Some(err),
            PollerError::CapacityExceeded { .. } => None,
        }
    }
}

impl From<io::Error> for PollerError {
    fn from(err: io::Error) -> Self {
        PollerError::Init(err)
    }
}
