//! A speculative-readiness, `epoll`-backed I/O multiplexer.
//!
//! Where a plain level-triggered poll loop asks the kernel about every fd on
//! every tick, this crate lets a callback ask to be revisited *without* a
//! fresh kernel readiness check — useful when a caller already knows more
//! work is pending (a partially drained read buffer, a stalled write) and
//! would rather be driven again next tick than pay another `epoll_wait`
//! round trip. Each fd carries two bits of state per direction: whether the
//! kernel is currently watching it (`POLLED`) and whether it should be
//! speculatively revisited regardless of what the kernel reports
//! (`ACTIVE`). [`Poller::set_active`] and [`Poller::set_polled`] toggle
//! these; [`Poller::poll`] drains the resulting queues once per tick.
//!
//! Only Linux `epoll(7)`, level-triggered, single-threaded dispatch is
//! supported — no edge-triggered mode, no other OS readiness primitive, no
//! parallel dispatch across threads.
//!
//! ```no_run
//! use specpoll::{NoExternalActivity, Poller, PollerConfig};
//!
//! let mut poller = Poller::init(PollerConfig::default())?;
//! // poller.register(fd, |p: &mut Poller, fd| { .. })?;
//! // poller.set_polled(fd, specpoll::Direction::Read);
//! poller.poll(0, &NoExternalActivity)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod clock;
mod config;
mod direction;
mod error;
mod fd_state;
mod poller;
mod readiness;
mod registry;
mod selector;
mod stats;
mod table;

use std::os::unix::io::RawFd;

pub use config::PollerConfig;
pub use direction::Direction;
pub use error::PollerError;
pub use poller::{register, test, ExternalActivity, NoExternalActivity, Poller};
pub use registry::{registered_pollers, PollerDescriptor};
pub use stats::PollStats;

/// What runs when a registered fd has work to do: a kernel-reported event,
/// or a speculative revisit requested via [`Poller::set_active`].
///
/// Implemented for any `FnMut(&mut Poller, RawFd)`, so most callers pass a
/// closure rather than a named type.
pub trait IoCallback {
    fn ready(&mut self, poller: &mut Poller, fd: RawFd);
}

impl<F> IoCallback for F
where
    F: FnMut(&mut Poller, RawFd),
{
    fn ready(&mut self, poller: &mut Poller, fd: RawFd) {
        self(poller, fd)
    }
}
