//! The `KernelInterestSet` wrapper (§3, §4.2) over Linux `epoll(7)`.
//!
//! Only level-triggered, `epoll`-backed operation is implemented — per the
//! spec's Non-goals, edge-triggered notification and non-Linux readiness
//! primitives are out of scope for this crate.

mod epoll;

pub(crate) use epoll::{event_fd, event_raw, Selector};
