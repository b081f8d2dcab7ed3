//! The poll loop (§4.2–§4.6) and lifecycle (§4.7).

use std::io;
use std::os::unix::io::RawFd;

use crate::clock;
use crate::config::PollerConfig;
use crate::direction::Direction;
use crate::error::PollerError;
use crate::fd_state::ACTIVE;
use crate::readiness::{self, EV_STICKY};
use crate::registry::{self, EPOLL_PREFERENCE};
use crate::selector::{self, Selector};
use crate::stats::PollStats;
use crate::table::Table;
use crate::IoCallback;

/// Read-only flags the poller consults to decide whether other work is
/// pending (§4.3). The task scheduler and signal queue themselves are out
/// of scope for this crate (§1); a host process implements this trait over
/// its own run queue and signal queue.
pub trait ExternalActivity {
    /// Is there runnable task work pending?
    fn run_queue_nonempty(&self) -> bool;
    /// Is there a pending signal to process?
    fn signal_queue_nonempty(&self) -> bool;
}

/// An `ExternalActivity` that never reports pending work, for standalone
/// use of the poller (tests, or a host with no scheduler of its own).
pub struct NoExternalActivity;

impl ExternalActivity for NoExternalActivity {
    fn run_queue_nonempty(&self) -> bool {
        false
    }

    fn signal_queue_nonempty(&self) -> bool {
        false
    }
}

/// Upper bound on the per-tick kernel wait when no expiry is given (§4.3).
const MAX_DELAY_MS: u64 = 1000;

/// §4.7 `test`: attempt a throwaway creation of the OS poll object.
pub fn test() -> bool {
    Selector::new().is_ok()
}

/// §4.7 `register`: publish this poller into the global registry with
/// preference 400. A no-op if the registry is full.
pub fn register() {
    registry::register("epoll", EPOLL_PREFERENCE);
}

/// The speculative-readiness poller (§2 `PollLoop` + `PollerLifecycle`).
///
/// Single-threaded, cooperative: every method here except construction is
/// meant to be called from the one thread that drives `poll`.
pub struct Poller {
    selector: Selector,
    table: Table,
    config: PollerConfig,
    events: Vec<libc::epoll_event>,
    in_poll_loop: bool,
    preference: u16,
    stats: PollStats,
    high_water: usize,
}

impl Poller {
    /// §4.7 `init`.
    pub fn init(config: PollerConfig) -> Result<Poller, PollerError> {
        if !config.validate() {
            return Err(PollerError::Init(io::Error::new(
                io::ErrorKind::InvalidInput,
                "maxsock and maxpollevents must both be positive",
            )));
        }
        let selector = Selector::new().map_err(PollerError::Init)?;
        let events_capacity = config.maxpollevents.max(config.maxsock);
        Ok(Poller {
            selector,
            table: Table::with_capacity(config.maxsock),
            config,
            events: Vec::with_capacity(events_capacity),
            in_poll_loop: false,
            preference: EPOLL_PREFERENCE,
            stats: PollStats::default(),
            high_water: 0,
        })
    }

    /// §4.7 `term`: frees the event buffer and closes the poll object by
    /// consuming `self`; the instance is unselectable from that point on.
    pub fn term(mut self) {
        self.preference = 0;
    }

    /// §4.7 `fork`: close the inherited poll object and create a fresh one.
    /// A shared OS poll object across forked processes has been observed to
    /// deliver readiness for fds already removed in the other process.
    pub fn fork(&mut self) -> io::Result<()> {
        self.selector = Selector::new()?;
        self.in_poll_loop = false;
        Ok(())
    }

    /// Whether this poller is currently dispatching callbacks. Debugging
    /// aid only — callbacks must not invoke `poll` recursively.
    pub fn in_poll_loop(&self) -> bool {
        self.in_poll_loop
    }

    /// §6 `absmaxevents`.
    pub fn absmaxevents(&self) -> usize {
        self.config.maxpollevents.max(self.config.maxsock)
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    pub fn preference(&self) -> u16 {
        self.preference
    }

    // ---- §6 registration surface (this crate's stand-in for the fd allocator) ----

    /// Register `fd` with a callback. Does not itself request any
    /// readiness; call [`Poller::set_active`] or [`Poller::set_polled`]
    /// afterwards.
    pub fn register<C>(&mut self, fd: RawFd, callback: C) -> Result<(), PollerError>
    where
        C: IoCallback + 'static,
    {
        if fd < 0 || fd as usize >= self.table.capacity() {
            return Err(PollerError::CapacityExceeded {
                maxsock: self.config.maxsock,
            });
        }
        let rec = self.table.get_mut(fd).expect("checked above");
        rec.callback = Some(Box::new(callback));
        rec.new = self.in_poll_loop;
        self.high_water = self.high_water.max(fd as usize + 1);
        Ok(())
    }

    /// Fully close `fd`: clears the SpecList entry, zeroes its state, and
    /// releases its callback. This is the public-API analogue of §4.1
    /// `close_notify`, extended to also drop ownership since this crate
    /// owns the fd table rather than an external allocator.
    pub fn deregister(&mut self, fd: RawFd) {
        self.close_notify(fd);
        if let Some(rec) = self.table.get_mut(fd) {
            rec.callback = None;
        }
    }

    // ---- §4.1 primitive operations ----

    pub fn is_set(&self, fd: RawFd, dir: Direction) -> bool {
        self.table.is_set(fd, dir)
    }

    pub fn set_active(&mut self, fd: RawFd, dir: Direction) {
        self.table.set_active(fd, dir);
    }

    pub fn set_polled(&mut self, fd: RawFd, dir: Direction) {
        self.table.set_polled(fd, dir);
    }

    pub fn clear(&mut self, fd: RawFd, dir: Direction) {
        self.table.clear(fd, dir);
    }

    pub fn remove(&mut self, fd: RawFd) {
        self.table.remove(fd);
    }

    pub fn close_notify(&mut self, fd: RawFd) {
        self.table.close_notify(fd);
    }

    // ---- §4.3 wait-time computation ----

    fn compute_wait_ms(&self, expiry_tick: u64, external: &dyn ExternalActivity) -> i32 {
        let pending = !self.table.spec.is_empty()
            || external.run_queue_nonempty()
            || external.signal_queue_nonempty();
        if pending {
            return 0;
        }
        if expiry_tick == 0 {
            return MAX_DELAY_MS as i32;
        }
        let now = clock::now_ms();
        if clock::tick_is_expired(now, expiry_tick) {
            return 0;
        }
        let remain = clock::tick_remain(now, expiry_tick);
        std::cmp::min(MAX_DELAY_MS, remain + 1) as i32
    }

    fn events_capacity(&self) -> usize {
        let max_fd_in_use = self.high_water.max(1);
        std::cmp::min(max_fd_in_use, self.config.maxpollevents)
            .max(1)
            .min(self.events.capacity())
    }

    /// Take the callback out of `fd`'s record, invoke it with `&mut self`,
    /// then restore it unless the callback (or a nested callback it
    /// triggered) already installed a new one or dropped ownership. This
    /// is how callback reentrancy (§5) is reconciled with Rust's aliasing
    /// rules: the table never holds a live borrow while a callback runs.
    fn invoke_callback(&mut self, fd: RawFd) {
        let taken = match self.table.get_mut(fd) {
            Some(rec) => rec.callback.take(),
            None => None,
        };
        let Some(mut cb) = taken else { return };
        cb.ready(self, fd);
        if let Some(rec) = self.table.get_mut(fd) {
            if rec.callback.is_none() {
                rec.callback = Some(cb);
            }
        }
    }

    /// §4.4: the kernel-wait + top-level dispatch phase, followed by the
    /// nested new-fd drain (§4.5) and the SpecList drive (§4.6).
    pub fn poll(
        &mut self,
        expiry_tick: u64,
        external: &dyn ExternalActivity,
    ) -> io::Result<PollStats> {
        debug_assert!(!self.in_poll_loop, "poll() called re-entrantly");

        // §4.2: start-of-tick update drain.
        self.table.drain_updates(&self.selector);

        let wait_ms = self.compute_wait_ms(expiry_tick, external);
        #[cfg(feature = "log")]
        log::trace!(
            "tick {}: wait_ms={wait_ms} spec_len={}",
            self.stats.ticks,
            self.table.spec.len()
        );

        self.in_poll_loop = true;
        let wait_start = clock::now_ms();
        let capacity = self.events_capacity();
        let n = match self.selector.wait(&mut self.events, capacity, wait_ms) {
            Ok(n) => n,
            Err(err) => match err.raw_os_error() {
                Some(libc::EINTR) => 0,
                Some(libc::EBADF) | Some(libc::EINVAL) => {
                    // §7 kind 3: a broken epoll fd is a programming error,
                    // not a transient condition — this one case propagates.
                    self.in_poll_loop = false;
                    return Err(err);
                }
                _ => {
                    #[cfg(feature = "log")]
                    log::debug!("kernel wait failed: {err}");
                    0
                }
            },
        };
        let idle_ms = clock::now_ms().saturating_sub(wait_start);

        for i in 0..n {
            let fd = selector::event_fd(&self.events[i]);
            if !self.table.has_owner(fd) {
                // §4.4 step 1 / §7 kind 4: fd was closed concurrently.
                continue;
            }

            let raw = selector::event_raw(&self.events[i]);
            let translated = readiness::translate_epoll(raw);
            let rec = self.table.get_mut(fd).expect("has_owner implies present");
            rec.ev = (rec.ev & EV_STICKY) | translated;
            let ev = rec.ev;
            let has_callback = rec.callback.is_some();

            if has_callback && ev != 0 {
                if ev & (readiness::EV_IN | readiness::EV_HUP | readiness::EV_ERR) != 0 {
                    self.table.set_active(fd, Direction::Read);
                }
                if ev & (readiness::EV_OUT | readiness::EV_ERR) != 0 {
                    self.table.set_active(fd, Direction::Write);
                }

                let new_updt_start = self.table.updates.len();
                self.invoke_callback(fd);
                self.nested_new_fd_drain(new_updt_start);
            }
        }

        #[cfg(feature = "log")]
        log::trace!("kernel wait returned {n} events, idle_ms={idle_ms}");

        self.drive_spec_list();
        #[cfg(feature = "log")]
        log::trace!("spec_len after drive={}", self.table.spec.len());

        self.in_poll_loop = false;
        self.stats.record_tick(n, idle_ms);
        Ok(self.stats)
    }

    /// §4.5: drive fds created during the callback just invoked, scanning
    /// the UpdateList tail backwards so a trailing run of now-idle entries
    /// can be popped as we go.
    fn nested_new_fd_drain(&mut self, new_updt_start: usize) {
        let mut i = self.table.updates.len();
        while i > new_updt_start {
            i -= 1;
            if i >= self.table.updates.len() {
                // An earlier pop in this same pass already shrank the list
                // past this position.
                continue;
            }
            let idx = self.table.updates[i];
            let fd = idx as RawFd;

            let rec = match self.table.get_mut(fd) {
                Some(rec) => rec,
                None => continue,
            };
            if !rec.new {
                continue;
            }
            rec.new = false;
            rec.ev &= EV_STICKY;
            if rec.state.status(Direction::Read) == ACTIVE {
                rec.ev |= readiness::EV_IN;
            }
            if rec.state.status(Direction::Write) == ACTIVE {
                rec.ev |= readiness::EV_OUT;
            }
            let ev = rec.ev;
            let has_callback = rec.callback.is_some();

            if ev != 0 && has_callback {
                self.invoke_callback(fd);
            }

            if i == self.table.updates.len().wrapping_sub(1) {
                let idle = !self.table.is_set(fd, Direction::Read)
                    && !self.table.is_set(fd, Direction::Write);
                if idle {
                    self.table.updates.pop();
                    if let Some(rec) = self.table.get_mut(fd) {
                        rec.updated = false;
                    }
                }
            }
        }
    }

    /// §4.6: drive every fd still carrying ACTIVE interest after the
    /// kernel-event phase.
    fn drive_spec_list(&mut self) {
        let mut idx = 0;
        while idx < self.table.spec.len() {
            let fd = self.table.spec[idx] as RawFd;

            let rec = self.table.get_mut(fd).expect("SpecList entries are always owned");
            rec.ev &= EV_STICKY;
            if rec.state.status(Direction::Read) == ACTIVE {
                rec.ev |= readiness::EV_IN;
            }
            if rec.state.status(Direction::Write) == ACTIVE {
                rec.ev |= readiness::EV_OUT;
            }
            let ev = rec.ev;
            let has_callback = rec.callback.is_some();

            if ev != 0 && has_callback {
                self.invoke_callback(fd);
            }

            // Index advancement rule: only move on if `fd` is still at
            // `idx` — a callback that removed it would have swap-filled
            // the slot with its successor, which must be seen too.
            if self.table.spec.get(idx).copied() == Some(fd as usize) {
                idx += 1;
            }
        }
    }
}
