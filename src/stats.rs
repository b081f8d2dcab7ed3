//! §9 `PollStats`: the home for the "measure idle time for load metrics"
//! side channel §4.4 mentions but leaves unspecified.

/// Counters accumulated across ticks, readable via
/// [`Poller::stats`](crate::Poller::stats).
#[derive(Copy, Clone, Debug, Default)]
pub struct PollStats {
    /// Total number of ticks run (calls to [`Poller::poll`](crate::Poller::poll)).
    pub ticks: u64,
    /// Total number of kernel-reported events dispatched.
    pub events_dispatched: u64,
    /// Total milliseconds spent blocked in the kernel wait.
    pub idle_ms: u64,
}

impl PollStats {
    pub(crate) fn record_tick(&mut self, events: usize, idle_ms: u64) {
        self.ticks += 1;
        self.events_dispatched += events as u64;
        self.idle_ms += idle_ms;
    }
}
