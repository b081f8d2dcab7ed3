//! Minimal stand-ins for the monotonic-clock / tick utilities a host
//! process owns: only `now_ms`, `tick_is_expired` and `tick_remain`
//! semantics are assumed here.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, saturating on clock errors rather
/// than panicking.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A `0` expiry means "no deadline" and is never considered expired.
pub(crate) fn tick_is_expired(now: u64, expiry: u64) -> bool {
    expiry != 0 && expiry <= now
}

/// Milliseconds remaining until `expiry`, `0` if already due.
pub(crate) fn tick_remain(now: u64, expiry: u64) -> u64 {
    expiry.saturating_sub(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_expiry_never_expires() {
        assert!(!tick_is_expired(1_000_000, 0));
    }

    #[test]
    fn past_expiry_is_expired() {
        assert!(tick_is_expired(1_000, 500));
        assert!(tick_is_expired(1_000, 1_000));
    }

    #[test]
    fn remain_saturates() {
        assert_eq!(tick_remain(900, 1_000), 100);
        assert_eq!(tick_remain(1_100, 1_000), 0);
    }
}
