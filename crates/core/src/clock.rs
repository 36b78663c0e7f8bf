use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch on the local clock.
pub fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Estimated difference between the server clock and the local clock, in
/// signed milliseconds.
///
/// Computed once per connection from a single round-trip timestamp exchange:
/// the client records local send time `t0`, the server replies with its own
/// clock reading `ts`, and the client records local receive time `t1`.
/// One-way latency is assumed symmetric, `(t1 - t0) / 2`, so the local clock
/// read at the moment the server sampled its own is `t1 - latency` and the
/// offset is `ts - (t1 - latency)`.
///
/// The default offset is zero: when the round trip never completes the
/// client silently degrades to its unadjusted local clock, which is the only
/// clock it has. Residual drift over a typical performance (tens of minutes)
/// stays within visual tolerance, so no periodic re-synchronization is done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockOffset {
    millis: i64,
}

impl ClockOffset {
    pub fn from_round_trip(t0: u64, t1: u64, server_ts: u64) -> Self {
        let latency = (t1 as i64 - t0 as i64) / 2;
        let millis = server_ts as i64 - (t1 as i64 - latency);
        Self { millis }
    }

    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// Approximate the server's clock reading for a local timestamp.
    pub fn corrected(&self, local_now_ms: u64) -> u64 {
        (local_now_ms as i64 + self.millis).max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_from_round_trip() {
        // Local send at 1000, receive at 1100, server read 1080:
        // latency 50, offset 1080 - (1100 - 50) = 30.
        let offset = ClockOffset::from_round_trip(1000, 1100, 1080);
        assert_eq!(offset.millis(), 30);
    }

    #[test]
    fn offset_can_be_negative() {
        let offset = ClockOffset::from_round_trip(1000, 1100, 1000);
        assert_eq!(offset.millis(), -50);
        assert_eq!(offset.corrected(2050), 2000);
    }

    #[test]
    fn default_offset_is_local_clock_passthrough() {
        let offset = ClockOffset::default();
        assert_eq!(offset.corrected(123_456), 123_456);
    }
}
