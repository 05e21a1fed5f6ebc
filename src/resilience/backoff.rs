//! Reconnect delay with optional jitter.

use std::time::Duration;

use rand::Rng;

/// Fixed reconnect delay plus up to `jitter_ms` of random spread.
///
/// With `jitter_ms == 0` the delay is exactly `interval_ms`.
pub fn reconnect_delay(interval_ms: u64, jitter_ms: u64) -> Duration {
    let jitter = if jitter_ms > 0 {
        rand::thread_rng().gen_range(0..=jitter_ms)
    } else {
        0
    };

    Duration::from_millis(interval_ms.saturating_add(jitter))
}
