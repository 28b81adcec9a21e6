use std::thread;
use std::time::Duration;

use rand::Rng;

/// Sleep around `ms` milliseconds with +/-20% random jitter, so the
/// frame loop never becomes metronomic.
pub fn pace(ms: u64) {
    let jitter = ms as f64 * 0.2;
    let actual = ms as f64 + rand::thread_rng().gen_range(-jitter..=jitter);
    thread::sleep(Duration::from_millis(actual.max(1.0) as u64));
}

/// Sleep for exact milliseconds (no jitter).
pub fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}
