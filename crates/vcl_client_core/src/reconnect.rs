use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

/// A connection that stayed up this long resets the backoff.
pub const RECONNECT_RESET_AFTER: Duration = Duration::from_secs(60 * 5);

const BASE_DELAY_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 30_000;

/// Delay before reconnect attempt `attempt` (1-based), with ±10% jitter.
pub fn reconnect_delay(attempt: u32) -> Duration {
	let pow = 2u64.saturating_pow(attempt.saturating_sub(1).min(6));
	let delay_ms = BASE_DELAY_MS.saturating_mul(pow).min(MAX_DELAY_MS);
	let jitter_window = (delay_ms / 10).max(1);
	let jitter_offset = rand::rng().random_range(0..=(jitter_window * 2));
	Duration::from_millis(delay_ms.saturating_sub(jitter_window).saturating_add(jitter_offset))
}

pub fn schedule_reconnect(attempt: u32) -> (Instant, u64) {
	let delay = reconnect_delay(attempt);
	(Instant::now() + delay, delay.as_millis() as u64)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn delay_grows_and_caps() {
		let first = reconnect_delay(1).as_millis() as u64;
		assert!((450..=550).contains(&first), "{first}");

		let third = reconnect_delay(3).as_millis() as u64;
		assert!((1800..=2200).contains(&third), "{third}");

		for attempt in [7, 8, 50, u32::MAX] {
			let ms = reconnect_delay(attempt).as_millis() as u64;
			assert!(ms <= MAX_DELAY_MS + MAX_DELAY_MS / 10, "{attempt}: {ms}");
			assert!(ms >= 27_000, "{attempt}: {ms}");
		}
	}
}
