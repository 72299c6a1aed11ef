use std::time::Duration;

use rand::Rng;

/// Capped exponential backoff with up to 50% random jitter.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    pub const fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let pow = attempt.saturating_sub(1).min(20);
        let delay = self.base.saturating_mul(1u32 << pow).min(self.max);

        let jitter_cap = (delay.as_millis() / 2) as u64;
        if jitter_cap == 0 {
            return delay;
        }
        let jitter = rand::rng().random_range(0..=jitter_cap);
        (delay + Duration::from_millis(jitter)).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(60))
    }
}
