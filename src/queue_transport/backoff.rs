//! Jittered exponential delays between broker retries.

use std::time::Duration;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::config::RetryBackoff;

const MIN_SLEEP_MS: u64 = 10;

/// Produces the sleep before each retry of a single delivery.
pub struct RetryDelays {
    policy: RetryBackoff,
    current: Duration,
    rng: StdRng,
}

impl RetryDelays {
    pub fn new(policy: RetryBackoff) -> Self {
        Self {
            current: policy.base,
            rng: StdRng::from_entropy(),
            policy,
        }
    }

    /// Start over for a new delivery.
    pub fn reset(&mut self) {
        self.current = self.policy.base;
    }

    /// Delay before the next retry; doubles up to the cap on every call.
    pub fn next_delay(&mut self) -> Duration {
        let max_ms = self.current.as_millis().min(u128::from(u64::MAX)) as u64;
        let sleep_ms = match max_ms {
            0 => 0,
            1..=MIN_SLEEP_MS => max_ms,
            _ => self.rng.gen_range(MIN_SLEEP_MS..=max_ms),
        };
        self.current = self.current.saturating_mul(2).min(self.policy.cap);
        Duration::from_millis(sleep_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn policy(base_ms: u64, cap_ms: u64) -> RetryBackoff {
        RetryBackoff {
            base: Duration::from_millis(base_ms),
            cap: Duration::from_millis(cap_ms),
        }
    }

    #[rstest]
    fn delays_stay_within_doubling_window() {
        let mut delays = RetryDelays::new(policy(100, 10_000));
        for ceiling in [100, 200, 400, 800] {
            let delay = delays.next_delay();
            assert!(delay >= Duration::from_millis(MIN_SLEEP_MS));
            assert!(delay <= Duration::from_millis(ceiling));
        }
    }

    #[rstest]
    fn delays_never_exceed_cap() {
        let mut delays = RetryDelays::new(policy(100, 250));
        for _ in 0..10 {
            assert!(delays.next_delay() <= Duration::from_millis(250));
        }
    }

    #[rstest]
    fn small_bases_are_used_verbatim() {
        let mut delays = RetryDelays::new(policy(2, 4));
        assert_eq!(delays.next_delay(), Duration::from_millis(2));
        assert_eq!(delays.next_delay(), Duration::from_millis(4));
        delays.reset();
        assert_eq!(delays.next_delay(), Duration::from_millis(2));
    }

    #[rstest]
    fn zero_base_never_sleeps() {
        let mut delays = RetryDelays::new(policy(0, 0));
        assert_eq!(delays.next_delay(), Duration::ZERO);
        assert_eq!(delays.next_delay(), Duration::ZERO);
    }
}
