//! Retry pacing for background loops.
//!
//! The persist loop backs off exponentially while the database is failing;
//! the AIS feed reconnects after a fixed delay.

use std::time::{Duration, Instant};

use rand::Rng;

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
    factor: u32,
    jitter_ratio: f64,
    next_attempt_at: Instant,
}

impl Backoff {
    /// Doubling delay starting at `base`, capped at `max`, with up to 20% jitter.
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            max: max.max(base),
            current: base,
            factor: 2,
            jitter_ratio: 0.2,
            next_attempt_at: Instant::now(),
        }
    }

    /// The same delay after every failure.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            factor: 1,
            jitter_ratio: 0.0,
            ..Self::new(delay, delay)
        }
    }

    pub fn ready(&self) -> bool {
        Instant::now() >= self.next_attempt_at
    }

    pub fn reset(&mut self) {
        self.current = self.base;
        self.next_attempt_at = Instant::now();
    }

    /// Record a failure and return how long to wait before the next attempt.
    pub fn fail(&mut self) -> Duration {
        self.current = self.current.saturating_mul(self.factor).min(self.max);
        let delay = with_jitter(self.current, self.jitter_ratio);
        self.next_attempt_at = Instant::now() + delay;
        delay
    }
}

fn with_jitter(delay: Duration, ratio: f64) -> Duration {
    if !(ratio > 0.0 && ratio <= 1.0) {
        return delay;
    }
    let max_extra_ms = (delay.as_millis() as f64 * ratio) as u64;
    if max_extra_ms == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::rng().random_range(0..=max_extra_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_delays_until_reset() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(1));
        assert!(backoff.ready());

        let delay = backoff.fail();
        assert!(delay >= Duration::from_millis(200));
        assert!(!backoff.ready());

        backoff.reset();
        assert!(backoff.ready());
    }

    #[test]
    fn exponential_delay_saturates_at_max() {
        let mut backoff = Backoff::new(Duration::from_millis(10), Duration::from_millis(20));
        for _ in 0..3 {
            let delay = backoff.fail();
            assert!(delay >= Duration::from_millis(20));
            assert!(delay <= Duration::from_millis(24));
        }
    }

    #[test]
    fn fixed_delay_never_grows() {
        let mut backoff = Backoff::fixed(Duration::from_secs(5));
        assert_eq!(backoff.fail(), Duration::from_secs(5));
        assert_eq!(backoff.fail(), Duration::from_secs(5));
    }
}
