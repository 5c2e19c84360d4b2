//! Exponential backoff for background loops writing to storage, so an
//! outage doesn't turn into a tight retry loop.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
    retry_at: Instant,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            current: base,
            retry_at: Instant::now(),
        }
    }

    /// Whether the next attempt is due.
    pub fn ready(&self) -> bool {
        Instant::now() >= self.retry_at
    }

    /// Record a failure and return the delay until the next attempt.
    pub fn failure(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        self.retry_at = Instant::now() + delay;
        delay
    }

    pub fn success(&mut self) {
        self.current = self.base;
        self.retry_at = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_max_and_resets() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(300));
        assert!(backoff.ready());

        assert_eq!(backoff.failure(), Duration::from_millis(100));
        assert!(!backoff.ready());
        assert_eq!(backoff.failure(), Duration::from_millis(200));
        assert_eq!(backoff.failure(), Duration::from_millis(300));
        assert_eq!(backoff.failure(), Duration::from_millis(300));

        backoff.success();
        assert!(backoff.ready());
        assert_eq!(backoff.failure(), Duration::from_millis(100));
    }
}
