use rand::Rng;
use std::time::Duration;

/// Bounded exponential backoff with jitter for pair-scoped transactions.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff_base: Duration::from_millis(15),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`: `base * 2^(attempt-1)` plus up to
    /// one `base` of jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.backoff_base * 2u32.saturating_pow(attempt.saturating_sub(1).min(8));
        let base_ms = self.backoff_base.as_millis() as u64;
        let jitter = if base_ms == 0 { 0 } else { rand::thread_rng().gen_range(0..=base_ms) };
        exp + Duration::from_millis(jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_within_jitter() {
        let policy = RetryPolicy { max_attempts: 5, backoff_base: Duration::from_millis(10) };
        let first = policy.backoff(1);
        let third = policy.backoff(3);
        assert!(first >= Duration::from_millis(10) && first <= Duration::from_millis(20));
        assert!(third >= Duration::from_millis(40) && third <= Duration::from_millis(50));
    }
}
