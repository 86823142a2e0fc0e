use std::time::Duration;

use crate::config::RetryConfig;

/// Exponential backoff schedule for a single storage operation.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Option<Duration>,
}

impl RetryPolicy {
    pub fn exponential(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: None,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = if max_delay.is_zero() {
            None
        } else {
            Some(max_delay)
        };
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Starts a fresh attempt counter for one operation.
    pub fn handle(&self) -> RetryHandle {
        RetryHandle {
            policy: self.clone(),
            attempts: 1,
        }
    }

    fn delay_for_retry(&self, retry: usize) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let shift = retry.saturating_sub(1).min(31);
        let raw = self.base_delay.saturating_mul(1u32 << shift);
        match self.max_delay {
            Some(max) => raw.min(max),
            None => raw,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::exponential(config.max_attempts, config.base_delay)
            .with_max_delay(config.max_delay)
    }
}

/// Attempt counter for one operation. The first attempt is counted on
/// creation.
pub struct RetryHandle {
    policy: RetryPolicy,
    attempts: usize,
}

impl RetryHandle {
    /// Delay to wait before the next attempt, or `None` once the attempt
    /// budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.policy.max_attempts {
            return None;
        }
        let delay = self.policy.delay_for_retry(self.attempts);
        self.attempts += 1;
        Some(delay)
    }

    /// Attempts made so far, including the one in flight.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}
