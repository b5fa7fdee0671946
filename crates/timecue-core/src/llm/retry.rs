//! Bounded retry with exponential backoff.
//!
//! The delay before retry `k` (0-indexed failed attempt) is
//! `base_delay * multiplier^k`, so the defaults wait 1s then 2s between three
//! attempts. No delay follows the final attempt. Sleeping goes through
//! [`Sleeper`] so tests can record delays instead of waiting for them.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

/// Retry budget for one composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Backoff multiplier.
    pub multiplier: u32,
    /// Upper bound on a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2,
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.multiplier
            .checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// Worst-case wall time for one composition.
    pub fn worst_case(&self) -> Duration {
        let waiting: Duration = (0..self.attempts.saturating_sub(1))
            .map(|a| self.delay_for_attempt(a))
            .fold(Duration::ZERO, Duration::saturating_add);
        self.attempt_timeout
            .saturating_mul(self.attempts)
            .saturating_add(waiting)
    }
}

/// Sleep primitive used between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Real sleeping on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(duration);
        }
        std::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_three_attempts_ten_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(10));
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
    }

    #[test]
    fn delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(200), Duration::MAX);
    }

    #[test]
    fn worst_case_counts_timeouts_and_waits() {
        // 3 x 10s timeouts + 1s + 2s of backoff.
        assert_eq!(RetryPolicy::default().worst_case(), Duration::from_secs(33));
    }

    #[tokio::test]
    async fn recording_sleeper_does_not_wait() {
        let sleeper = RecordingSleeper::new();
        sleeper.sleep(Duration::from_secs(3600)).await;
        assert_eq!(sleeper.delays(), vec![Duration::from_secs(3600)]);
    }
}
