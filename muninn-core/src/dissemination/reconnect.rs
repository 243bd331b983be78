//! Reconnection policy for the dissemination transport
//!
//! Fixed base delay with optional jitter and a bounded attempt count.
//! Once the attempts are exhausted the connection is considered failed
//! and stays failed until the policy is reset.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection state surfaced in the monitor status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Connected and delivering
    Connected,
    /// Disconnected, attempting to reconnect
    Reconnecting,
    /// Gave up after exhausting the attempt budget
    Failed,
}

/// Reconnection attempt statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReconnectStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
}

/// Fixed-delay retry budget with jitter.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    delay: Duration,
    jitter_factor: f64,
    max_attempts: u32,
    attempt: u32,
}

impl ReconnectPolicy {
    pub fn new(delay: Duration, jitter_factor: f64, max_attempts: u32) -> Self {
        Self {
            delay,
            jitter_factor: jitter_factor.clamp(0.0, 1.0),
            max_attempts,
            attempt: 0,
        }
    }

    /// Delay before the next attempt, or `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;

        if self.jitter_factor == 0.0 {
            return Some(self.delay);
        }

        let mut rng = rand::thread_rng();
        let jitter = rng.gen::<f64>() * self.jitter_factor;
        let multiplier = 1.0 + (jitter - self.jitter_factor / 2.0);
        Some(Duration::from_secs_f64(
            self.delay.as_secs_f64() * multiplier,
        ))
    }

    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }

    pub fn attempt_number(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Reset the budget after a successful reconnect.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay_without_jitter() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(100), 0.0, 3);

        assert_eq!(policy.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_delay(), None);
        assert!(!policy.can_retry());
    }

    #[test]
    fn test_jitter_stays_near_base() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(100), 0.2, 100);

        for _ in 0..100 {
            let delay = policy.next_delay().unwrap();
            let ms = delay.as_secs_f64() * 1_000.0;
            assert!((90.0..=110.0).contains(&ms), "delay {}ms out of band", ms);
        }
    }

    #[test]
    fn test_reset_restores_budget() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(10), 0.0, 2);
        policy.next_delay();
        policy.next_delay();
        assert!(!policy.can_retry());

        policy.reset();
        assert!(policy.can_retry());
        assert_eq!(policy.attempt_number(), 0);
    }

    #[test]
    fn test_zero_attempts_never_retries() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(10), 0.0, 0);
        assert_eq!(policy.next_delay(), None);
        assert!(!policy.can_retry());
    }
}
