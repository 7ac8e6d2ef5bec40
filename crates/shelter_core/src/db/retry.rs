//! Bounded retry with exponential backoff.

use log::warn;
use std::fmt::Display;
use std::thread;
use std::time::Duration;

const DEFAULT_BACKOFF_CAP_FACTOR: u32 = 32;

/// Caller-configured retry policy. The default performs a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Values below 1 act as 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff.
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Doubles the delay after each failed attempt, capped at 32x `initial_backoff`.
    pub fn exponential(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff: initial_backoff.saturating_mul(DEFAULT_BACKOFF_CAP_FACTOR),
        }
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2_u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Runs `op` until it succeeds, attempts run out, or an error is not
    /// transient according to `is_transient`.
    pub fn run_while<T, E, F, P>(&self, event: &str, mut op: F, is_transient: P) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts && is_transient(&err) => {
                    let delay = self.backoff_for(attempt);
                    warn!(
                        "event={} module=retry status=retry attempt={} max_attempts={} backoff_ms={} error={}",
                        event,
                        attempt,
                        max_attempts,
                        delay.as_millis(),
                        err
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RetryPolicy;
    use std::time::Duration;

    #[test]
    fn default_policy_makes_one_attempt() {
        let mut calls = 0;
        let result: Result<(), String> = RetryPolicy::default().run_while(
            "test",
            || {
                calls += 1;
                Err("down".to_string())
            },
            |_| true,
        );
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::exponential(5, Duration::from_millis(10))
            .with_max_backoff(Duration::from_millis(30));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(10));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(20));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(30));
        assert_eq!(policy.backoff_for(40), Duration::from_millis(30));
    }

    #[test]
    fn retries_transient_errors_until_success() {
        let mut calls = 0;
        let result = RetryPolicy::exponential(3, Duration::ZERO).run_while(
            "test",
            || {
                calls += 1;
                if calls < 3 {
                    Err("flaky")
                } else {
                    Ok(calls)
                }
            },
            |_| true,
        );
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn stops_on_permanent_error() {
        let mut calls = 0;
        let result: Result<(), &str> = RetryPolicy::exponential(5, Duration::ZERO).run_while(
            "test",
            || {
                calls += 1;
                Err("denied")
            },
            |err| *err != "denied",
        );
        assert_eq!(result, Err("denied"));
        assert_eq!(calls, 1);
    }
}
