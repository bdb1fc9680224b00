//! Startup retry policy
//!
//! The gateway is not ready until the database accepts a connection.
//! With no attempt bound the loop blocks until success; per-request
//! failures never go through here.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::observability::Logger;

/// Delay/backoff/attempt bound for connection establishment
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the second attempt
    pub delay: Duration,
    /// Multiplier applied to the delay after each failure (1.0 = fixed)
    pub backoff: f64,
    /// Upper bound for the delay
    pub max_delay: Duration,
    /// `None` retries forever
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            backoff: 1.0,
            max_delay: Duration::from_secs(60),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Fixed delay, unbounded attempts
    pub fn forever(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    /// Bound the number of attempts
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Multiply the delay by `factor` after each failure, capped at `max_delay`
    pub fn with_backoff(mut self, factor: f64, max_delay: Duration) -> Self {
        self.backoff = factor;
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff.max(1.0).powi(attempt.saturating_sub(1) as i32);
        let cap = self.max_delay.max(self.delay).as_secs_f64();
        Duration::from_secs_f64((self.delay.as_secs_f64() * factor).min(cap))
    }

    fn exhausted(&self, attempt: u32) -> bool {
        matches!(self.max_attempts, Some(max) if attempt >= max)
    }
}

/// Sleep abstraction so the retry loop can run without real delays
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `attempt` until it succeeds or the policy gives up
///
/// The closure receives the 1-based attempt number. The last error is
/// returned once `max_attempts` is exhausted.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut attempt: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut n = 1;
    loop {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let attempt_str = n.to_string();
                let error_str = e.to_string();
                Logger::warn(
                    "DB_CONNECT_FAILED",
                    &[("attempt", &attempt_str), ("error", &error_str)],
                );
                if policy.exhausted(n) {
                    return Err(e);
                }
                sleeper.sleep(policy.delay_after(n)).await;
                n += 1;
            }
        }
    }
}
