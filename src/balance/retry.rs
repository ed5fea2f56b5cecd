//! Exponential backoff with jitter around balance lookups.
//!
//! Free explorers throttle aggressively, so every lookup gets a bounded
//! number of attempts. Only transient failures are retried.

use std::thread;
use std::time::Duration;

use rand::Rng;

use super::{BalanceError, BalanceLookup};
use crate::crypto::Address;

/// Backoff strategy configuration
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    /// Multiplier applied after each retry
    pub multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: 0.2,
            max_attempts: 3,
        }
    }
}

impl BackoffConfig {
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set jitter factor (clamped to 0.0..=1.0)
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: 0.0,
            max_attempts: max_attempts.max(1),
        }
    }
}

/// Iterator over the delays between attempts.
///
/// Yields `max_attempts - 1` delays: one before each retry.
pub struct ExponentialBackoff {
    config: BackoffConfig,
    retries: u32,
    current_delay: Duration,
}

impl ExponentialBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            current_delay: config.initial_delay,
            config,
            retries: 0,
        }
    }

    fn delay_with_jitter(&self, base_delay: Duration) -> Duration {
        if self.config.jitter <= 0.0 || base_delay.is_zero() {
            return base_delay;
        }

        let jitter_range = base_delay.as_secs_f64() * self.config.jitter;
        let jitter = rand::thread_rng().gen_range(-jitter_range..jitter_range);
        Duration::from_secs_f64((base_delay.as_secs_f64() + jitter).max(0.0))
    }
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.retries + 1 >= self.config.max_attempts {
            return None;
        }

        let delay = self
            .delay_with_jitter(self.current_delay)
            .min(self.config.max_delay);

        self.retries += 1;
        self.current_delay = self
            .current_delay
            .mul_f64(self.config.multiplier)
            .min(self.config.max_delay);

        Some(delay)
    }
}

/// Decorates a lookup with the backoff policy.
pub struct RetryingLookup<L> {
    inner: L,
    config: BackoffConfig,
}

impl<L: BalanceLookup> RetryingLookup<L> {
    pub fn new(inner: L, config: BackoffConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<L: BalanceLookup> BalanceLookup for RetryingLookup<L> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn lookup_balance(&self, address: &Address) -> Result<f64, BalanceError> {
        let mut backoff = ExponentialBackoff::new(self.config.clone());
        let mut attempt = 1;

        loop {
            match self.inner.lookup_balance(address) {
                Ok(balance) => return Ok(balance),
                Err(e) if e.is_transient() => match backoff.next() {
                    Some(delay) => {
                        tracing::debug!(
                            provider = self.inner.name(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "lookup failed, retrying"
                        );
                        thread::sleep(delay);
                        attempt += 1;
                    }
                    None => {
                        tracing::warn!(
                            provider = self.inner.name(),
                            attempts = attempt,
                            error = %e,
                            "lookup retries exhausted"
                        );
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    fn error_hint(&self) -> &str {
        self.inner.error_hint()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::balance::testing::ScriptedLookup;

    fn address() -> Address {
        "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH".parse().unwrap()
    }

    #[test]
    fn test_backoff_growth_without_jitter() {
        let config = BackoffConfig::default()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(300))
            .with_jitter(0.0)
            .with_max_attempts(5);
        let delays: Vec<_> = ExponentialBackoff::new(config).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300),
                Duration::from_millis(300),
            ]
        );
    }

    #[test]
    fn test_single_attempt_never_waits() {
        assert_eq!(ExponentialBackoff::new(BackoffConfig::immediate(1)).count(), 0);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let config = BackoffConfig::default()
            .with_initial_delay(Duration::from_millis(100))
            .with_jitter(0.5)
            .with_max_attempts(2);
        let delay = ExponentialBackoff::new(config).next().unwrap();
        assert!(delay >= Duration::from_millis(50) && delay <= Duration::from_millis(150));
    }

    #[test]
    fn test_transient_errors_are_retried() {
        let inner = Arc::new(ScriptedLookup::scripted(
            vec![
                Err(BalanceError::Transport("connection reset".into())),
                Err(BalanceError::RateLimited),
            ],
            Ok(0.5),
        ));
        let lookup = RetryingLookup::new(inner.clone(), BackoffConfig::immediate(3));

        assert_eq!(lookup.lookup_balance(&address()), Ok(0.5));
        assert_eq!(inner.calls(), 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let inner = Arc::new(ScriptedLookup::always(Err(BalanceError::RateLimited)));
        let lookup = RetryingLookup::new(inner.clone(), BackoffConfig::immediate(4));

        assert_eq!(
            lookup.lookup_balance(&address()),
            Err(BalanceError::RateLimited)
        );
        assert_eq!(inner.calls(), 4);
    }

    #[test]
    fn test_permanent_errors_fail_fast() {
        let inner = Arc::new(ScriptedLookup::always(Err(BalanceError::Unauthorized(401))));
        let lookup = RetryingLookup::new(inner.clone(), BackoffConfig::immediate(5));

        assert!(lookup.lookup_balance(&address()).is_err());
        assert_eq!(inner.calls(), 1);
    }
}
