//! Retry policy for transient (429/503) failures.
//!
//! Only idempotent requests (GET, HEAD) are retried. The delay before attempt
//! `n + 1` is
//!
//! ```text
//! min(max_delay, base_delay * 2^(n-1)) * uniform(1 - jitter, 1 + jitter)
//! ```
//!
//! raised to the server's `Retry-After` hint when that is larger.
//!
//! ## Configuration
//!
//! Each field resolves independently: [`RetryOverrides`] > `ASC_MAX_ATTEMPTS` /
//! `ASC_BASE_DELAY` / `ASC_MAX_DELAY` > config file > [`RetryPolicy::default`].

mod coordinator;

pub(crate) use coordinator::retry_transient;

use std::time::Duration;

use rand::Rng;

use crate::config::{self, FileConfig};

/// Default maximum number of attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default first backoff delay.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
/// Default backoff ceiling.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
/// Default jitter fraction.
pub const DEFAULT_JITTER_FRACTION: f64 = 0.1;

/// Resolved retry behaviour for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first (at least 1)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for the computed (pre-jitter) delay
    pub max_delay: Duration,
    /// Random spread applied to each delay, between 0.0 and 1.0
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter_fraction: DEFAULT_JITTER_FRACTION,
        }
    }
}

/// Programmatic overrides; these take precedence over every other source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryOverrides {
    /// Maximum number of attempts, including the first
    pub max_attempts: Option<u32>,
    /// Delay before the first retry
    pub base_delay: Option<Duration>,
    /// Upper bound for the computed delay
    pub max_delay: Option<Duration>,
    /// Random spread applied to each delay
    pub jitter_fraction: Option<f64>,
}

impl RetryOverrides {
    /// Overrides that pin every field of `policy`.
    pub fn from_policy(policy: &RetryPolicy) -> Self {
        Self {
            max_attempts: Some(policy.max_attempts),
            base_delay: Some(policy.base_delay),
            max_delay: Some(policy.max_delay),
            jitter_fraction: Some(policy.jitter_fraction),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Resolve the policy from overrides, the environment and the config file.
    pub fn resolve(overrides: &RetryOverrides, file: Option<&FileConfig>) -> Self {
        Self::resolve_with(overrides, |name| std::env::var(name).ok(), file)
    }

    pub(crate) fn resolve_with<F>(
        overrides: &RetryOverrides,
        env: F,
        file: Option<&FileConfig>,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_attempts = overrides
            .max_attempts
            .or_else(|| env(config::ENV_MAX_ATTEMPTS).and_then(|v| parse_attempts(&v)))
            .or_else(|| file.and_then(|f| f.max_attempts))
            .unwrap_or(DEFAULT_MAX_ATTEMPTS)
            .max(1);

        let base_delay = overrides
            .base_delay
            .or_else(|| env(config::ENV_BASE_DELAY).and_then(|v| config::parse_duration(&v)))
            .or_else(|| {
                file.and_then(|f| f.base_delay.as_deref())
                    .and_then(config::parse_duration)
            })
            .unwrap_or(DEFAULT_BASE_DELAY);

        let max_delay = overrides
            .max_delay
            .or_else(|| env(config::ENV_MAX_DELAY).and_then(|v| config::parse_duration(&v)))
            .or_else(|| {
                file.and_then(|f| f.max_delay.as_deref())
                    .and_then(config::parse_duration)
            })
            .unwrap_or(DEFAULT_MAX_DELAY);

        let jitter_fraction = overrides
            .jitter_fraction
            .unwrap_or(DEFAULT_JITTER_FRACTION)
            .clamp(0.0, 1.0);

        Self {
            max_attempts,
            base_delay,
            max_delay,
            jitter_fraction,
        }
    }

    /// Un-jittered delay after failed attempt number `attempt` (1-based).
    pub fn exponential_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Jittered delay after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let delay = self.exponential_delay(attempt);
        if self.jitter_fraction <= 0.0 || delay.is_zero() {
            return delay;
        }
        let factor = rand::thread_rng()
            .gen_range((1.0 - self.jitter_fraction)..=(1.0 + self.jitter_fraction));
        Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(delay)
    }
}

fn parse_attempts(value: &str) -> Option<u32> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            tracing::warn!(value, "Ignoring invalid {}", config::ENV_MAX_ATTEMPTS);
            None
        }
    }
}
