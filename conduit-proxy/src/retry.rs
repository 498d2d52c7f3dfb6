//! Retry with exponential backoff.

use crate::context::{ProxyContext, items};
use crate::error::{ErrorKind, ProxyError};
use crate::interceptor::{Interceptor, Next};
use crate::response::Response;
use async_trait::async_trait;
use conduit_config::ProxyOptions;
use rand::Rng;
use serde_json::Value;
use std::time::Duration;

/// Upper bound on any single backoff delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each later retry.
    pub base_delay: Duration,
    /// Maximum delay before jitter.
    pub max_delay: Duration,
    /// Jitter fraction; `0.25` spreads each delay uniformly over ±25%.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: MAX_RETRY_DELAY,
            jitter: 0.25,
        }
    }
}

impl RetryConfig {
    /// Create a retry config with exponential backoff.
    pub fn exponential(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Default::default()
        }
    }

    pub fn from_options(options: &ProxyOptions) -> Self {
        Self::exponential(options.max_retries, options.retry_base_delay())
    }

    /// Disable jitter, making delays exact.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }

    /// Delay before retry number `attempt` (1-based), before jitter.
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Delay before retry number `attempt` (1-based), with jitter applied
    /// and capped at [`MAX_RETRY_DELAY`].
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay_for(attempt);
        let jitter = self.jitter.clamp(0.0, 1.0);

        let delay = if jitter > 0.0 {
            let factor = rand::rng().random_range((1.0 - jitter)..=(1.0 + jitter));
            base.mul_f64(factor)
        } else {
            base
        };

        delay.min(MAX_RETRY_DELAY)
    }
}

/// Retries transient failures with exponential backoff and jitter.
///
/// Business, non-transient and cancelled failures return immediately. The
/// attempt being made is kept in `items["retry.attempt"]`, and the total is
/// written to `items["retry.attempts"]` on every exit.
#[derive(Debug, Clone, Default)]
pub struct RetryInterceptor {
    config: RetryConfig,
}

impl RetryInterceptor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl Interceptor for RetryInterceptor {
    async fn invoke(&self, ctx: &mut ProxyContext, next: Next<'_>) -> Response<Value> {
        let mut attempt: u32 = 1;

        let response = loop {
            ctx.insert_item(items::RETRY_ATTEMPT, attempt);
            let response = next.run(ctx).await;

            let Some(kind) = response.error_kind() else {
                break response;
            };
            if kind != ErrorKind::Transient {
                break response;
            }

            if attempt > self.config.max_retries {
                tracing::warn!(
                    route = %ctx.route_key(),
                    attempts = attempt,
                    error = %response.error().map(ToString::to_string).unwrap_or_default(),
                    "Retries exhausted"
                );
                break response;
            }

            let delay = self.config.delay_for(attempt);
            tracing::debug!(
                route = %ctx.route_key(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying after transient failure"
            );

            let token = ctx.cancellation().clone();
            let cancelled = tokio::select! {
                biased;
                _ = token.cancelled() => true,
                _ = tokio::time::sleep(delay) => false,
            };
            if cancelled {
                break Response::failure(ProxyError::Cancelled);
            }

            attempt += 1;
        };

        ctx.insert_item(items::RETRY_ATTEMPTS, attempt);
        response
    }

    fn name(&self) -> &'static str {
        "retry"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_delays_double() {
        let config = RetryConfig::exponential(5, Duration::from_millis(100));
        assert_eq!(config.base_delay_for(1), Duration::from_millis(100));
        assert_eq!(config.base_delay_for(2), Duration::from_millis(200));
        assert_eq!(config.base_delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig::exponential(50, Duration::from_secs(1));
        assert_eq!(config.base_delay_for(40), MAX_RETRY_DELAY);
        for _ in 0..20 {
            assert!(config.delay_for(40) <= MAX_RETRY_DELAY);
        }
    }

    #[test]
    fn test_jitter_bounds() {
        let config = RetryConfig::exponential(3, Duration::from_millis(100));
        for _ in 0..200 {
            let d = config.delay_for(2);
            assert!(d >= Duration::from_millis(150), "{d:?}");
            assert!(d <= Duration::from_millis(250), "{d:?}");
        }
    }

    #[test]
    fn test_without_jitter_is_exact() {
        let config = RetryConfig::default().without_jitter();
        assert_eq!(config.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_from_options() {
        let options = ProxyOptions {
            max_retries: 7,
            retry_base_delay_ms: 50,
            ..Default::default()
        };
        let config = RetryConfig::from_options(&options);
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.base_delay, Duration::from_millis(50));
    }
}
