//! Proxy options and per-route overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Options consumed by the proxy pipeline.
///
/// Durations are stored as integer milliseconds (seconds for cache TTLs) so
/// the same struct round-trips through TOML, JSON and environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyOptions {
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Base delay for exponential backoff, in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Per-call timeout enforced by the resilience layer, in milliseconds.
    pub timeout_ms: u64,
    /// Consecutive counted failures that open a route's circuit.
    pub breaker_failure_threshold: u32,
    /// How long an open circuit rejects calls, in milliseconds.
    pub breaker_open_duration_ms: u64,
    /// Default TTL for cached results, in seconds.
    pub cache_ttl_secs: u64,
    /// Whether routes without an explicit `cacheable` flag are cached.
    pub cache_by_default: bool,
    /// Per-route overrides keyed by route name.
    pub routes: HashMap<String, RouteOptions>,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_ms: 100,
            timeout_ms: 30_000,
            breaker_failure_threshold: 5,
            breaker_open_duration_ms: 30_000,
            cache_ttl_secs: 300,
            cache_by_default: false,
            routes: HashMap::new(),
        }
    }
}

/// Overrides for a single route. Unset fields fall back to [`ProxyOptions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    pub timeout_ms: Option<u64>,
    pub breaker_failure_threshold: Option<u32>,
    pub breaker_open_duration_ms: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
    pub cacheable: Option<bool>,
}

impl ProxyOptions {
    /// Base delay for retry backoff.
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Default call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Default open-circuit duration.
    pub fn breaker_open_duration(&self) -> Duration {
        Duration::from_millis(self.breaker_open_duration_ms)
    }

    /// Default cache TTL.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Override block for a route, if one is configured.
    pub fn route(&self, route: &str) -> Option<&RouteOptions> {
        self.routes.get(route)
    }

    /// Add or replace a route override.
    pub fn with_route(mut self, route: impl Into<String>, options: RouteOptions) -> Self {
        self.routes.insert(route.into(), options);
        self
    }

    /// Effective timeout for a route.
    pub fn timeout_for(&self, route: &str) -> Duration {
        self.route(route)
            .and_then(|r| r.timeout_ms)
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.timeout())
    }

    /// Effective breaker threshold for a route.
    pub fn failure_threshold_for(&self, route: &str) -> u32 {
        self.route(route)
            .and_then(|r| r.breaker_failure_threshold)
            .unwrap_or(self.breaker_failure_threshold)
    }

    /// Effective open duration for a route.
    pub fn open_duration_for(&self, route: &str) -> Duration {
        self.route(route)
            .and_then(|r| r.breaker_open_duration_ms)
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.breaker_open_duration())
    }

    /// Effective cache TTL for a route.
    pub fn cache_ttl_for(&self, route: &str) -> Duration {
        self.route(route)
            .and_then(|r| r.cache_ttl_secs)
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.cache_ttl())
    }

    /// Whether results for a route may be cached.
    pub fn is_cacheable(&self, route: &str) -> bool {
        self.route(route)
            .and_then(|r| r.cacheable)
            .unwrap_or(self.cache_by_default)
    }
}
