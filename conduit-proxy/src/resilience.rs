//! Timeout and circuit breaking per route.

use crate::circuit_breaker::{BreakerStats, CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::context::{ProxyContext, items};
use crate::error::ProxyError;
use crate::interceptor::{Interceptor, Next};
use crate::response::Response;
use async_trait::async_trait;
use conduit_config::ProxyOptions;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Timeout and breaker settings for one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    pub timeout: Duration,
    pub breaker: CircuitBreakerConfig,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Default policy plus per-route overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResilienceConfig {
    pub default: RoutePolicy,
    pub routes: HashMap<String, RoutePolicy>,
}

impl ResilienceConfig {
    pub fn new(default: RoutePolicy) -> Self {
        Self {
            default,
            routes: HashMap::new(),
        }
    }

    pub fn with_route(mut self, route: impl Into<String>, policy: RoutePolicy) -> Self {
        self.routes.insert(route.into(), policy);
        self
    }

    /// Build from loaded options, resolving each configured route's overrides.
    pub fn from_options(options: &ProxyOptions) -> Self {
        let default = RoutePolicy {
            timeout: options.timeout(),
            breaker: CircuitBreakerConfig::new(
                options.breaker_failure_threshold,
                options.breaker_open_duration(),
            ),
        };

        let routes = options
            .routes
            .keys()
            .map(|route| {
                let policy = RoutePolicy {
                    timeout: options.timeout_for(route),
                    breaker: CircuitBreakerConfig::new(
                        options.failure_threshold_for(route),
                        options.open_duration_for(route),
                    ),
                };
                (route.clone(), policy)
            })
            .collect();

        Self { default, routes }
    }

    pub fn policy_for(&self, route: &str) -> &RoutePolicy {
        self.routes.get(route).unwrap_or(&self.default)
    }
}

/// Guards each route with a timeout and a circuit breaker.
///
/// Breakers are created lazily per route key and live for the lifetime of
/// the interceptor. Each breaker is locked independently; there is no lock
/// spanning routes.
pub struct ResilienceInterceptor {
    config: ResilienceConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl ResilienceInterceptor {
    pub fn new(config: ResilienceConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    pub fn from_options(options: &ProxyOptions) -> Self {
        Self::new(ResilienceConfig::from_options(options))
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// Breaker for a route, created on first use.
    pub fn breaker(&self, route: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(route) {
            return existing.value().clone();
        }
        self.breakers
            .entry(route.to_string())
            .or_insert_with(|| {
                let policy = self.config.policy_for(route);
                Arc::new(CircuitBreaker::new(route, policy.breaker.clone()))
            })
            .value()
            .clone()
    }

    /// Statistics for a route that has seen traffic.
    pub fn breaker_stats(&self, route: &str) -> Option<BreakerStats> {
        self.breakers.get(route).map(|b| b.stats())
    }

    /// State of a route; routes without traffic are closed.
    pub fn circuit_state(&self, route: &str) -> CircuitState {
        self.breakers
            .get(route)
            .map(|b| b.state())
            .unwrap_or(CircuitState::Closed)
    }

    /// Routes that currently have a breaker.
    pub fn routes(&self) -> Vec<String> {
        self.breakers.iter().map(|e| e.key().clone()).collect()
    }
}

#[async_trait]
impl Interceptor for ResilienceInterceptor {
    async fn invoke(&self, ctx: &mut ProxyContext, next: Next<'_>) -> Response<Value> {
        let route = ctx.route_key();
        let breaker = self.breaker(&route);

        if ctx.is_cancelled() {
            return Response::failure(ProxyError::Cancelled);
        }

        let permit = match breaker.acquire() {
            Ok(permit) => permit,
            Err(err) => {
                tracing::debug!(route = %route, "Call rejected by open circuit");
                ctx.insert_item(items::CIRCUIT_STATE, breaker.state().as_str());
                return Response::failure(err);
            }
        };

        let timeout = self.config.policy_for(&route).timeout;
        let token = ctx.cancellation().clone();

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => Response::failure(ProxyError::Cancelled),
            result = tokio::time::timeout(timeout, next.run(ctx)) => match result {
                Ok(response) => response,
                Err(_) => {
                    tracing::warn!(
                        route = %route,
                        timeout_ms = timeout.as_millis() as u64,
                        "Call timed out"
                    );
                    Response::failure(ProxyError::Timeout(timeout))
                }
            },
        };

        permit.complete(response.error_kind());
        ctx.insert_item(items::CIRCUIT_STATE, breaker.state().as_str());

        response
    }

    fn name(&self) -> &'static str {
        "resilience"
    }
}
