//! Call logging.

use crate::context::ProxyContext;
use crate::error::ErrorKind;
use crate::interceptor::{Interceptor, Next};
use crate::response::Response;
use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

/// Logs each call on entry and exit.
///
/// Successes and business rejections log at `debug`; other failures at
/// `warn`. Request payloads are only logged when enabled, at `trace`.
#[derive(Debug, Clone, Default)]
pub struct LoggingInterceptor {
    log_payloads: bool,
}

impl LoggingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log request payloads at `trace` level.
    pub fn with_payloads(mut self) -> Self {
        self.log_payloads = true;
        self
    }
}

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn invoke(&self, ctx: &mut ProxyContext, next: Next<'_>) -> Response<Value> {
        let route = ctx.route_key();
        let correlation_id = ctx.correlation_id().unwrap_or_default().to_string();

        tracing::debug!(
            route = %route,
            correlation_id = %correlation_id,
            "Sending proxy request"
        );
        if self.log_payloads {
            tracing::trace!(route = %route, request = %ctx.request(), "Request payload");
        }

        let start = Instant::now();
        let response = next.run(ctx).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match response.error() {
            None => tracing::debug!(
                route = %route,
                correlation_id = %correlation_id,
                elapsed_ms,
                cache_hit = ctx.cache_hit(),
                "Proxy request succeeded"
            ),
            Some(err) if err.kind() == ErrorKind::Business => tracing::debug!(
                route = %route,
                correlation_id = %correlation_id,
                elapsed_ms,
                error = %err,
                "Proxy request rejected by business rule"
            ),
            Some(err) => tracing::warn!(
                route = %route,
                correlation_id = %correlation_id,
                elapsed_ms,
                error_kind = %err.kind(),
                error = %err,
                "Proxy request failed"
            ),
        }

        response
    }

    fn name(&self) -> &'static str {
        "logging"
    }
}
