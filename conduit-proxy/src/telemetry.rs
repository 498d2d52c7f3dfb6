//! Call timing and tracing spans.

use crate::context::{ProxyContext, items};
use crate::error::ErrorKind;
use crate::interceptor::{Interceptor, Next};
use crate::response::Response;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

/// Timing record reported after every call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallMetrics {
    pub route: String,
    pub correlation_id: Option<String>,
    pub duration: Duration,
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
    pub cache_hit: bool,
    pub attempts: u32,
}

/// Type alias for the metrics callback.
pub type MetricsCallbackFn = Arc<dyn Fn(&CallMetrics) + Send + Sync>;

/// Runs the rest of the chain inside a `proxy.call` span and measures it.
///
/// Writes `items["telemetry.elapsed_ms"]` and hands a [`CallMetrics`] record
/// to the optional callback.
#[derive(Clone, Default)]
pub struct TelemetryInterceptor {
    on_complete: Option<MetricsCallbackFn>,
}

impl TelemetryInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a metrics callback.
    pub fn with_callback<F>(on_complete: F) -> Self
    where
        F: Fn(&CallMetrics) + Send + Sync + 'static,
    {
        Self {
            on_complete: Some(Arc::new(on_complete)),
        }
    }

    pub fn with_callback_arc(on_complete: MetricsCallbackFn) -> Self {
        Self {
            on_complete: Some(on_complete),
        }
    }
}

#[async_trait]
impl Interceptor for TelemetryInterceptor {
    async fn invoke(&self, ctx: &mut ProxyContext, next: Next<'_>) -> Response<Value> {
        let route = ctx.route_key();
        let span = tracing::info_span!(
            "proxy.call",
            route = %route,
            request_type = %ctx.request_type(),
            result_type = %ctx.result_type(),
        );

        let start = Instant::now();
        let response = next.run(ctx).instrument(span).await;
        let duration = start.elapsed();

        ctx.insert_item(items::ELAPSED_MS, duration.as_millis() as u64);

        if let Some(callback) = &self.on_complete {
            let metrics = CallMetrics {
                route,
                correlation_id: ctx.correlation_id().map(str::to_string),
                duration,
                success: response.is_success(),
                error_kind: response.error_kind(),
                cache_hit: ctx.cache_hit(),
                attempts: ctx.attempts(),
            };
            callback(&metrics);
        }

        response
    }

    fn name(&self) -> &'static str {
        "telemetry"
    }
}
