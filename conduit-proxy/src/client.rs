//! Typed client over the pipeline.

use crate::auditing::AuditingInterceptor;
use crate::authorization::{AuthorizationInterceptor, Authorizer};
use crate::caching::{CacheKeyProvider, CachePolicy, CachingInterceptor, ConfiguredCachePolicy};
use crate::circuit_breaker::{BreakerStats, CircuitState};
use crate::context::ProxyContext;
use crate::correlation::CorrelationInterceptor;
use crate::error::ProxyError;
use crate::interceptor::Interceptor;
use crate::logging::LoggingInterceptor;
use crate::pipeline::{Pipeline, PipelineBuilder, order};
use crate::resilience::ResilienceInterceptor;
use crate::response::Response;
use crate::retry::{RetryConfig, RetryInterceptor};
use crate::telemetry::{CallMetrics, MetricsCallbackFn, TelemetryInterceptor};
use crate::transport::Transport;
use conduit_audit::AuditSink;
use conduit_cache::CacheStore;
use conduit_config::ProxyOptions;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Operation name; selects the route and the HTTP path.
    pub operation: Option<String>,
    /// Correlation ID to propagate instead of a generated one.
    pub correlation_id: Option<String>,
    /// Token the caller can use to cancel the call.
    pub cancellation: Option<CancellationToken>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Entry point for proxied calls.
///
/// ```no_run
/// use conduit_proxy::{CallOptions, HttpTransport, ProxyClient};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct GetUser { id: u64 }
///
/// #[derive(Deserialize)]
/// struct User { name: String }
///
/// # async fn run() -> Result<(), conduit_proxy::ProxyError> {
/// let client = ProxyClient::builder(HttpTransport::new("http://users.internal/api")?).build();
///
/// let response = client
///     .send_with::<_, User>(&GetUser { id: 7 }, CallOptions::new().operation("users/get"))
///     .await;
/// println!("{}", response.into_result()?.name);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ProxyClient {
    pipeline: Pipeline,
    resilience: Option<Arc<ResilienceInterceptor>>,
}

impl ProxyClient {
    /// Client over a custom pipeline.
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            resilience: None,
        }
    }

    /// Builder that registers the standard interceptor stack.
    pub fn builder<T: Transport + 'static>(transport: T) -> ProxyClientBuilder {
        ProxyClientBuilder::new(Arc::new(transport))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Send a request and decode the result.
    pub async fn send<Req, Res>(&self, request: &Req) -> Response<Res>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        self.send_with(request, CallOptions::default()).await
    }

    /// Send a request with per-call options.
    pub async fn send_with<Req, Res>(&self, request: &Req, options: CallOptions) -> Response<Res>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let start = Instant::now();

        let payload = match serde_json::to_value(request) {
            Ok(payload) => payload,
            Err(e) => {
                return Response::failure(ProxyError::Serialization(e.to_string()))
                    .with_duration(start.elapsed());
            }
        };

        let mut ctx = ProxyContext::for_types::<Req, Res>(payload);
        if let Some(operation) = options.operation {
            ctx = ctx.with_operation(operation);
        }
        if let Some(id) = options.correlation_id {
            ctx = ctx.with_correlation_id(id);
        }
        if let Some(token) = options.cancellation {
            ctx = ctx.with_cancellation(token);
        }

        self.send_context(&mut ctx).await
    }

    /// Send a prepared context and decode the result.
    ///
    /// The context is left in place so callers can inspect its items after
    /// the call.
    pub async fn send_context<Res>(&self, ctx: &mut ProxyContext) -> Response<Res>
    where
        Res: DeserializeOwned,
    {
        let start = Instant::now();
        let response = self.pipeline.send(ctx).await;
        let correlation_id = response
            .correlation_id()
            .or(ctx.correlation_id())
            .map(str::to_string);

        let decoded = response.and_then(|value| {
            serde_json::from_value::<Res>(value)
                .map_err(|e| ProxyError::Serialization(e.to_string()))
        });
        let decoded = decoded.with_duration(start.elapsed());

        match correlation_id {
            Some(id) => decoded.with_correlation_id(id),
            None => decoded,
        }
    }

    /// Breaker statistics for a route; `None` without a resilience layer or
    /// before the route has seen traffic.
    pub fn breaker_stats(&self, route: &str) -> Option<BreakerStats> {
        self.resilience.as_ref()?.breaker_stats(route)
    }

    pub fn circuit_state(&self, route: &str) -> CircuitState {
        self.resilience
            .as_ref()
            .map(|r| r.circuit_state(route))
            .unwrap_or(CircuitState::Closed)
    }
}

impl std::fmt::Debug for ProxyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyClient")
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

/// Builder for [`ProxyClient`] with the standard stack.
///
/// Always registers telemetry, correlation, logging and resilience. Retry
/// is registered when `max_retries > 0`, caching when a cache is set,
/// auditing when at least one sink is set, and authorization when an
/// authorizer is set. Each goes at its conventional [`order`].
pub struct ProxyClientBuilder {
    transport: Arc<dyn Transport>,
    options: ProxyOptions,
    cache: Option<Arc<dyn CacheStore>>,
    cache_policy: Option<Arc<dyn CachePolicy>>,
    cache_keys: Option<Arc<dyn CacheKeyProvider>>,
    audit_sinks: Vec<Arc<dyn AuditSink>>,
    authorizer: Option<Arc<dyn Authorizer>>,
    on_metrics: Option<MetricsCallbackFn>,
    extra: Vec<(i32, Arc<dyn Interceptor>)>,
}

impl ProxyClientBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            options: ProxyOptions::default(),
            cache: None,
            cache_policy: None,
            cache_keys: None,
            audit_sinks: Vec::new(),
            authorizer: None,
            on_metrics: None,
            extra: Vec::new(),
        }
    }

    pub fn options(mut self, options: ProxyOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable result caching backed by `store`.
    pub fn cache(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(store);
        self
    }

    /// Override the cache policy (default: routes marked cacheable in options).
    pub fn cache_policy(mut self, policy: Arc<dyn CachePolicy>) -> Self {
        self.cache_policy = Some(policy);
        self
    }

    pub fn cache_key_provider(mut self, keys: Arc<dyn CacheKeyProvider>) -> Self {
        self.cache_keys = Some(keys);
        self
    }

    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sinks.push(sink);
        self
    }

    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    /// Callback receiving a [`CallMetrics`] record after every call.
    pub fn on_metrics<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CallMetrics) + Send + Sync + 'static,
    {
        self.on_metrics = Some(Arc::new(callback));
        self
    }

    /// Register an additional interceptor at `order`.
    pub fn interceptor<I: Interceptor + 'static>(mut self, order: i32, interceptor: I) -> Self {
        self.extra.push((order, Arc::new(interceptor)));
        self
    }

    pub fn build(self) -> ProxyClient {
        let options = Arc::new(self.options);
        let mut builder = PipelineBuilder::from_arc(self.transport);

        if let Some(authorizer) = self.authorizer {
            builder = builder.register(
                order::AUTHORIZATION,
                AuthorizationInterceptor::from_arc(authorizer),
            );
        }

        let telemetry = match self.on_metrics {
            Some(callback) => TelemetryInterceptor::with_callback_arc(callback),
            None => TelemetryInterceptor::new(),
        };
        builder = builder
            .register(order::TELEMETRY, telemetry)
            .register(order::CORRELATION, CorrelationInterceptor::new())
            .register(order::LOGGING, LoggingInterceptor::new());

        if let Some(store) = self.cache {
            let policy = self
                .cache_policy
                .unwrap_or_else(|| Arc::new(ConfiguredCachePolicy::new(options.clone())));
            let mut caching = CachingInterceptor::new(store, policy);
            if let Some(keys) = self.cache_keys {
                caching = caching.with_key_provider(keys);
            }
            builder = builder.register(order::CACHING, caching);
        }

        let resilience = Arc::new(ResilienceInterceptor::from_options(&options));
        builder = builder.register_arc(order::RESILIENCE, resilience.clone());

        if options.max_retries > 0 {
            builder = builder.register(
                order::RETRY,
                RetryInterceptor::new(RetryConfig::from_options(&options)),
            );
        }

        if !self.audit_sinks.is_empty() {
            builder = builder.register(order::AUDITING, AuditingInterceptor::new(self.audit_sinks));
        }

        for (position, interceptor) in self.extra {
            builder = builder.register_arc(position, interceptor);
        }

        ProxyClient {
            pipeline: builder.build(),
            resilience: Some(resilience),
        }
    }
}
