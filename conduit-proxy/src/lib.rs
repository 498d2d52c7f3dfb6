//! Ordered interceptor pipeline for outbound proxy calls.
//!
//! A call travels from [`ProxyClient`] through an ordered chain of
//! [`Interceptor`]s to a [`Transport`], the only component doing I/O. Any
//! interceptor may short-circuit (cache hit, open circuit, denial) or
//! delegate and post-process the [`Response`] on the way back.
//!
//! ## Features
//!
//! - **Ordered pipeline**: stable sort by registration order, lowest first
//! - **Retry**: exponential backoff with jitter, transient failures only
//! - **Circuit breaker**: per route, with a single half-open probe
//! - **Timeouts**: per route, raced against cancellation
//! - **Caching**: read-through, successes only, deterministic keys
//! - **Correlation, logging, telemetry, auditing, authorization**
//! - **HTTP transport** over `reqwest` (feature `http`, on by default)
//!
//! ## Standard order
//!
//! | interceptor   | order |
//! |---------------|-------|
//! | authorization | -200  |
//! | telemetry     | -50   |
//! | correlation   | 0     |
//! | logging       | 100   |
//! | caching       | 150   |
//! | resilience    | 180   |
//! | retry         | 200   |
//! | auditing      | 300   |
//!
//! ## Example
//!
//! ```
//! use conduit_proxy::{FnTransport, ProxyClient, ProxyContext, Response};
//! use conduit_config::ProxyOptions;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let transport = FnTransport::new(|ctx: &ProxyContext| {
//!     let n = ctx.request().as_u64().unwrap_or(0);
//!     async move { Response::success(serde_json::json!(n * 2)) }
//! });
//!
//! let client = ProxyClient::builder(transport)
//!     .options(ProxyOptions::default())
//!     .build();
//!
//! let response = client.send::<u64, u64>(&21).await;
//! assert_eq!(response.value(), Some(&42));
//! assert!(response.correlation_id().is_some());
//! # }
//! ```

pub mod auditing;
pub mod authorization;
pub mod caching;
pub mod circuit_breaker;
pub mod classify;
pub mod client;
pub mod context;
pub mod correlation;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod interceptor;
pub mod logging;
pub mod pipeline;
pub mod resilience;
pub mod response;
pub mod retry;
pub mod telemetry;
pub mod transport;

pub use auditing::AuditingInterceptor;
pub use authorization::{AuthorizationInterceptor, Authorizer};
pub use caching::{
    CacheAllPolicy, CacheKeyProvider, CachePolicy, CachingInterceptor, ConfiguredCachePolicy,
    DefaultKeyProvider,
};
pub use circuit_breaker::{
    Admission, BreakerPermit, BreakerStats, CircuitBreaker, CircuitBreakerConfig, CircuitState,
};
pub use classify::{DefaultClassifier, ErrorClassifier, classify_status};
pub use client::{CallOptions, ProxyClient, ProxyClientBuilder};
pub use context::{ProxyContext, items};
pub use correlation::CorrelationInterceptor;
pub use error::{BusinessError, ErrorKind, ProxyError, Result};
#[cfg(feature = "http")]
pub use http::{CORRELATION_HEADER, HttpTransport};
pub use interceptor::{Interceptor, Next};
pub use logging::LoggingInterceptor;
pub use pipeline::{Pipeline, PipelineBuilder, order};
pub use resilience::{ResilienceConfig, ResilienceInterceptor, RoutePolicy};
pub use response::Response;
pub use retry::{MAX_RETRY_DELAY, RetryConfig, RetryInterceptor};
pub use telemetry::{CallMetrics, MetricsCallbackFn, TelemetryInterceptor};
pub use transport::{FnTransport, Transport};

// Re-exported so implementors don't need a direct dependency.
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
