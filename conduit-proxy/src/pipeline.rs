//! Ordered interceptor pipeline.

use crate::context::ProxyContext;
use crate::interceptor::{Interceptor, Next};
use crate::response::Response;
use crate::transport::Transport;
use serde_json::Value;
use std::sync::Arc;

/// Conventional registration orders for the standard interceptors.
///
/// Lower orders run first on the way in and last on the way out.
pub mod order {
    pub const AUTHORIZATION: i32 = -200;
    pub const TELEMETRY: i32 = -50;
    pub const CORRELATION: i32 = 0;
    pub const LOGGING: i32 = 100;
    pub const CACHING: i32 = 150;
    pub const RESILIENCE: i32 = 180;
    pub const RETRY: i32 = 200;
    pub const AUDITING: i32 = 300;
}

struct Entry {
    order: i32,
    sequence: usize,
    interceptor: Arc<dyn Interceptor>,
}

/// Builder for a [`Pipeline`].
pub struct PipelineBuilder {
    transport: Arc<dyn Transport>,
    entries: Vec<Entry>,
}

impl PipelineBuilder {
    /// Start a pipeline terminating at `transport`.
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            entries: Vec::new(),
        }
    }

    /// Register an interceptor at `order`.
    ///
    /// Interceptors registered at the same order run in registration order.
    pub fn register<I: Interceptor + 'static>(self, order: i32, interceptor: I) -> Self {
        self.register_arc(order, Arc::new(interceptor))
    }

    pub fn register_arc(mut self, order: i32, interceptor: Arc<dyn Interceptor>) -> Self {
        let sequence = self.entries.len();
        self.entries.push(Entry {
            order,
            sequence,
            interceptor,
        });
        self
    }

    /// Sort the chain and freeze it.
    pub fn build(mut self) -> Pipeline {
        self.entries.sort_by_key(|e| (e.order, e.sequence));

        for entry in &self.entries {
            tracing::debug!(
                interceptor = entry.interceptor.name(),
                order = entry.order,
                "Registered interceptor"
            );
        }

        let orders = self.entries.iter().map(|e| e.order).collect();
        let interceptors = self.entries.into_iter().map(|e| e.interceptor).collect();

        Pipeline {
            interceptors,
            orders,
            transport: self.transport,
        }
    }
}

/// Immutable, sorted chain of interceptors ending at a transport.
///
/// Cloning is cheap and clones share interceptor state (breakers, caches).
#[derive(Clone)]
pub struct Pipeline {
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    orders: Arc<[i32]>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    pub fn builder<T: Transport + 'static>(transport: T) -> PipelineBuilder {
        PipelineBuilder::new(transport)
    }

    /// Run a call through the chain.
    ///
    /// The pipeline adds no error handling of its own; failures travel as
    /// typed [`Response`] failures.
    pub async fn send(&self, ctx: &mut ProxyContext) -> Response<Value> {
        Next::new(&self.interceptors, self.transport.as_ref())
            .run(ctx)
            .await
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Interceptor names in execution order.
    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Registration orders in execution order.
    pub fn orders(&self) -> &[i32] {
        &self.orders
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("interceptors", &self.interceptor_names())
            .field("orders", &self.orders)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FnTransport;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Interceptor for Noop {
        async fn invoke(&self, ctx: &mut ProxyContext, next: Next<'_>) -> Response<Value> {
            next.run(ctx).await
        }
    }

    fn transport() -> impl Transport {
        FnTransport::new(|_: &ProxyContext| std::future::ready(Response::success(Value::Null)))
    }

    #[test]
    fn test_build_sorts_by_order() {
        let pipeline = PipelineBuilder::new(transport())
            .register(300, Noop)
            .register(-50, Noop)
            .register(0, Noop)
            .build();

        assert_eq!(pipeline.orders(), &[-50, 0, 300]);
        assert_eq!(pipeline.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_pipeline_calls_transport() {
        let pipeline = PipelineBuilder::new(transport()).build();
        let mut ctx = ProxyContext::new(Value::Null, "A", "B");

        assert!(pipeline.is_empty());
        assert!(pipeline.send(&mut ctx).await.is_success());
    }
}
