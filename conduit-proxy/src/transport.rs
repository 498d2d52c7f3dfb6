//! Transport abstraction.

use crate::context::ProxyContext;
use crate::error::ProxyError;
use crate::response::Response;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// The terminal step of the pipeline; the only component that does I/O.
///
/// Implementations classify raw failures into [`ProxyError`] before
/// returning and should observe `ctx.cancellation()`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, ctx: &mut ProxyContext) -> Response<Value>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, ctx: &mut ProxyContext) -> Response<Value> {
        (**self).send(ctx).await
    }
}

/// Transport backed by an async closure.
///
/// The closure sees the context by shared reference and returns an owned
/// future. The call is raced against the context's cancellation token.
///
/// ```
/// use conduit_proxy::{FnTransport, ProxyContext, Response};
///
/// let echo = FnTransport::new(|ctx: &ProxyContext| {
///     let request = ctx.request().clone();
///     async move { Response::success(request) }
/// });
/// # let _ = echo;
/// ```
pub struct FnTransport<F> {
    f: F,
}

impl<F, Fut> FnTransport<F>
where
    F: Fn(&ProxyContext) -> Fut + Send + Sync,
    Fut: Future<Output = Response<Value>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(&ProxyContext) -> Fut + Send + Sync,
    Fut: Future<Output = Response<Value>> + Send + 'static,
{
    async fn send(&self, ctx: &mut ProxyContext) -> Response<Value> {
        let token = ctx.cancellation().clone();
        let call = (self.f)(ctx);

        tokio::select! {
            biased;
            _ = token.cancelled() => Response::failure(ProxyError::Cancelled),
            response = call => response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fn_transport_echo() {
        let transport = FnTransport::new(|ctx: &ProxyContext| {
            let request = ctx.request().clone();
            async move { Response::success(request) }
        });

        let mut ctx = ProxyContext::new(json!({"a": 1}), "A", "B");
        let response = transport.send(&mut ctx).await;
        assert_eq!(response.value(), Some(&json!({"a": 1})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fn_transport_observes_cancellation() {
        let transport = FnTransport::new(|_: &ProxyContext| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Response::success(Value::Null)
        });

        let mut ctx = ProxyContext::new(Value::Null, "A", "B");
        let token = ctx.cancellation().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let response = transport.send(&mut ctx).await;
        assert_eq!(response.error(), Some(&ProxyError::Cancelled));
    }

    #[tokio::test]
    async fn test_arc_transport() {
        let transport: Arc<dyn Transport> = Arc::new(FnTransport::new(|_: &ProxyContext| async {
            Response::success(json!(1))
        }));
        let mut ctx = ProxyContext::new(Value::Null, "A", "B");
        assert!(transport.send(&mut ctx).await.is_success());
    }
}
