//! Interceptor contract.

use crate::context::ProxyContext;
use crate::response::Response;
use crate::transport::Transport;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A step in the pipeline.
///
/// An interceptor may inspect or modify the context, call `next` zero or
/// more times, and inspect or replace the response on the way back. Not
/// calling `next` short-circuits the rest of the chain, transport included.
///
/// Interceptors do not carry their own order; it is supplied when they are
/// registered with [`PipelineBuilder::register`](crate::PipelineBuilder::register).
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Handle the call and optionally delegate to the rest of the chain.
    async fn invoke(&self, ctx: &mut ProxyContext, next: Next<'_>) -> Response<Value>;

    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Continuation into the remainder of the chain.
///
/// `Next` is `Copy`, so an interceptor can run the remainder more than once.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Interceptor>], transport: &'a dyn Transport) -> Self {
        Self { chain, transport }
    }

    /// Run the remaining interceptors, then the transport.
    pub async fn run(self, ctx: &mut ProxyContext) -> Response<Value> {
        match self.chain.split_first() {
            Some((head, rest)) => head.invoke(ctx, Next::new(rest, self.transport)).await,
            None => self.transport.send(ctx).await,
        }
    }

    /// Interceptors left before the transport.
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.chain.len())
            .finish()
    }
}
