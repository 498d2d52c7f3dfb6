//! Authorization short-circuit.

use crate::context::ProxyContext;
use crate::error::ProxyError;
use crate::interceptor::{Interceptor, Next};
use crate::response::Response;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Decides whether a call may proceed. `Err` carries the denial reason.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, ctx: &ProxyContext) -> Result<(), String>;
}

#[async_trait]
impl<F> Authorizer for F
where
    F: Fn(&ProxyContext) -> Result<(), String> + Send + Sync,
{
    async fn authorize(&self, ctx: &ProxyContext) -> Result<(), String> {
        self(ctx)
    }
}

/// Rejects unauthorized calls with [`ProxyError::Denied`] before anything
/// else runs.
pub struct AuthorizationInterceptor {
    authorizer: Arc<dyn Authorizer>,
}

impl AuthorizationInterceptor {
    pub fn new<A: Authorizer + 'static>(authorizer: A) -> Self {
        Self {
            authorizer: Arc::new(authorizer),
        }
    }

    pub fn from_arc(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer }
    }
}

#[async_trait]
impl Interceptor for AuthorizationInterceptor {
    async fn invoke(&self, ctx: &mut ProxyContext, next: Next<'_>) -> Response<Value> {
        if let Err(reason) = self.authorizer.authorize(ctx).await {
            tracing::info!(route = %ctx.route_key(), reason = %reason, "Call denied");
            return Response::failure(ProxyError::Denied(reason));
        }
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "authorization"
    }
}
