//! Correlation ID propagation.

use crate::context::{ProxyContext, items};
use crate::interceptor::{Interceptor, Next};
use crate::response::Response;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Guarantees every call carries a correlation ID.
///
/// Keeps the caller's ID when one was supplied, otherwise generates a UUID
/// v4. The ID is mirrored into `items["correlation_id"]` and stamped on the
/// response.
#[derive(Clone, Default)]
pub struct CorrelationInterceptor {
    generator: Option<IdGenerator>,
}

impl CorrelationInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom ID generator instead of UUID v4.
    pub fn with_generator<F>(generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self {
            generator: Some(Arc::new(generator)),
        }
    }

    fn generate(&self) -> String {
        match &self.generator {
            Some(generate) => generate(),
            None => uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[async_trait]
impl Interceptor for CorrelationInterceptor {
    async fn invoke(&self, ctx: &mut ProxyContext, next: Next<'_>) -> Response<Value> {
        let existing = ctx
            .correlation_id()
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let id = match existing {
            Some(id) => id,
            None => {
                let id = self.generate();
                ctx.set_correlation_id(id.clone());
                id
            }
        };
        ctx.insert_item(items::CORRELATION_ID, id.clone());

        next.run(ctx).await.with_correlation_id(id)
    }

    fn name(&self) -> &'static str {
        "correlation"
    }
}
