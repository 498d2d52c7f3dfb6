//! Read-through result caching.

use crate::context::{ProxyContext, items};
use crate::interceptor::{Interceptor, Next};
use crate::response::Response;
use async_trait::async_trait;
use conduit_cache::CacheStore;
use conduit_config::ProxyOptions;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Decides which calls are cached and for how long.
pub trait CachePolicy: Send + Sync {
    fn is_cacheable(&self, ctx: &ProxyContext) -> bool;

    fn ttl(&self, ctx: &ProxyContext) -> Duration;
}

/// Derives the cache key for a call; `None` bypasses the cache.
pub trait CacheKeyProvider: Send + Sync {
    fn key(&self, ctx: &ProxyContext) -> Option<String>;
}

/// Caches every call with a fixed TTL.
#[derive(Debug, Clone)]
pub struct CacheAllPolicy {
    ttl: Duration,
}

impl CacheAllPolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

impl CachePolicy for CacheAllPolicy {
    fn is_cacheable(&self, _ctx: &ProxyContext) -> bool {
        true
    }

    fn ttl(&self, _ctx: &ProxyContext) -> Duration {
        self.ttl
    }
}

/// Caches routes marked `cacheable` in [`ProxyOptions`], using the route's
/// TTL override or the default TTL.
#[derive(Debug, Clone)]
pub struct ConfiguredCachePolicy {
    options: Arc<ProxyOptions>,
}

impl ConfiguredCachePolicy {
    pub fn new(options: Arc<ProxyOptions>) -> Self {
        Self { options }
    }
}

impl CachePolicy for ConfiguredCachePolicy {
    fn is_cacheable(&self, ctx: &ProxyContext) -> bool {
        self.options.is_cacheable(&ctx.route_key())
    }

    fn ttl(&self, ctx: &ProxyContext) -> Duration {
        self.options.cache_ttl_for(&ctx.route_key())
    }
}

/// Default key: `conduit:{route}:{result_type}:{request_type}:{sha256}` where
/// the route is [`ProxyContext::route_key`] and the digest covers the
/// canonical JSON of the request (object keys sorted).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultKeyProvider;

impl CacheKeyProvider for DefaultKeyProvider {
    fn key(&self, ctx: &ProxyContext) -> Option<String> {
        let mut canonical = String::new();
        write_canonical(ctx.request(), &mut canonical);
        let digest = Sha256::digest(canonical.as_bytes());

        Some(format!(
            "conduit:{}:{}:{}:{}",
            ctx.route_key(),
            ctx.result_type(),
            ctx.request_type(),
            hex::encode(digest)
        ))
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(values) => {
            out.push('[');
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(value, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Serves successful results from a [`CacheStore`].
///
/// A hit returns without calling the rest of the chain and sets
/// `items["cache.hit"]`. Only successes are stored. Cache backend errors are
/// logged and treated as a miss.
pub struct CachingInterceptor {
    store: Arc<dyn CacheStore>,
    policy: Arc<dyn CachePolicy>,
    keys: Arc<dyn CacheKeyProvider>,
}

impl CachingInterceptor {
    pub fn new(store: Arc<dyn CacheStore>, policy: Arc<dyn CachePolicy>) -> Self {
        Self {
            store,
            policy,
            keys: Arc::new(DefaultKeyProvider),
        }
    }

    pub fn with_key_provider(mut self, keys: Arc<dyn CacheKeyProvider>) -> Self {
        self.keys = keys;
        self
    }

    async fn lookup(&self, key: &str) -> Option<Value> {
        let raw = match self.store.get_json(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn store(&self, key: &str, value: &Value, ttl: Duration) {
        let result = self.store.set_json(key, value.to_string(), Some(ttl)).await;
        if let Err(e) = result {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }
    }
}

#[async_trait]
impl Interceptor for CachingInterceptor {
    async fn invoke(&self, ctx: &mut ProxyContext, next: Next<'_>) -> Response<Value> {
        if !self.policy.is_cacheable(ctx) {
            return next.run(ctx).await;
        }
        let Some(key) = self.keys.key(ctx) else {
            return next.run(ctx).await;
        };

        if let Some(value) = self.lookup(&key).await {
            tracing::debug!(key = %key, "Cache hit");
            ctx.insert_item(items::CACHE_HIT, true);
            return Response::success(value);
        }

        ctx.insert_item(items::CACHE_HIT, false);
        let response = next.run(ctx).await;

        if let Some(value) = response.value() {
            let ttl = self.policy.ttl(ctx);
            self.store(&key, value, ttl).await;
        }

        response
    }

    fn name(&self) -> &'static str {
        "caching"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key_for(request: Value) -> String {
        let ctx = ProxyContext::new(request, "GetUser", "User");
        DefaultKeyProvider.key(&ctx).unwrap()
    }

    #[test]
    fn test_key_shape() {
        let key = key_for(json!({"id": 1}));
        let rest = key.strip_prefix("conduit:GetUser -> User:User:GetUser:").unwrap();
        assert_eq!(rest.len(), 64);
        assert!(rest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_depends_on_operation() {
        let get =
            ProxyContext::new(json!({"id": 1}), "GetUser", "User").with_operation("users.get");
        let delete =
            ProxyContext::new(json!({"id": 1}), "GetUser", "User").with_operation("users.delete");

        let get_key = DefaultKeyProvider.key(&get).unwrap();
        assert!(get_key.starts_with("conduit:users.get:User:GetUser:"));
        assert_ne!(get_key, DefaultKeyProvider.key(&delete).unwrap());
    }

    #[test]
    fn test_key_ignores_field_order() {
        assert_eq!(
            key_for(json!({"a": 1, "b": {"y": 2, "x": [1, 2]}})),
            key_for(json!({"b": {"x": [1, 2], "y": 2}, "a": 1}))
        );
    }

    #[test]
    fn test_key_depends_on_values_and_types() {
        assert_ne!(key_for(json!({"id": 1})), key_for(json!({"id": 2})));
        assert_ne!(key_for(json!([1, 2])), key_for(json!([2, 1])));

        let other = ProxyContext::new(json!({"id": 1}), "GetUser", "UserSummary");
        assert_ne!(DefaultKeyProvider.key(&other).unwrap(), key_for(json!({"id": 1})));
    }

    #[test]
    fn test_canonical_escapes_strings() {
        let mut out = String::new();
        write_canonical(&json!({"q": "a\"b"}), &mut out);
        assert_eq!(out, r#"{"q":"a\"b"}"#);
    }

    #[test]
    fn test_configured_policy() {
        let options = Arc::new(ProxyOptions::default().with_route(
            "users.get",
            conduit_config::RouteOptions {
                cacheable: Some(true),
                cache_ttl_secs: Some(5),
                ..Default::default()
            },
        ));
        let policy = ConfiguredCachePolicy::new(options);

        let ctx = ProxyContext::new(json!({}), "A", "B").with_operation("users.get");
        assert!(policy.is_cacheable(&ctx));
        assert_eq!(policy.ttl(&ctx), Duration::from_secs(5));

        let ctx = ProxyContext::new(json!({}), "A", "B");
        assert!(!policy.is_cacheable(&ctx));
    }
}
