//! Per-call context threaded through the pipeline.

use serde_json::Value;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Well-known keys in [`ProxyContext`] items.
pub mod items {
    /// Correlation ID of the call (string).
    pub const CORRELATION_ID: &str = "correlation_id";
    /// Set to `true` when the caching layer served the result.
    pub const CACHE_HIT: &str = "cache.hit";
    /// Breaker state observed by the resilience layer (string).
    pub const CIRCUIT_STATE: &str = "circuit.state";
    /// Current attempt, 1-based, while the retry layer is running.
    pub const RETRY_ATTEMPT: &str = "retry.attempt";
    /// Total attempts made, written when the retry layer exits.
    pub const RETRY_ATTEMPTS: &str = "retry.attempts";
    /// Wall time measured by the telemetry layer, in milliseconds.
    pub const ELAPSED_MS: &str = "telemetry.elapsed_ms";
}

/// Mutable state of one call.
///
/// Created by the client for every call and passed by `&mut` through each
/// interceptor to the transport. Never shared between calls.
#[derive(Debug, Clone)]
pub struct ProxyContext {
    request: Value,
    request_type: String,
    result_type: String,
    operation: Option<String>,
    correlation_id: Option<String>,
    cancellation: CancellationToken,
    items: HashMap<String, Value>,
}

impl ProxyContext {
    pub fn new(
        request: Value,
        request_type: impl Into<String>,
        result_type: impl Into<String>,
    ) -> Self {
        Self {
            request,
            request_type: request_type.into(),
            result_type: result_type.into(),
            operation: None,
            correlation_id: None,
            cancellation: CancellationToken::new(),
            items: HashMap::new(),
        }
    }

    /// Context whose type names come from `Req` and `Res`.
    pub fn for_types<Req: ?Sized, Res: ?Sized>(request: Value) -> Self {
        Self::new(
            request,
            std::any::type_name::<Req>(),
            std::any::type_name::<Res>(),
        )
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Request payload as canonical JSON.
    pub fn request(&self) -> &Value {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Value {
        &mut self.request
    }

    pub fn request_type(&self) -> &str {
        &self.request_type
    }

    pub fn result_type(&self) -> &str {
        &self.result_type
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn set_correlation_id(&mut self, id: impl Into<String>) {
        self.correlation_id = Some(id.into());
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Key identifying the route for breaker state and configuration:
    /// the operation name when present, otherwise `"{request} -> {result}"`.
    pub fn route_key(&self) -> String {
        match &self.operation {
            Some(op) => op.clone(),
            None => format!("{} -> {}", self.request_type, self.result_type),
        }
    }

    pub fn item(&self, key: &str) -> Option<&Value> {
        self.items.get(key)
    }

    pub fn insert_item(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.items.insert(key.into(), value.into());
    }

    pub fn remove_item(&mut self, key: &str) -> Option<Value> {
        self.items.remove(key)
    }

    pub fn items(&self) -> &HashMap<String, Value> {
        &self.items
    }

    /// Whether the caching layer served this call.
    pub fn cache_hit(&self) -> bool {
        self.item(items::CACHE_HIT)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Attempts made so far: the running attempt while retrying, the total
    /// after the retry layer returns, `1` when no retry layer ran.
    pub fn attempts(&self) -> u32 {
        self.item(items::RETRY_ATTEMPTS)
            .or_else(|| self.item(items::RETRY_ATTEMPT))
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(1)
    }
}

/// Last path segment of a type name, without generic arguments.
///
/// `my_app::orders::GetOrder` becomes `GetOrder`.
pub fn short_type_name(name: &str) -> &str {
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}
