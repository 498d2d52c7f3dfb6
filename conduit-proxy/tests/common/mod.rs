//! Shared test fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use conduit_proxy::{ErrorKind, Interceptor, Next, ProxyContext, ProxyError, Response, Transport};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Transport replaying a script of responses, then a fallback.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Response<Value>>>,
    fallback: Response<Value>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Response<Value>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Response::success(Value::Null),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call returns `response`.
    pub fn always(response: Response<Value>) -> Self {
        Self::new(Vec::new()).with_fallback(response)
    }

    pub fn with_fallback(mut self, response: Response<Value>) -> Self {
        self.fallback = response;
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, _ctx: &mut ProxyContext) -> Response<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Records entry and exit of a named interceptor into a shared log.
pub struct Recorder {
    pub label: &'static str,
    pub log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Interceptor for Recorder {
    async fn invoke(&self, ctx: &mut ProxyContext, next: Next<'_>) -> Response<Value> {
        self.log.lock().push(format!("enter {}", self.label));
        let response = next.run(ctx).await;
        self.log.lock().push(format!("exit {}", self.label));
        response
    }
}

/// Returns a fixed response without calling the rest of the chain.
pub struct ShortCircuit(pub Response<Value>);

#[async_trait]
impl Interceptor for ShortCircuit {
    async fn invoke(&self, _ctx: &mut ProxyContext, _next: Next<'_>) -> Response<Value> {
        self.0.clone()
    }
}

pub fn ok(value: Value) -> Response<Value> {
    Response::success(value)
}

pub fn transient() -> Response<Value> {
    Response::failure(ProxyError::transport(ErrorKind::Transient, "connection reset"))
}

pub fn non_transient() -> Response<Value> {
    Response::failure(ProxyError::transport(ErrorKind::NonTransient, "bad request"))
}

pub fn business() -> Response<Value> {
    Response::failure(ProxyError::business("insufficient funds"))
}

pub fn context(route: &str) -> ProxyContext {
    ProxyContext::new(Value::Null, "Req", "Res").with_operation(route)
}
