//! Audit trail for proxied calls.

use crate::context::ProxyContext;
use crate::error::ErrorKind;
use crate::interceptor::{Interceptor, Next};
use crate::response::Response;
use async_trait::async_trait;
use conduit_audit::{AuditOutcome, AuditRecord, AuditSink};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;

/// Writes an [`AuditRecord`] to every sink after each call.
///
/// Sink failures are logged and never change the call's outcome.
pub struct AuditingInterceptor {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl AuditingInterceptor {
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }

    pub fn with_sink<S: AuditSink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    fn build_record(
        ctx: &ProxyContext,
        response: &Response<Value>,
        duration_ms: u64,
    ) -> AuditRecord {
        let outcome = match response.error() {
            None => AuditOutcome::Success,
            Some(crate::ProxyError::Denied(_)) => AuditOutcome::Denied,
            Some(err) if err.kind() == ErrorKind::Cancelled => AuditOutcome::Cancelled,
            Some(_) => AuditOutcome::Failure,
        };

        let mut record = AuditRecord::new(ctx.route_key())
            .outcome(outcome)
            .types(ctx.request_type(), ctx.result_type())
            .duration_ms(duration_ms)
            .cache_hit(ctx.cache_hit())
            .attempt(ctx.attempts());

        if let Some(id) = ctx.correlation_id() {
            record = record.correlation_id(id);
        }
        if let Some(err) = response.error() {
            record = record.error(err.kind().as_str(), err.to_string());
        }
        record
    }
}

#[async_trait]
impl Interceptor for AuditingInterceptor {
    async fn invoke(&self, ctx: &mut ProxyContext, next: Next<'_>) -> Response<Value> {
        let start = Instant::now();
        let response = next.run(ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let record = Self::build_record(ctx, &response, duration_ms);
        for sink in &self.sinks {
            if let Err(e) = sink.write(&record).await {
                tracing::warn!(
                    sink = sink.name(),
                    record_id = %record.id,
                    error = %e,
                    "Audit sink write failed"
                );
            }
        }

        response
    }

    fn name(&self) -> &'static str {
        "auditing"
    }
}
