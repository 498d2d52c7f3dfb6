//! Audit record structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an audited call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// Call returned a value
    Success,
    /// Call failed (transport, business, timeout, open circuit)
    Failure,
    /// Call was rejected by authorization
    Denied,
    /// Call was cancelled by the caller
    Cancelled,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "success",
            AuditOutcome::Failure => "failure",
            AuditOutcome::Denied => "denied",
            AuditOutcome::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one proxied call.
///
/// Built once after the call completes and handed to every sink; sinks only
/// ever see it by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record ID
    pub id: String,

    /// When the record was built
    pub timestamp: DateTime<Utc>,

    /// Action name (operation, or the route key when no operation was given)
    pub action: String,

    /// How the call ended
    pub outcome: AuditOutcome,

    /// Correlation ID of the call
    pub correlation_id: Option<String>,

    /// Request type name
    pub request_type: String,

    /// Declared result type name
    pub result_type: String,

    /// Time spent below the auditing layer, in milliseconds
    pub duration_ms: u64,

    /// Error classification (`transient`, `business`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    /// Failure detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Whether the result came from cache
    pub cache_hit: bool,

    /// Attempt number this record describes (1-based)
    pub attempt: u32,
}

impl AuditRecord {
    /// Create a new record for an action
    ///
    /// # Examples
    ///
    /// ```
    /// use conduit_audit::*;
    ///
    /// let record = AuditRecord::new("orders.get")
    ///     .correlation_id("c-1")
    ///     .outcome(AuditOutcome::Success)
    ///     .duration_ms(12);
    /// assert_eq!(record.action, "orders.get");
    /// ```
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action: action.into(),
            outcome: AuditOutcome::Success,
            correlation_id: None,
            request_type: String::new(),
            result_type: String::new(),
            duration_ms: 0,
            error_kind: None,
            error: None,
            cache_hit: false,
            attempt: 1,
        }
    }

    pub fn outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Set request and result type names
    pub fn types(
        mut self,
        request_type: impl Into<String>,
        result_type: impl Into<String>,
    ) -> Self {
        self.request_type = request_type.into();
        self.result_type = result_type.into();
        self
    }

    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }

    /// Record a failure with its classification
    pub fn error(mut self, kind: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_kind = Some(kind.into());
        self.error = Some(message.into());
        self
    }

    pub fn cache_hit(mut self, hit: bool) -> Self {
        self.cache_hit = hit;
        self
    }

    pub fn attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    /// Serialize to a single JSON line
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
