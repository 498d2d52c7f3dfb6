//! Response envelope.

use crate::error::{ErrorKind, ProxyError};
use std::time::Duration;

/// Outcome of one proxied invocation.
///
/// A response holds either a value or a typed error, never both. Responses
/// are not mutated after creation; the `with_*` methods consume the response
/// and return an enriched copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    outcome: Result<T, ProxyError>,
    duration: Duration,
    correlation_id: Option<String>,
}

impl<T> Response<T> {
    /// Successful response carrying `value`.
    pub fn success(value: T) -> Self {
        Self::from_result(Ok(value))
    }

    /// Failed response carrying `error`.
    pub fn failure(error: ProxyError) -> Self {
        Self::from_result(Err(error))
    }

    pub fn from_result(outcome: Result<T, ProxyError>) -> Self {
        Self {
            outcome,
            duration: Duration::ZERO,
            correlation_id: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }

    /// The value, if the call succeeded.
    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    /// The error, if the call failed.
    pub fn error(&self) -> Option<&ProxyError> {
        self.outcome.as_ref().err()
    }

    /// Kind of the failure, if the call failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(ProxyError::kind)
    }

    pub fn outcome(&self) -> &Result<T, ProxyError> {
        &self.outcome
    }

    /// Elapsed time recorded for the call.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Transform the value, keeping metadata.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            outcome: self.outcome.map(f),
            duration: self.duration,
            correlation_id: self.correlation_id,
        }
    }

    /// Transform the value with a fallible function, keeping metadata.
    pub fn and_then<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> Result<U, ProxyError>,
    {
        Response {
            outcome: self.outcome.and_then(f),
            duration: self.duration,
            correlation_id: self.correlation_id,
        }
    }

    pub fn into_result(self) -> Result<T, ProxyError> {
        self.outcome
    }
}

impl<T> From<Result<T, ProxyError>> for Response<T> {
    fn from(outcome: Result<T, ProxyError>) -> Self {
        Self::from_result(outcome)
    }
}
