//! Proxy error types.

use crate::classify::ErrorClassifier;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type for proxy operations.
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Classification of a failure.
///
/// Only [`ErrorKind::Transient`] failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Likely to succeed if tried again (timeouts, resets, 5xx, 429).
    Transient,
    /// Will fail again no matter how often it is tried.
    NonTransient,
    /// A domain rule rejected the request; never retried, never trips a breaker.
    Business,
    /// The caller cancelled the call.
    Cancelled,
}

impl ErrorKind {
    /// Check if failures of this kind should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transient)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transient => "transient",
            ErrorKind::NonTransient => "non_transient",
            ErrorKind::Business => "business",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proxy errors.
///
/// Every variant knows its [`ErrorKind`]; interceptors branch on the kind and
/// never on error text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    /// The call did not complete within its timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The route's circuit breaker rejected the call.
    #[error("Circuit breaker is open for route '{route}'")]
    CircuitOpen {
        /// Route key of the open breaker.
        route: String,
    },

    /// The call was cancelled by the caller.
    #[error("Request cancelled")]
    Cancelled,

    /// A domain rule rejected the request.
    #[error("Business rule violation: {message}")]
    Business {
        /// Optional machine-readable code.
        code: Option<String>,
        /// Human-readable message.
        message: String,
    },

    /// Authorization rejected the call before it was sent.
    #[error("Access denied: {0}")]
    Denied(String),

    /// The remote end answered with a non-success status.
    #[error("Response error: {status} - {message}")]
    Status {
        /// Status code.
        status: u16,
        /// Classification of the status.
        kind: ErrorKind,
        /// Response body or reason.
        message: String,
    },

    /// Transport-level failure normalized by a classifier.
    #[error("Transport error ({kind}): {message}")]
    Transport {
        /// Classification of the underlying error.
        kind: ErrorKind,
        /// Underlying error message.
        message: String,
    },

    /// Request or response payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Endpoint could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ProxyError {
    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::Transient,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Business { .. } => ErrorKind::Business,
            Self::Status { kind, .. } | Self::Transport { kind, .. } => *kind,
            Self::CircuitOpen { .. }
            | Self::Denied(_)
            | Self::Serialization(_)
            | Self::InvalidUrl(_) => ErrorKind::NonTransient,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Create a business error.
    pub fn business(message: impl Into<String>) -> Self {
        Self::Business {
            code: None,
            message: message.into(),
        }
    }

    /// Create a transport error with an explicit kind.
    pub fn transport(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Normalize a raw error using a classifier.
    ///
    /// Errors that already are a [`ProxyError`] or a [`BusinessError`] keep
    /// their identity; anything else becomes [`ProxyError::Transport`]. A
    /// classifier is never allowed to produce [`ErrorKind::Cancelled`]; that
    /// outcome only comes from the cancellation token.
    pub fn from_error(
        error: &(dyn std::error::Error + 'static),
        classifier: &dyn ErrorClassifier,
    ) -> Self {
        if let Some(proxy) = error.downcast_ref::<ProxyError>() {
            return proxy.clone();
        }
        if let Some(business) = error.downcast_ref::<BusinessError>() {
            return Self::Business {
                code: business.code.clone(),
                message: business.message.clone(),
            };
        }

        let kind = match classifier.classify(error) {
            ErrorKind::Cancelled => ErrorKind::NonTransient,
            kind => kind,
        };
        Self::Transport {
            kind,
            message: error.to_string(),
        }
    }

    /// Status code, if this is a status error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Domain rejection raised by a transport or downstream handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BusinessError {
    pub code: Option<String>,
    pub message: String,
}

impl BusinessError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl From<BusinessError> for ProxyError {
    fn from(err: BusinessError) -> Self {
        Self::Business {
            code: err.code,
            message: err.message,
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
