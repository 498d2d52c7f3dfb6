//! Error classification.

use crate::error::{BusinessError, ErrorKind, ProxyError};
use std::error::Error;
use std::io;

/// Maps raw errors to an [`ErrorKind`].
///
/// Classification happens once, at the transport boundary. Implementations
/// must be pure: the same error always gets the same kind.
pub trait ErrorClassifier: Send + Sync {
    /// Classify a raw error.
    fn classify(&self, error: &(dyn Error + 'static)) -> ErrorKind;

    /// Classify a non-success status code.
    fn classify_status(&self, status: u16) -> ErrorKind {
        classify_status(status)
    }
}

/// Default status mapping: 408, 429 and 5xx are transient, 409 and 422 are
/// business rejections, everything else is non-transient.
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        408 | 429 => ErrorKind::Transient,
        409 | 422 => ErrorKind::Business,
        500..=599 => ErrorKind::Transient,
        _ => ErrorKind::NonTransient,
    }
}

/// Classifier covering the error types the workspace produces.
///
/// Walks the `source()` chain and returns the first kind it recognizes;
/// unknown errors are non-transient.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl DefaultClassifier {
    fn classify_one(&self, error: &(dyn Error + 'static)) -> Option<ErrorKind> {
        if error.is::<BusinessError>() {
            return Some(ErrorKind::Business);
        }
        if let Some(proxy) = error.downcast_ref::<ProxyError>() {
            return Some(proxy.kind());
        }
        if error.is::<tokio::time::error::Elapsed>() {
            return Some(ErrorKind::Transient);
        }
        if let Some(io) = error.downcast_ref::<io::Error>() {
            return Some(classify_io(io.kind()));
        }
        #[cfg(feature = "http")]
        if let Some(err) = error.downcast_ref::<reqwest::Error>() {
            return Some(self.classify_reqwest(err));
        }
        None
    }

    #[cfg(feature = "http")]
    fn classify_reqwest(&self, err: &reqwest::Error) -> ErrorKind {
        if let Some(status) = err.status() {
            return self.classify_status(status.as_u16());
        }
        if err.is_timeout() || err.is_connect() {
            return ErrorKind::Transient;
        }
        if err.is_decode() || err.is_builder() || err.is_redirect() {
            return ErrorKind::NonTransient;
        }
        if err.is_request() || err.is_body() {
            return ErrorKind::Transient;
        }
        ErrorKind::NonTransient
    }
}

impl ErrorClassifier for DefaultClassifier {
    fn classify(&self, error: &(dyn Error + 'static)) -> ErrorKind {
        let mut current = Some(error);
        while let Some(err) = current {
            if let Some(kind) = self.classify_one(err) {
                return kind;
            }
            current = err.source();
        }
        ErrorKind::NonTransient
    }
}

fn classify_io(kind: io::ErrorKind) -> ErrorKind {
    match kind {
        io::ErrorKind::TimedOut
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::NotConnected => ErrorKind::Transient,
        _ => ErrorKind::NonTransient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    #[error("wrapped: {source}")]
    struct Wrapped {
        #[source]
        source: io::Error,
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(classify_status(408), ErrorKind::Transient);
        assert_eq!(classify_status(429), ErrorKind::Transient);
        assert_eq!(classify_status(500), ErrorKind::Transient);
        assert_eq!(classify_status(503), ErrorKind::Transient);
        assert_eq!(classify_status(422), ErrorKind::Business);
        assert_eq!(classify_status(409), ErrorKind::Business);
        assert_eq!(classify_status(400), ErrorKind::NonTransient);
        assert_eq!(classify_status(404), ErrorKind::NonTransient);
    }

    #[test]
    fn test_io_errors() {
        let c = DefaultClassifier;
        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "slow");
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");

        assert_eq!(c.classify(&timed_out), ErrorKind::Transient);
        assert_eq!(c.classify(&denied), ErrorKind::NonTransient);
    }

    #[test]
    fn test_walks_source_chain() {
        let err = Wrapped {
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(DefaultClassifier.classify(&err), ErrorKind::Transient);
    }

    #[test]
    fn test_business_and_proxy_errors() {
        let c = DefaultClassifier;
        assert_eq!(c.classify(&BusinessError::new("no")), ErrorKind::Business);
        assert_eq!(
            c.classify(&ProxyError::Timeout(Duration::from_secs(1))),
            ErrorKind::Transient
        );
    }

    #[tokio::test]
    async fn test_elapsed_is_transient() {
        let elapsed = tokio::time::timeout(
            Duration::from_millis(1),
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();
        assert_eq!(DefaultClassifier.classify(&elapsed), ErrorKind::Transient);
    }

    #[test]
    fn test_unknown_is_non_transient() {
        let err = std::fmt::Error;
        assert_eq!(DefaultClassifier.classify(&err), ErrorKind::NonTransient);
    }
}
