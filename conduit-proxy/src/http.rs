//! HTTP transport over `reqwest`.

use crate::classify::{DefaultClassifier, ErrorClassifier};
use crate::context::{ProxyContext, short_type_name};
use crate::error::{ErrorKind, ProxyError};
use crate::response::Response;
use crate::transport::Transport;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Header carrying the correlation ID.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// POSTs the request JSON to `{base_url}/{operation}` and decodes the JSON
/// reply.
///
/// Without an operation name the last segment of the request type name is
/// used as the path. Non-success statuses and `reqwest` errors are
/// classified before they leave the transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    classifier: Arc<dyn ErrorClassifier>,
}

impl HttpTransport {
    /// Create a transport with a default client.
    pub fn new(base_url: &str) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProxyError::transport(ErrorKind::NonTransient, e.to_string()))?;
        Self::with_client(client, base_url)
    }

    /// Create a transport around an existing client.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ProxyError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ProxyError::InvalidUrl(e.to_string()))?;

        // Url::join replaces the last segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            classifier: Arc::new(DefaultClassifier),
        })
    }

    /// Build a transport whose client enforces `timeout` on every request.
    ///
    /// The resilience layer enforces its own timeout; this one bounds the
    /// socket-level wait when the transport is used on its own.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProxyError::transport(ErrorKind::NonTransient, e.to_string()))?;
        Self::with_client(client, base_url)
    }

    /// Replace the classifier used for status codes and `reqwest` errors.
    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Endpoint for a call.
    pub fn endpoint(&self, ctx: &ProxyContext) -> Result<Url, ProxyError> {
        let path = ctx
            .operation()
            .unwrap_or_else(|| short_type_name(ctx.request_type()));
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ProxyError::InvalidUrl(e.to_string()))
    }

    async fn execute(&self, ctx: &ProxyContext) -> Result<Value, ProxyError> {
        let url = self.endpoint(ctx)?;

        let mut request = self.client.post(url.clone()).json(ctx.request());
        if let Some(id) = ctx.correlation_id() {
            request = request.header(CORRELATION_HEADER, id);
        }

        tracing::trace!(url = %url, "Sending HTTP request");
        let response = request.send().await.map_err(|e| self.classify(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(&e))?;

        if !status.is_success() {
            let code = status.as_u16();
            let message = if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            };

            return Err(match self.classifier.classify_status(code) {
                ErrorKind::Business => ProxyError::Business {
                    code: Some(code.to_string()),
                    message,
                },
                kind => ProxyError::Status {
                    status: code,
                    kind,
                    message,
                },
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ProxyError::Serialization(e.to_string()))
    }

    fn classify(&self, err: &reqwest::Error) -> ProxyError {
        ProxyError::from_error(err, self.classifier.as_ref())
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, ctx: &mut ProxyContext) -> Response<Value> {
        let token = ctx.cancellation().clone();
        let ctx: &ProxyContext = ctx;

        tokio::select! {
            biased;
            _ = token.cancelled() => Response::failure(ProxyError::Cancelled),
            result = self.execute(ctx) => Response::from_result(result),
        }
    }
}
