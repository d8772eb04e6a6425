//! Transport layer for the catalog API.
//!
//! `CatalogTransport` is the seam tests mock; `HttpTransport` is the reqwest
//! implementation with timeout bounding, cooperative cancellation, and
//! content-type checking.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use statehouse_core::error::{CatalogError, Result};

use crate::request::{ApiRequest, JsonResponse, Method};

/// The network seam. Implementations perform one bounded request and settle
/// with a parsed JSON response or a typed error; they never panic.
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    /// Sends one request, bounded by `timeout`. When the bound expires the
    /// in-flight call is cancelled through `cancel` and the caller receives
    /// a `Timeout` error distinct from ordinary network failures.
    async fn send(
        &self,
        request: &ApiRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<JsonResponse>;
}

/// Transport implementation that talks to the catalog backend over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a new transport against the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<JsonResponse> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();

        // A non-JSON payload (an HTML error page from a proxy, usually) is
        // an infrastructure failure, regardless of the status code.
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("application/json") {
            tracing::warn!(
                "[HttpTransport] Non-JSON response for {}: '{}' (HTTP {})",
                request.operation(),
                content_type,
                status
            );
            return Err(CatalogError::UnexpectedContentType {
                status,
                content_type,
            });
        }

        let body: Value = response.json().await?;

        if !(200..300).contains(&status) {
            return Err(CatalogError::http_status(status, error_message(&body)));
        }

        Ok(JsonResponse { status, body })
    }
}

/// Pulls a human-readable message out of a JSON error body, falling back to
/// the raw body text.
fn error_message(body: &Value) -> String {
    body.get("message")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl CatalogTransport for HttpTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<JsonResponse> {
        tokio::select! {
            _ = cancel.cancelled() => {
                Err(CatalogError::network(format!(
                    "request cancelled: {}",
                    request.operation()
                )))
            }
            outcome = tokio::time::timeout(timeout, self.dispatch(request)) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        // Signal cooperating callers to stop applying state
                        // changes for this operation.
                        cancel.cancel();
                        tracing::warn!(
                            "[HttpTransport] {} timed out after {}s",
                            request.operation(),
                            timeout.as_secs()
                        );
                        Err(CatalogError::timeout(
                            request.operation(),
                            timeout.as_secs(),
                        ))
                    }
                }
            }
        }
    }
}
