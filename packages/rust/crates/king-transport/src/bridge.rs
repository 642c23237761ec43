//! Desktop host bridge: wire contract and the native implementation.
//!
//! Inside the sandboxed host the webview cannot open sockets itself, so the
//! host exposes an `http_request` command that performs the call natively and
//! hands back status, headers and the whole body as text.

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::BridgeRetryPolicy;
use crate::message::HttpMethod;

/// Request accepted by the host `http_request` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRequest {
    /// Absolute URL
    pub url: String,
    /// Uppercase method name
    pub method: String,
    /// Optional headers
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    /// Optional text body
    #[serde(default)]
    pub body: Option<String>,
}

/// Structured result returned by the host (no stream).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeResponse {
    /// Status code
    pub status: u16,
    /// Reason phrase
    pub status_text: String,
    /// Response headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Entire body as text
    pub body: String,
}

/// Host-provided native call. Errors are plain messages, as the host
/// command channel reports them.
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Execute one request natively.
    async fn http_request(&self, request: BridgeRequest) -> Result<BridgeResponse, String>;
}

/// In-process implementation of the host `http_request` command.
///
/// Connection failures are retried per [`BridgeRetryPolicy`] because the
/// embedded backend may not be listening yet when the first call arrives.
pub struct NativeHttpBridge {
    client: Client,
    retry: BridgeRetryPolicy,
}

impl NativeHttpBridge {
    /// Bridge with the given retry policy.
    #[must_use]
    pub fn new(retry: BridgeRetryPolicy) -> Self {
        Self {
            client: Client::builder().build().unwrap_or_default(),
            retry,
        }
    }

    async fn send_once(
        &self,
        method: HttpMethod,
        request: &BridgeRequest,
    ) -> Result<reqwest::Response, String> {
        let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
            .map_err(|e| format!("Unsupported method: {e}"))?;
        let mut builder = self.client.request(method, &request.url);
        if let Some(headers) = &request.headers {
            for (name, value) in headers {
                builder = builder.header(name, value);
            }
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        builder
            .send()
            .await
            .map_err(|e| format!("Request failed: {e} (url: {})", request.url))
    }
}

impl Default for NativeHttpBridge {
    fn default() -> Self {
        Self::new(BridgeRetryPolicy::default())
    }
}

#[async_trait]
impl HostBridge for NativeHttpBridge {
    async fn http_request(&self, request: BridgeRequest) -> Result<BridgeResponse, String> {
        let method: HttpMethod = request
            .method
            .parse()
            .map_err(|_| format!("Unsupported method: {}", request.method))?;
        let started = Instant::now();
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        let response = loop {
            match self.send_once(method, &request).await {
                Ok(response) => break response,
                Err(error) if attempt < max_attempts => {
                    tracing::debug!(
                        event = "transport.bridge.retry",
                        url = %request.url,
                        attempt,
                        max_attempts,
                        error = %error,
                        "native bridge request failed; retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(error) => {
                    tracing::warn!(
                        event = "transport.bridge.failed",
                        url = %request.url,
                        attempts = attempt,
                        elapsed_ms = started.elapsed().as_millis(),
                        error = %error,
                        "native bridge request failed"
                    );
                    return Err(error);
                }
            }
        };

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response body: {e}"))?;
        tracing::debug!(
            event = "transport.bridge.completed",
            url = %request.url,
            status = status.as_u16(),
            attempts = attempt,
            elapsed_ms = started.elapsed().as_millis(),
            "native bridge request completed"
        );
        Ok(BridgeResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}
