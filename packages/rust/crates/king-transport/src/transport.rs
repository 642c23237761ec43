//! The `Transport` seam and its two variants.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;

use crate::bridge::{BridgeRequest, HostBridge};
use crate::config::{HostEnvironment, TransportKind};
use crate::error::TransportError;
use crate::message::{HttpRequest, HttpResponse};

/// Uniform request/response contract, whatever the host.
///
/// Implementations perform exactly one network call per `execute`: no
/// retries and no deadline. Callers that need a timeout wrap the future.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Variant, for diagnostics.
    fn kind(&self) -> TransportKind;

    /// Issue `request` and return the complete response.
    ///
    /// # Errors
    /// Returns a [`TransportError`] when the network or the bridge fails.
    /// Non-2xx responses are not errors at this level.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Direct networking over `reqwest`.
#[derive(Clone, Default)]
pub struct DirectTransport {
    client: Client,
}

impl DirectTransport {
    /// Transport with a fresh client (no client-level timeout).
    #[must_use]
    pub fn new() -> Self {
        Self::with_client(Client::builder().build().unwrap_or_default())
    }

    /// Transport over an existing client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for DirectTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Direct
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let started = Instant::now();
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|_| TransportError::UnsupportedMethod(request.method.to_string()))?;
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await.map_err(|error| {
            tracing::debug!(
                event = "transport.direct.request_failed",
                url = %request.url,
                elapsed_ms = started.elapsed().as_millis(),
                error = %error,
                "direct request failed"
            );
            TransportError::Network {
                url: request.url.clone(),
                message: error.to_string(),
            }
        })?;

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body_text = response
            .text()
            .await
            .map_err(|error| TransportError::Network {
                url: request.url.clone(),
                message: format!("failed to read response body: {error}"),
            })?;
        tracing::debug!(
            event = "transport.direct.completed",
            url = %request.url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis(),
            "direct request completed"
        );
        Ok(HttpResponse::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            headers,
            body_text,
        ))
    }
}

/// Delegates every request to the desktop host bridge.
#[derive(Clone)]
pub struct BridgeTransport {
    bridge: Arc<dyn HostBridge>,
}

impl BridgeTransport {
    /// Transport over a host bridge.
    #[must_use]
    pub fn new(bridge: Arc<dyn HostBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Bridge
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let started = Instant::now();
        let url = request.url.clone();
        let bridged = BridgeRequest {
            url: request.url,
            method: request.method.to_string(),
            headers: Some(request.headers),
            body: request.body,
        };
        let response = self.bridge.http_request(bridged).await.map_err(|message| {
            tracing::debug!(
                event = "transport.bridge.request_failed",
                url = %url,
                elapsed_ms = started.elapsed().as_millis(),
                error = %message,
                "bridge request failed"
            );
            TransportError::Bridge(message)
        })?;
        tracing::debug!(
            event = "transport.bridge.received",
            url = %url,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis(),
            "bridge response received"
        );
        Ok(HttpResponse::new(
            response.status,
            response.status_text,
            response.headers,
            response.body,
        ))
    }
}

/// Pick the transport variant once, from the probed environment.
///
/// # Errors
/// Returns [`TransportError::BridgeUnavailable`] when the environment is
/// sandboxed but no bridge was supplied.
pub fn select_transport(
    environment: HostEnvironment,
    bridge: Option<Arc<dyn HostBridge>>,
) -> Result<Arc<dyn Transport>, TransportError> {
    let transport: Arc<dyn Transport> = match environment.transport_kind() {
        TransportKind::Bridge => {
            let bridge = bridge.ok_or(TransportError::BridgeUnavailable)?;
            Arc::new(BridgeTransport::new(bridge))
        }
        TransportKind::Direct => Arc::new(DirectTransport::new()),
    };
    tracing::info!(
        event = "transport.selected",
        kind = ?transport.kind(),
        "transport selected"
    );
    Ok(transport)
}
