//! Transport adapter for the Weaviate-King console.
//!
//! One [`Transport`] contract, two variants picked once at startup:
//! [`DirectTransport`] issues requests over `reqwest`, [`BridgeTransport`]
//! hands them to the desktop host through a [`HostBridge`] when the process
//! runs inside the sandboxed host (detected via [`HostEnvironment::probe`]).

mod bridge;
mod config;
mod error;
mod message;
mod transport;

pub use bridge::{BridgeRequest, BridgeResponse, HostBridge, NativeHttpBridge};
pub use config::{BridgeRetryPolicy, HOST_MARKER_ENV, HostEnvironment, TransportKind};
pub use error::TransportError;
pub use message::{HttpMethod, HttpRequest, HttpResponse};
pub use reqwest::Url;
pub use transport::{BridgeTransport, DirectTransport, Transport, select_transport};
