//! Error types for transport operations.

use thiserror::Error;

/// Failures surfaced by a [`crate::Transport`].
///
/// A transport never substitutes a default response: every failure reaches
/// the caller as one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Direct networking failed before a response arrived
    #[error("request failed: {message} (url: {url})")]
    Network {
        /// Target URL
        url: String,
        /// Underlying client error
        message: String,
    },

    /// The host bridge rejected or failed the call
    #[error("host bridge call failed: {0}")]
    Bridge(String),

    /// Sandboxed host detected but no bridge was supplied
    #[error("running inside the desktop host but no bridge is available")]
    BridgeUnavailable,

    /// Method the transport cannot issue
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// Body text is not valid JSON
    #[error("invalid JSON body: {0}")]
    Decode(String),
}
