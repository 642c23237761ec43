//! Error types for object retrieval and catalog calls.

use king_transport::TransportError;
use king_types::CanonicalObjectRecord;
use serde::Serialize;
use thiserror::Error;

use crate::engine::FetchOutcome;

/// Failures caught at the fetch boundary.
///
/// Zero records and unrecognised payload shapes are not errors: both
/// resolve to an empty page.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Fetch requested before a connection and class were selected
    #[error("no connection or class selected")]
    NoTarget,

    /// Network or host bridge unreachable
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Non-2xx status or `success: false` from the backend
    #[error("{message}")]
    BackendRejection {
        /// HTTP status
        status: u16,
        /// Backend-supplied or synthesized message
        message: String,
    },

    /// Caller-side deadline elapsed
    #[error("request timed out after {0} ms")]
    Timeout(u128),

    /// Backend base URL cannot carry endpoint paths
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoTarget => "no_target",
            Self::Transport(_) => "transport_failure",
            Self::BackendRejection { .. } => "backend_rejection",
            Self::Timeout(_) => "timeout",
            Self::InvalidUrl(_) => "invalid_url",
        }
    }
}

/// What a caller renders: `{"ok": [...]}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Records of the applied page
    Ok(Vec<CanonicalObjectRecord>),
    /// User-facing failure message
    Error(String),
}

impl Resolution {
    /// Resolve a fetch result. Stale outcomes have nothing to render.
    #[must_use]
    pub fn from_fetch(result: &Result<FetchOutcome, FetchError>) -> Option<Self> {
        match result {
            Ok(FetchOutcome::Applied(report)) => Some(Self::Ok(report.page.records.clone())),
            Ok(FetchOutcome::Stale) => None,
            Err(error) => Some(Self::Error(error.to_string())),
        }
    }
}
