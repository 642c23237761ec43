//! Host environment probing and bridge retry policy.

use std::time::Duration;

/// Environment variable the desktop host injects into the process.
pub const HOST_MARKER_ENV: &str = "KING_DESKTOP_HOST";

/// Which transport variant is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Requests go straight over the network
    Direct,
    /// Requests are delegated to the host bridge
    Bridge,
}

/// Result of probing the host environment once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostEnvironment {
    sandboxed: bool,
}

impl HostEnvironment {
    /// Environment for a process known to run inside (or outside) the host.
    #[must_use]
    pub fn new(sandboxed: bool) -> Self {
        Self { sandboxed }
    }

    /// Probe the process environment for the host marker.
    #[must_use]
    pub fn probe() -> Self {
        Self::probe_with(|key| std::env::var(key).ok())
    }

    /// Probe through a custom lookup (tests, embedding hosts).
    pub fn probe_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let sandboxed = lookup(HOST_MARKER_ENV)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);
        Self { sandboxed }
    }

    /// True when running inside the sandboxed desktop host.
    #[must_use]
    pub fn is_sandboxed(self) -> bool {
        self.sandboxed
    }

    /// Transport variant this environment calls for.
    #[must_use]
    pub fn transport_kind(self) -> TransportKind {
        if self.sandboxed {
            TransportKind::Bridge
        } else {
            TransportKind::Direct
        }
    }
}

/// Retry policy of the native bridge while the local backend boots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeRetryPolicy {
    /// Total attempts, at least one
    pub max_attempts: u32,
    /// Fixed wait between attempts
    pub backoff: Duration,
}

impl Default for BridgeRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(500),
        }
    }
}
