//! Console settings loader.
//!
//! Loads and merges:
//! - System defaults: `<KING_ROOT>/conf/settings.yaml`
//! - User overrides:  `<KING_CONFIG_HOME>/weaviate-king/settings.yaml`
//!
//! Merge precedence is user over system, field by field.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use king_objects::{DEFAULT_BACKEND_URL, EngineOptions, FETCH_PAGE_SIZE};
use king_transport::BridgeRetryPolicy;
use king_types::DEFAULT_DISPLAY_PAGE_SIZE;
use serde::Deserialize;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "conf/settings.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "weaviate-king/settings.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding `backend.base_url`.
pub const BACKEND_URL_ENV: &str = "KING_BACKEND_URL";

static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

/// Merged console settings; every field optional so files can be layered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsoleSettings {
    /// Collaborator API
    #[serde(default)]
    pub backend: BackendSettings,
    /// Object retrieval
    #[serde(default)]
    pub objects: ObjectSettings,
    /// In-process host bridge
    #[serde(default)]
    pub bridge: BridgeSettings,
}

/// `backend:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendSettings {
    /// Collaborator base URL
    pub base_url: Option<String>,
    /// Caller-side deadline per call; `0` disables it
    pub request_timeout_secs: Option<u64>,
}

/// `objects:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectSettings {
    /// Records requested per fetch
    pub fetch_page_size: Option<usize>,
    /// Rows per display page
    pub display_page_size: Option<usize>,
}

/// `bridge:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeSettings {
    /// Attempts before a bridged call fails
    pub max_attempts: Option<u32>,
    /// Pause between attempts
    pub retry_backoff_ms: Option<u64>,
}

impl ConsoleSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            backend: self.backend.merge(overlay.backend),
            objects: self.objects.merge(overlay.objects),
            bridge: self.bridge.merge(overlay.bridge),
        }
    }

    /// Base URL: `KING_BACKEND_URL`, then settings, then the default.
    #[must_use]
    pub fn backend_url(&self) -> String {
        self.backend_url_with(|key| std::env::var(key).ok())
    }

    #[doc(hidden)]
    pub fn backend_url_with(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        let clean = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        clean(lookup(BACKEND_URL_ENV))
            .or_else(|| clean(self.backend.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
    }

    /// Deadline per collaborator call; `None` when configured as `0`.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        match self
            .backend
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
        {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Engine options from the `objects` and `backend` sections.
    #[must_use]
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            fetch_page_size: self
                .objects
                .fetch_page_size
                .filter(|n| *n > 0)
                .unwrap_or(FETCH_PAGE_SIZE),
            display_page_size: self
                .objects
                .display_page_size
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_DISPLAY_PAGE_SIZE),
            request_timeout: self.request_timeout(),
        }
    }

    /// Retry policy of the in-process host bridge.
    #[must_use]
    pub fn bridge_retry_policy(&self) -> BridgeRetryPolicy {
        let defaults = BridgeRetryPolicy::default();
        BridgeRetryPolicy {
            max_attempts: self
                .bridge
                .max_attempts
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_attempts),
            backoff: self
                .bridge
                .retry_backoff_ms
                .map_or(defaults.backoff, Duration::from_millis),
        }
    }
}

impl BackendSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            base_url: overlay.base_url.or(self.base_url),
            request_timeout_secs: overlay.request_timeout_secs.or(self.request_timeout_secs),
        }
    }
}

impl ObjectSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            fetch_page_size: overlay.fetch_page_size.or(self.fetch_page_size),
            display_page_size: overlay.display_page_size.or(self.display_page_size),
        }
    }
}

impl BridgeSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            max_attempts: overlay.max_attempts.or(self.max_attempts),
            retry_backoff_ms: overlay.retry_backoff_ms.or(self.retry_backoff_ms),
        }
    }
}

/// Load merged console settings (user overrides system).
#[must_use]
pub fn load_console_settings() -> ConsoleSettings {
    let (system_path, user_path) = console_settings_paths();
    load_console_settings_from_paths(&system_path, &user_path)
}

#[doc(hidden)]
#[must_use]
pub fn console_settings_paths() -> (PathBuf, PathBuf) {
    let root = project_root();
    let system_path = root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH);
    let user_path = resolve_config_home(&root).join(DEFAULT_USER_SETTINGS_RELATIVE_PATH);
    (system_path, user_path)
}

#[doc(hidden)]
#[must_use]
pub fn load_console_settings_from_paths(system: &Path, user: &Path) -> ConsoleSettings {
    load_one(system).merge(load_one(user))
}

fn load_one(path: &Path) -> ConsoleSettings {
    if !path.exists() {
        return ConsoleSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                event = "console.settings.read_failed",
                path = %path.display(),
                error = %error,
                "failed to read settings file; ignoring"
            );
            return ConsoleSettings::default();
        }
    };
    match serde_yaml::from_str::<ConsoleSettings>(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                event = "console.settings.parse_failed",
                path = %path.display(),
                error = %error,
                "failed to parse settings yaml; ignoring file"
            );
            ConsoleSettings::default()
        }
    }
}

fn project_root() -> PathBuf {
    std::env::var("KING_ROOT")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map_or_else(
            || std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            PathBuf::from,
        )
}

/// Set config-home override (used by CLI `--conf`).
///
/// The path can be absolute, or relative to `KING_ROOT`/cwd.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if CONFIG_HOME_OVERRIDE.set(path.clone()).is_err()
        && let Some(current) = CONFIG_HOME_OVERRIDE.get()
        && current != &path
    {
        tracing::warn!(
            current = %current.display(),
            ignored = %path.display(),
            "config home override already set; ignoring subsequent value"
        );
    }
}

fn resolve_config_home(project_root: &Path) -> PathBuf {
    if let Some(path) = CONFIG_HOME_OVERRIDE.get() {
        return absolutize(project_root, path.clone());
    }

    let configured = std::env::var("KING_CONFIG_HOME")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_HOME_RELATIVE_PATH.to_string());
    absolutize(project_root, PathBuf::from(configured))
}

fn absolutize(project_root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}
