#![allow(missing_docs)]

use std::path::PathBuf;
use std::time::Duration;

use king_console::{ConsoleSettings, load_console_settings_from_paths};
use tempfile::TempDir;

fn write_file(path: PathBuf, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, content).expect("write yaml");
}

#[test]
fn merge_user_overrides_system() {
    let tmp = TempDir::new().expect("tempdir");
    let system = tmp.path().join("conf/settings.yaml");
    let user = tmp.path().join(".config/weaviate-king/settings.yaml");

    write_file(
        system.clone(),
        r#"
backend:
  base_url: "http://10.0.0.5:5175"
  request_timeout_secs: 10
objects:
  fetch_page_size: 50
  display_page_size: 20
bridge:
  max_attempts: 3
  retry_backoff_ms: 250
"#,
    );
    write_file(
        user.clone(),
        r#"
backend:
  request_timeout_secs: 0
objects:
  display_page_size: 25
"#,
    );

    let settings = load_console_settings_from_paths(&system, &user);
    assert_eq!(
        settings.backend.base_url.as_deref(),
        Some("http://10.0.0.5:5175")
    );
    assert_eq!(settings.request_timeout(), None);

    let options = settings.engine_options();
    assert_eq!(options.fetch_page_size, 50);
    assert_eq!(options.display_page_size, 25);

    let retry = settings.bridge_retry_policy();
    assert_eq!(retry.max_attempts, 3);
    assert_eq!(retry.backoff, Duration::from_millis(250));
}

#[test]
fn missing_files_yield_defaults() {
    let tmp = TempDir::new().expect("tempdir");
    let settings = load_console_settings_from_paths(
        &tmp.path().join("conf/settings.yaml"),
        &tmp.path().join(".config/weaviate-king/settings.yaml"),
    );
    assert_eq!(
        settings.backend_url_with(|_| None),
        "http://127.0.0.1:5175"
    );
    assert_eq!(settings.request_timeout(), Some(Duration::from_secs(30)));
    let options = settings.engine_options();
    assert_eq!(options.fetch_page_size, 100);
    assert_eq!(options.display_page_size, 10);
    let retry = settings.bridge_retry_policy();
    assert_eq!(retry.max_attempts, 5);
    assert_eq!(retry.backoff, Duration::from_millis(500));
}

#[test]
fn invalid_yaml_is_ignored() {
    let tmp = TempDir::new().expect("tempdir");
    let system = tmp.path().join("conf/settings.yaml");
    let user = tmp.path().join(".config/weaviate-king/settings.yaml");
    write_file(system.clone(), "objects:\n  fetch_page_size: 40\n");
    write_file(user.clone(), "objects: [not, a, mapping\n");

    let settings = load_console_settings_from_paths(&system, &user);
    assert_eq!(settings.engine_options().fetch_page_size, 40);
}

#[test]
fn backend_url_env_wins_over_settings() {
    let settings = ConsoleSettings {
        backend: king_console::BackendSettings {
            base_url: Some("http://from-settings:5175".into()),
            request_timeout_secs: None,
        },
        ..ConsoleSettings::default()
    };
    assert_eq!(
        settings.backend_url_with(|_| Some("http://from-env:5175/".into())),
        "http://from-env:5175/"
    );
    assert_eq!(
        settings.backend_url_with(|_| Some("  ".into())),
        "http://from-settings:5175"
    );
}
