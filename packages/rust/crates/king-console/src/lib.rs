//! Weaviate-King console runtime support: layered YAML settings.

mod settings;

pub use settings::{
    BACKEND_URL_ENV, BackendSettings, BridgeSettings, ConsoleSettings, ObjectSettings,
    console_settings_paths, load_console_settings, load_console_settings_from_paths,
    set_config_home_override,
};
