//! Configuration module for waiterdesk
//!
//! Handles loading and parsing of:
//! - `config.toml` - Global settings (environment endpoints, timeouts, reconnect)
//! - `WAITERDESK_*` environment overrides

pub mod settings;
pub mod types;

pub use settings::{
    apply_env_overrides, config_path, default_config_dir, init_config_dir, load_settings,
    resolve_settings, save_settings, ENV_VAR_API_URL, ENV_VAR_ENVIRONMENT, ENV_VAR_SOCKET_URL,
};
pub use types::{
    Endpoints, Environment, EnvironmentSettings, HttpSettings, RealtimeSettings, SessionSettings,
    Settings,
};
