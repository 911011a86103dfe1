//! Settings parser for `<config dir>/waiterdesk/config.toml`

use std::path::{Path, PathBuf};

use waiterdesk_core::prelude::*;

use super::types::{parse_url, Environment, Settings};

const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "waiterdesk";

/// Selects the environment, overriding `environment` in the file.
pub const ENV_VAR_ENVIRONMENT: &str = "WAITERDESK_ENV";
/// Replaces the selected environment's `api_url`.
pub const ENV_VAR_API_URL: &str = "WAITERDESK_API_URL";
/// Replaces the selected environment's `socket_url`.
pub const ENV_VAR_SOCKET_URL: &str = "WAITERDESK_SOCKET_URL";

/// Platform config directory for waiterdesk (`~/.config/waiterdesk` on Linux).
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILENAME)
}

/// Load settings from `config.toml` in `config_dir`
///
/// Returns default settings if the file doesn't exist or can't be parsed.
pub fn load_settings(config_dir: &Path) -> Settings {
    let config_path = config_path(config_dir);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Load settings, apply environment overrides, then validate.
///
/// `environment` (from the command line) wins over both the file and
/// `WAITERDESK_ENV`.
pub fn resolve_settings(config_dir: &Path, environment: Option<Environment>) -> Result<Settings> {
    let mut settings = load_settings(config_dir);
    apply_env_overrides(&mut settings)?;
    if let Some(env) = environment {
        settings.environment = env;
    }
    settings.validate()?;
    info!(
        "Using {} environment ({})",
        settings.environment,
        settings.endpoints().api_url
    );
    Ok(settings)
}

/// Apply `WAITERDESK_*` variables from the process environment.
pub fn apply_env_overrides(settings: &mut Settings) -> Result<()> {
    apply_overrides(settings, |name| {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    })
}

fn apply_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(raw) = lookup(ENV_VAR_ENVIRONMENT) {
        settings.environment = raw
            .parse()
            .map_err(|e: Error| Error::config(format!("{ENV_VAR_ENVIRONMENT}: {e}")))?;
        debug!("{} selects {}", ENV_VAR_ENVIRONMENT, settings.environment);
    }

    let env = settings.environment;
    if let Some(raw) = lookup(ENV_VAR_API_URL) {
        parse_url(ENV_VAR_API_URL, &raw, &["http", "https"])?;
        settings.environments.get_mut(env).api_url = raw;
    }
    if let Some(raw) = lookup(ENV_VAR_SOCKET_URL) {
        parse_url(ENV_VAR_SOCKET_URL, &raw, &["http", "https", "ws", "wss"])?;
        settings.environments.get_mut(env).socket_url = raw;
    }
    Ok(())
}

/// Create `config_dir` with a commented default `config.toml`.
///
/// An existing file is left alone.
pub fn init_config_dir(config_dir: &Path) -> Result<PathBuf> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir)
            .map_err(|e| Error::config(format!("Failed to create config dir: {}", e)))?;
    }

    let config_path = config_path(config_dir);
    if !config_path.exists() {
        let default_content = r#"# waiterdesk configuration
#
# WAITERDESK_ENV, WAITERDESK_API_URL and WAITERDESK_SOCKET_URL override
# the values below.

environment = "dev"     # dev, staging or prod

[environments.dev]
api_url = "http://localhost:3000/api"
socket_url = "http://localhost:3000"

[environments.staging]
api_url = "https://staging.waiterdesk.app/api"
socket_url = "https://staging.waiterdesk.app"

[environments.prod]
api_url = "https://api.waiterdesk.app/api"
socket_url = "https://api.waiterdesk.app"

[http]
timeout_secs = 15

[realtime]
reconnect = true
max_attempts = 10       # Give up after this many failed reconnects
initial_delay_ms = 1000 # Doubles per attempt
max_delay_ms = 30000
connect_timeout_secs = 20

[session]
# Session file (leave unset for the platform data dir)
# path = "/var/lib/waiterdesk/session.json"
"#;
        std::fs::write(&config_path, default_content)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Created default config at {:?}", config_path);
    }

    Ok(config_path)
}

/// Save settings to `config.toml` in `config_dir`
///
/// Uses atomic write (write to temp file, then rename) to prevent corruption.
pub fn save_settings(config_dir: &Path, settings: &Settings) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir)
            .map_err(|e| Error::config(format!("Failed to create config dir: {}", e)))?;
    }

    let config_path = config_path(config_dir);
    let temp_path = config_dir.join(".config.toml.tmp");

    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;
    let full_content = format!("# waiterdesk configuration\n\n{}", content);

    std::fs::write(&temp_path, &full_content)
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;

    std::fs::rename(&temp_path, &config_path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    info!("Saved settings to {:?}", config_path);
    Ok(())
}
