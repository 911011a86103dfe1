//! Configuration types for waiterdesk
//!
//! Defines:
//! - `Settings` - Global client settings loaded from `config.toml`
//! - `Environment` - Which backend deployment to talk to
//! - Per-section sub-types with serde defaults

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use waiterdesk_client::{RealtimeConfig, ReconnectPolicy};
use waiterdesk_core::prelude::*;

/// Backend deployment selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Prod),
            other => Err(Error::config(format!(
                "unknown environment '{other}' (expected dev, staging or prod)"
            ))),
        }
    }
}

/// Base URLs of one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Endpoints {
    /// REST base, including the `/api` prefix.
    pub api_url: String,

    /// Socket.IO server; a path selects the namespace.
    pub socket_url: String,
}

impl Endpoints {
    fn new(api_url: &str, socket_url: &str) -> Self {
        Self {
            api_url: api_url.to_string(),
            socket_url: socket_url.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnvironmentSettings {
    #[serde(default = "default_dev_endpoints")]
    pub dev: Endpoints,

    #[serde(default = "default_staging_endpoints")]
    pub staging: Endpoints,

    #[serde(default = "default_prod_endpoints")]
    pub prod: Endpoints,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            dev: default_dev_endpoints(),
            staging: default_staging_endpoints(),
            prod: default_prod_endpoints(),
        }
    }
}

impl EnvironmentSettings {
    pub fn get(&self, env: Environment) -> &Endpoints {
        match env {
            Environment::Dev => &self.dev,
            Environment::Staging => &self.staging,
            Environment::Prod => &self.prod,
        }
    }

    pub fn get_mut(&mut self, env: Environment) -> &mut Endpoints {
        match env {
            Environment::Dev => &mut self.dev,
            Environment::Staging => &mut self.staging,
            Environment::Prod => &mut self.prod,
        }
    }
}

fn default_dev_endpoints() -> Endpoints {
    Endpoints::new("http://localhost:3000/api", "http://localhost:3000")
}

fn default_staging_endpoints() -> Endpoints {
    Endpoints::new(
        "https://staging.waiterdesk.app/api",
        "https://staging.waiterdesk.app",
    )
}

fn default_prod_endpoints() -> Endpoints {
    Endpoints::new("https://api.waiterdesk.app/api", "https://api.waiterdesk.app")
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HttpSettings {
    /// Whole-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RealtimeSettings {
    #[serde(default = "default_true")]
    pub reconnect: bool,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            reconnect: true,
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl RealtimeSettings {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            enabled: self.reconnect,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_attempts: self.max_attempts,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_connect_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSettings {
    /// Session file location (default: platform data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Global settings from `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub environments: EnvironmentSettings,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub realtime: RealtimeSettings,

    #[serde(default)]
    pub session: SessionSettings,
}

impl Settings {
    /// Endpoints of the selected environment.
    pub fn endpoints(&self) -> &Endpoints {
        self.environments.get(self.environment)
    }

    pub fn api_url(&self) -> Result<Url> {
        parse_url("api_url", &self.endpoints().api_url, &["http", "https"])
    }

    pub fn socket_url(&self) -> Result<Url> {
        parse_url(
            "socket_url",
            &self.endpoints().socket_url,
            &["http", "https", "ws", "wss"],
        )
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn realtime_config(&self) -> Result<RealtimeConfig> {
        let mut config = RealtimeConfig::new(self.socket_url()?);
        config.reconnect = self.realtime.reconnect_policy();
        config.connect_timeout = Duration::from_secs(self.realtime.connect_timeout_secs);
        Ok(config)
    }

    /// Check the selected environment's URLs and the numeric limits.
    pub fn validate(&self) -> Result<()> {
        self.api_url()?;
        self.socket_url()?;
        if self.http.timeout_secs == 0 {
            return Err(Error::config("http.timeout_secs must be greater than 0"));
        }
        if self.realtime.initial_delay_ms > self.realtime.max_delay_ms {
            return Err(Error::config(
                "realtime.initial_delay_ms must not exceed realtime.max_delay_ms",
            ));
        }
        Ok(())
    }
}

pub(crate) fn parse_url(field: &str, raw: &str, schemes: &[&str]) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::config(format!("{field} '{raw}': {e}")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(Error::config(format!(
            "{field} '{raw}' must use one of: {}",
            schemes.join(", ")
        )));
    }
    Ok(url)
}
