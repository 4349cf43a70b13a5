use anyhow::{Context, Result};
use serde::Deserialize;

use crate::session::SessionConfig;

/// Environment variables with this prefix override file values,
/// e.g. `AGENT_EMBED__WIDGET__AGENT_NAME=concierge`.
pub const ENV_PREFIX: &str = "AGENT_EMBED";

pub const DEFAULT_TOKEN_TTL_SECS: u64 = 600;

/// Longest fallback token lifetime accepted (one year)
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub widget: WidgetConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    /// Base URL of the credential issuance service
    pub origin: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub sandbox_id: Option<String>,
    /// Fallback token lifetime when the token carries no readable `exp` claim
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WidgetConfig {
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default = "default_pre_connect_buffer")]
    pub is_pre_connect_buffer_enabled: bool,
    #[serde(default = "default_liveness_timeout_secs")]
    pub liveness_timeout_secs: u64,
}

impl CredentialsConfig {
    /// Fallback token lifetime, `None` when `token_ttl_secs` is out of range
    pub fn token_ttl(&self) -> Option<chrono::Duration> {
        if self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return None;
        }
        i64::try_from(self.token_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            agent_name: None,
            is_pre_connect_buffer_enabled: default_pre_connect_buffer(),
            liveness_timeout_secs: default_liveness_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "/api/connection-details".to_string()
}

fn default_token_ttl_secs() -> u64 {
    DEFAULT_TOKEN_TTL_SECS
}

fn default_pre_connect_buffer() -> bool {
    true
}

fn default_liveness_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        let config: Self = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.credentials.token_ttl().with_context(|| {
            format!(
                "credentials.token_ttl_secs must be at most {} (got {})",
                MAX_TOKEN_TTL_SECS, config.credentials.token_ttl_secs
            )
        })?;

        Ok(config)
    }

    /// The subset of configuration the session controller consumes
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            is_pre_connect_buffer_enabled: self.widget.is_pre_connect_buffer_enabled,
            liveness_timeout: std::time::Duration::from_secs(self.widget.liveness_timeout_secs),
        }
    }
}
