use crate::application::prediction_client::ServiceVariant;
use crate::application::session::SessionSettings;
use crate::domain::dashboard::DEFAULT_REFRESH_INTERVAL;
use crate::domain::location::LocationId;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub service: ServiceSettings,
    pub dashboard: PollingSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub mode: ServiceVariant,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingSettings {
    pub refresh_interval_secs: u64,
    pub auto_refresh: bool,
    #[serde(default)]
    pub default_location: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid service base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("refresh interval must be at least one second")]
    InvalidRefreshInterval,

    #[error("request timeout must be at least one second")]
    InvalidRequestTimeout,
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.service.base_url).map_err(|e| {
            ConfigError::InvalidBaseUrl {
                url: self.service.base_url.clone(),
                reason: e.to_string(),
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.service.base_url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        if self.dashboard.refresh_interval_secs == 0 {
            return Err(ConfigError::InvalidRefreshInterval);
        }
        if self.service.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidRequestTimeout);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.request_timeout_secs)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            refresh_interval: Duration::from_secs(self.dashboard.refresh_interval_secs),
            auto_refresh: self.dashboard.auto_refresh,
            default_location: self
                .dashboard
                .default_location
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(LocationId::new),
        }
    }
}

fn defaults() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("service.base_url", "http://localhost:8000")?
        .set_default("service.mode", "multi-location")?
        .set_default("service.request_timeout_secs", 10)?
        .set_default(
            "dashboard.refresh_interval_secs",
            DEFAULT_REFRESH_INTERVAL.as_secs(),
        )?
        .set_default("dashboard.auto_refresh", true)?
        .set_default("server.bind", "127.0.0.1:3000")?)
}

fn finish(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> anyhow::Result<DashboardConfig> {
    let config: DashboardConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// `DASHBOARD__*` variables, e.g. `DASHBOARD__SERVICE__BASE_URL`.
fn environment() -> config::Environment {
    config::Environment::with_prefix("DASHBOARD")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Defaults, then `config/dashboard.*` if present, then the environment.
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let builder = defaults()?
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(environment());
    finish(builder)
}
