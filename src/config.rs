use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::diagnosis::risk::RiskThresholds;
use crate::error::AnalysisError;
use crate::models::BackendKind;

pub const DEFAULT_HOSTED_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_HOSTED_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Root configuration structure, deserialized from `.skinsight/config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Which adapter analyses go through. Defaults to `local`.
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    /// Per-request timeout for either backend.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub hosted: HostedConfig,
    #[serde(default)]
    pub local: LocalConfig,
    /// Melanoma percent boundaries between Low / Medium / High.
    #[serde(default)]
    pub risk: RiskThresholds,
}

/// Settings for the hosted multimodal model.
#[derive(Debug, Clone, Deserialize)]
pub struct HostedConfig {
    /// Required for the hosted backend. `API_KEY` overrides it.
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

/// Settings for the self-hosted classifier service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalConfig {
    /// Full URL of the predict endpoint. `API_URL` overrides it.
    pub url: Option<String>,
}

fn default_backend() -> BackendKind {
    BackendKind::Local
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_model() -> String {
    DEFAULT_HOSTED_MODEL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_HOSTED_ENDPOINT.to_string()
}

impl Default for HostedConfig {
    fn default() -> Self {
        HostedConfig {
            api_key: None,
            model: default_model(),
            endpoint: default_endpoint(),
        }
    }
}

impl Default for Config {
    /// Built-in configuration used when no config file is found: local
    /// backend, no endpoint or key set, 10 / 50 risk thresholds.
    fn default() -> Self {
        Config {
            backend: default_backend(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            hosted: HostedConfig::default(),
            local: LocalConfig::default(),
            risk: RiskThresholds::default(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Apply `API_KEY` / `API_URL` overrides. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("API_KEY").filter(|v| !v.trim().is_empty()) {
            self.hosted.api_key = Some(key);
        }
        if let Some(url) = lookup("API_URL").filter(|v| !v.trim().is_empty()) {
            self.local.url = Some(url);
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.timeout_secs == 0 {
            return Err(AnalysisError::Configuration(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        self.risk.validate().map_err(AnalysisError::Configuration)
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<base_dir>/.skinsight/config.toml`
/// 3. `~/.config/skinsight/config.toml`
/// 4. Built-in [`Config::default`]
///
/// Environment overrides are applied last. Callers validate once CLI
/// overrides are in place.
pub fn load_config(base_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    let mut config = read_config_file(base_dir, config_override)?;
    config.apply_env(|name| std::env::var(name).ok());
    Ok(config)
}

fn read_config_file(base_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return parse_file(path);
    }

    let local_config = base_dir.join(".skinsight").join("config.toml");
    if local_config.exists() {
        return parse_file(&local_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("skinsight").join("config.toml");
        if home_config.exists() {
            return parse_file(&home_config);
        }
    }

    Ok(Config::default())
}

fn parse_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}
