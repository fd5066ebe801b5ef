//! Configuration loading and defaults for ragchat.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::client::{AckMode, ClientSettings};
use crate::models::{DEFAULT_MODELS, ModelCatalog};
use crate::session::SessionSettings;
use crate::utils::expand_path;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// === Types ===

/// Resolved configuration, including defaults and environment overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub models: Option<Vec<String>>,
    pub upload_ack: Option<String>,
    pub greeting: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(flatten)]
    base: Config,
    profiles: Option<HashMap<String, Config>>,
}

// === Config Loading ===

impl Config {
    /// Load configuration from disk and merge with environment overrides.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load(path: Option<PathBuf>, profile: Option<&str>) -> Result<Self> {
        Self::load_with(path, profile, |key| std::env::var(key).ok())
    }

    /// [`Config::load`] with the environment supplied by `lookup`.
    fn load_with<F>(path: Option<PathBuf>, profile: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path
            .map(|p| expand_path(&p.to_string_lossy()))
            .or_else(|| default_config_path(&lookup));
        let mut config = match path.as_ref() {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                let parsed: ConfigFile = toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
                apply_profile(parsed, profile)?
            }
            _ => {
                if let Some(profile) = profile {
                    anyhow::bail!(
                        "Profile '{profile}' not found: no config file. Available profiles: none"
                    );
                }
                Config::default()
            }
        };

        apply_overrides_from(&mut config, lookup);
        config.validate()?;
        tracing::debug!(path = ?path, profile = ?profile, "configuration loaded");
        Ok(config)
    }

    /// Apply command-line overrides, which win over file and environment.
    pub fn with_overrides(
        mut self,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self> {
        if base_url.is_some() {
            self.base_url = base_url;
        }
        if model.is_some() {
            self.default_model = model;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate that every field that is set holds a usable value.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = self.base_url.as_deref() {
            let trimmed = url.trim();
            if trimmed.is_empty() {
                anyhow::bail!("base_url cannot be empty string");
            }
            if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
                anyhow::bail!("Invalid base_url '{url}': expected an http:// or https:// URL.");
            }
        }
        if let Some(mode) = self.upload_ack.as_deref()
            && AckMode::parse(mode).is_none()
        {
            anyhow::bail!("Invalid upload_ack '{mode}': expected message or status.");
        }
        if self.request_timeout_secs == Some(0) {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }
        if self.connect_timeout_secs == Some(0) {
            anyhow::bail!("connect_timeout_secs must be greater than zero");
        }
        self.catalog()?;
        Ok(())
    }

    /// Return the service base URL (normalized, no trailing slash).
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(str::trim)
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Build the model catalog from `models` and `default_model`.
    pub fn catalog(&self) -> Result<ModelCatalog> {
        let models: Vec<String> = match &self.models {
            Some(models) => models.clone(),
            None => DEFAULT_MODELS.iter().map(|m| (*m).to_string()).collect(),
        };
        if models.iter().all(|m| m.trim().is_empty()) {
            anyhow::bail!("models cannot be empty: list at least one model identifier");
        }
        let listed = models.join(", ");
        ModelCatalog::new(models, self.default_model.as_deref()).with_context(|| {
            format!(
                "Invalid default_model '{}': expected one of {listed}.",
                self.default_model.as_deref().unwrap_or_default()
            )
        })
    }

    #[must_use]
    pub fn ack_mode(&self) -> AckMode {
        self.upload_ack
            .as_deref()
            .and_then(AckMode::parse)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            ack_mode: self.ack_mode(),
            request_timeout: self.request_timeout(),
            connect_timeout: self.connect_timeout(),
            ..ClientSettings::new(self.base_url())
        }
    }

    pub fn session_settings(&self) -> Result<SessionSettings> {
        Ok(SessionSettings {
            catalog: self.catalog()?,
            greeting: self.greeting.clone(),
        })
    }
}

// === Defaults ===

fn default_config_path(lookup: &dyn Fn(&str) -> Option<String>) -> Option<PathBuf> {
    env_config_path(lookup).or_else(home_config_path)
}

fn home_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ragchat").join("config.toml"))
}

fn env_config_path(lookup: &dyn Fn(&str) -> Option<String>) -> Option<PathBuf> {
    let path = lookup("RAGCHAT_CONFIG_PATH")?;
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(expand_path(trimmed))
}

// === Environment Overrides ===

fn apply_overrides_from<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("RAGCHAT_BASE_URL") {
        config.base_url = Some(value);
    }
    if let Some(value) = lookup("RAGCHAT_MODEL") {
        config.default_model = Some(value);
    }
    if let Some(value) = lookup("RAGCHAT_UPLOAD_ACK") {
        config.upload_ack = Some(value);
    }
    if let Some(value) = lookup("RAGCHAT_TIMEOUT_SECS") {
        match value.trim().parse::<u64>() {
            Ok(secs) => config.request_timeout_secs = Some(secs),
            Err(_) => tracing::warn!(%value, "ignoring non-numeric RAGCHAT_TIMEOUT_SECS"),
        }
    }
}

fn apply_profile(config: ConfigFile, profile: Option<&str>) -> Result<Config> {
    let Some(profile_name) = profile else {
        return Ok(config.base);
    };
    let profiles = config.profiles.as_ref();
    match profiles.and_then(|profiles| profiles.get(profile_name)) {
        Some(override_cfg) => Ok(merge_config(config.base, override_cfg.clone())),
        None => {
            let available = profiles
                .map(|profiles| {
                    let mut keys = profiles.keys().cloned().collect::<Vec<_>>();
                    keys.sort();
                    if keys.is_empty() {
                        "none".to_string()
                    } else {
                        keys.join(", ")
                    }
                })
                .unwrap_or_else(|| "none".to_string());
            anyhow::bail!("Profile '{profile_name}' not found. Available profiles: {available}")
        }
    }
}

fn merge_config(base: Config, override_cfg: Config) -> Config {
    Config {
        base_url: override_cfg.base_url.or(base.base_url),
        default_model: override_cfg.default_model.or(base.default_model),
        models: override_cfg.models.or(base.models),
        upload_ack: override_cfg.upload_ack.or(base.upload_ack),
        greeting: override_cfg.greeting.or(base.greeting),
        request_timeout_secs: override_cfg
            .request_timeout_secs
            .or(base.request_timeout_secs),
        connect_timeout_secs: override_cfg
            .connect_timeout_secs
            .or(base.connect_timeout_secs),
    }
}
