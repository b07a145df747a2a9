use crate::api::DEFAULT_BASE_URL;
use crate::validation::ValidationError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the API backend
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    /// Unset means no timeout
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Configuration for session storage
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

fn myflix_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".myflix"))
        .unwrap_or_else(|| PathBuf::from(".myflix"))
}

impl Config {
    /// Built-in defaults: the public myFlix deployment and a per-user session file
    pub fn with_defaults() -> Self {
        Config {
            api: ApiConfig {
                base_url: Some(DEFAULT_BASE_URL.to_string()),
                timeout_ms: None,
            },
            session: SessionConfig {
                path: Some(myflix_dir().join("session.json")),
            },
        }
    }

    /// Load configuration from default paths
    /// Priority: local (.myflix/config.local.toml) > project (.myflix/config.toml) > user (~/.myflix/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::with_defaults();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".myflix").join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = Path::new(".myflix").join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        // Should be gitignored
        let local_config = Path::new(".myflix").join("config.local.toml");
        if local_config.exists() {
            config.merge(Self::load_from(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority where set)
    pub fn merge(&mut self, other: Config) {
        if other.api.base_url.is_some() {
            self.api.base_url = other.api.base_url;
        }
        if other.api.timeout_ms.is_some() {
            self.api.timeout_ms = other.api.timeout_ms;
        }
        if other.session.path.is_some() {
            self.session.path = other.session.path;
        }
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, api_url: Option<&str>, session_file: Option<&Path>) {
        if let Some(url) = api_url {
            self.api.base_url = Some(url.to_string());
        }
        if let Some(path) = session_file {
            self.session.path = Some(path.to_path_buf());
        }
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.api.timeout_ms.map(Duration::from_millis)
    }

    pub fn session_path(&self) -> PathBuf {
        self.session
            .path
            .clone()
            .unwrap_or_else(|| myflix_dir().join("session.json"))
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let base_url = self.base_url();
        let host = base_url
            .strip_prefix("https://")
            .or_else(|| base_url.strip_prefix("http://"));
        match host {
            Some(rest) if !rest.trim_matches('/').is_empty() => {}
            _ => errors.push(ValidationError::new(
                "api.base_url",
                format!("Expected an http(s) URL, got '{}'", base_url),
            )),
        }

        if self.api.timeout_ms == Some(0) {
            errors.push(ValidationError::new(
                "api.timeout_ms",
                "Must be greater than 0 (omit it for no timeout)",
            ));
        }

        if self
            .session
            .path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            errors.push(ValidationError::new("session.path", "Must not be empty"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
