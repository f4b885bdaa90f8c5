//! Configuration loading and management for sitechat.
//!
//! Loads settings from an optional `sitechat.toml`. API keys are only ever read
//! from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::backend::BackendKind;

const CONFIG_FILE_NAME: &str = "sitechat.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Please set the {0} environment variable")]
    MissingApiKey(String),
}

/// LLM backend selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Backend: "openai" or "gemini"
    #[serde(default)]
    pub backend: BackendKind,
    /// Model identifier; the backend's default when unset
    #[serde(default)]
    pub model: Option<String>,
}

/// API endpoints from the file, keys from the environment
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub openai_base_url: Option<String>,
    #[serde(default)]
    pub gemini_base_url: Option<String>,
    #[serde(skip)]
    pub openai_key: Option<String>,
    #[serde(skip)]
    pub gemini_key: Option<String>,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Load configuration from `path`, or from the default locations.
    ///
    /// Without an explicit path a missing file is fine and defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path.map(Path::to_path_buf).or_else(Self::find_config_file) {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("no config file found, using defaults");
                let mut config = Config::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading config file");
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from(CONFIG_FILE_NAME);
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        let home_config = dirs::home_dir()?
            .join(".config")
            .join("sitechat")
            .join(CONFIG_FILE_NAME);
        home_config.exists().then_some(home_config)
    }

    /// Read API keys from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Read API keys through `lookup`; empty values count as unset
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let find = |kind: BackendKind| {
            kind.api_key_vars()
                .iter()
                .filter_map(|&name| lookup(name))
                .find(|key| !key.trim().is_empty())
        };
        if let Some(key) = find(BackendKind::OpenAi) {
            self.api.openai_key = Some(key);
        }
        if let Some(key) = find(BackendKind::Gemini) {
            self.api.gemini_key = Some(key);
        }
    }

    /// Get the API key for the configured backend
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        let backend = self.agent.backend;
        let key = match backend {
            BackendKind::OpenAi => self.api.openai_key.as_deref(),
            BackendKind::Gemini => self.api.gemini_key.as_deref(),
        };
        key.ok_or_else(|| ConfigError::MissingApiKey(backend.api_key_vars()[0].to_string()))
    }

    pub fn model(&self) -> &str {
        self.agent
            .model
            .as_deref()
            .unwrap_or_else(|| self.agent.backend.default_model())
    }

    pub fn base_url(&self) -> &str {
        let configured = match self.agent.backend {
            BackendKind::OpenAi => self.api.openai_base_url.as_deref(),
            BackendKind::Gemini => self.api.gemini_base_url.as_deref(),
        };
        configured.unwrap_or_else(|| self.agent.backend.default_base_url())
    }
}
