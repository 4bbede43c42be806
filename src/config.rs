use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

use crate::gemini::Endpoint;
use crate::preset::{ApiVersion, ModelPreset};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_REVEAL_INTERVAL_MS: u64 = 15;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// "flash" or "pro"
    pub preset: Option<String>,
    /// Overrides the preset's model id
    pub model: Option<String>,
    /// Overrides the preset's API version ("v1" / "v1beta")
    pub api_version: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub dark_mode: bool,
    pub timeout_secs: Option<u64>,
    pub reveal_interval_ms: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("Invalid config {:?}", path))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Persist the preset choice without touching other fields.
    pub fn save_preset(path: &Path, preset: ModelPreset) -> Result<()> {
        let mut config = Self::load_from(path).unwrap_or_else(|_| Self::new());
        config.preset = Some(preset.as_str().to_string());
        // An explicit model would shadow the preset
        config.model = None;
        config.api_version = None;
        config.save_to(path)
    }

    pub fn preset(&self) -> ModelPreset {
        self.preset
            .as_deref()
            .and_then(ModelPreset::from_str)
            .unwrap_or(ModelPreset::Flash)
    }

    /// The environment variable wins over the config file.
    pub fn resolve_api_key(&self, env_value: Option<String>) -> Result<String> {
        env_value
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| anyhow!("No API key found. Set {} or add \"api_key\" to the config file", API_KEY_ENV))
    }

    pub fn endpoint(&self) -> Endpoint {
        let preset = self.preset();
        let version = self
            .api_version
            .as_deref()
            .and_then(ApiVersion::from_str)
            .unwrap_or_else(|| preset.api_version());

        Endpoint {
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            version,
            model: self
                .model
                .clone()
                .unwrap_or_else(|| preset.model_id().to_string()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms.unwrap_or(DEFAULT_REVEAL_INTERVAL_MS).max(1))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("gemini-chat").join("config.json"))
    }
}
