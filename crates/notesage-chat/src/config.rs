//! LLM configuration: optional `llm-config.json`, environment fills the gaps.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ChatError;
use crate::providers::GEMINI_API_BASE;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-flash-latest";

/// LLM configuration (read from llm-config.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Where this config was loaded from.
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.into()
}
fn default_api_base() -> String {
    GEMINI_API_BASE.into()
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.into(),
            api_base: GEMINI_API_BASE.into(),
            config_path: PathBuf::new(),
        }
    }
}

impl LLMConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    pub fn load_with<F>(config_path: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: LLMConfig = match std::fs::read_to_string(config_path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!("Ignoring malformed {}: {}", config_path.display(), e);
                LLMConfig::default()
            }),
            Err(_) => LLMConfig::default(),
        };

        config.config_path = config_path.to_path_buf();

        if config.gemini_api_key.as_deref().map_or(true, str::is_empty) {
            config.gemini_api_key = lookup("GEMINI_API_KEY").filter(|k| !k.is_empty());
        }
        if let Some(model) = lookup("GEMINI_MODEL").filter(|m| !m.is_empty()) {
            config.gemini_model = model;
        }
        if let Some(base) = lookup("GEMINI_API_BASE").filter(|b| !b.is_empty()) {
            config.api_base = base;
        }

        info!(
            "LLM: model {} ({})",
            config.gemini_model,
            if config.is_configured() { "key present" } else { "no API key" }
        );
        config
    }

    pub fn is_configured(&self) -> bool {
        self.gemini_api_key.is_some()
    }

    /// The API key, or [`ChatError::MissingApiKey`].
    pub fn api_key(&self) -> Result<&str, ChatError> {
        self.gemini_api_key.as_deref().ok_or(ChatError::MissingApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file_or_env() {
        let dir = tempfile::tempdir().unwrap();
        let config = LLMConfig::load_with(&dir.path().join("llm-config.json"), |_| None);
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert!(!config.is_configured());
        assert!(matches!(config.api_key(), Err(ChatError::MissingApiKey)));
    }

    #[test]
    fn test_env_fills_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = LLMConfig::load_with(&dir.path().join("llm-config.json"), |k| match k {
            "GEMINI_API_KEY" => Some("env-key".into()),
            "GEMINI_MODEL" => Some("gemini-pro".into()),
            _ => None,
        });
        assert_eq!(config.api_key().unwrap(), "env-key");
        assert_eq!(config.gemini_model, "gemini-pro");
    }

    #[test]
    fn test_file_key_wins_over_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llm-config.json");
        std::fs::write(&path, r#"{"gemini_api_key":"file-key"}"#).unwrap();

        let reloaded = LLMConfig::load_with(&path, |k| {
            (k == "GEMINI_API_KEY").then(|| "env-key".to_string())
        });
        assert_eq!(reloaded.api_key().unwrap(), "file-key");
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("llm-config.json");
        std::fs::write(&path, "{not json").unwrap();
        let config = LLMConfig::load_with(&path, |_| None);
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
    }
}
