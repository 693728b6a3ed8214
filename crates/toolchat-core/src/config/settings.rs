//! Model settings and the holder that shares them
//!
//! Settings are mutable at runtime (a UI may change the key or model
//! between turns). Every `send_message` reads one snapshot up front, so a
//! change mid-conversation applies from the next call.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Settings consumed by the orchestrator and the model provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Provider id (e.g. "anthropic", "openai", "ollama")
    pub provider: String,
    /// Model identifier as used by the provider's API
    pub model: String,
    /// Explicit API key; falls back to the provider's environment variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Output token cap per model call
    pub max_tokens: u32,
    /// Hard ceiling on tool round trips per `send_message`
    pub max_iterations: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            api_key: None,
            api_base: None,
            max_tokens: 1000,
            max_iterations: 20,
        }
    }
}

impl Settings {
    /// Environment variable conventionally holding this provider's key
    pub fn api_key_env_var(&self) -> String {
        match self.provider.to_lowercase().as_str() {
            "anthropic" => "ANTHROPIC_API_KEY".to_string(),
            "openai" => "OPENAI_API_KEY".to_string(),
            "gemini" | "google" => "GEMINI_API_KEY".to_string(),
            "groq" => "GROQ_API_KEY".to_string(),
            "xai" => "XAI_API_KEY".to_string(),
            "deepseek" => "DEEPSEEK_API_KEY".to_string(),
            "openrouter" => "OPENROUTER_API_KEY".to_string(),
            other => format!("{}_API_KEY", other.to_uppercase()),
        }
    }

    /// Explicit key if set and non-empty, otherwise the environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(self.api_key_env_var()).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Shared, mutable settings.
///
/// Constructed explicitly and passed by `Arc`; there is no process-wide
/// instance.
#[derive(Debug, Default)]
pub struct ConfigurationHolder {
    settings: RwLock<Settings>,
}

impl ConfigurationHolder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    pub fn shared(settings: Settings) -> Arc<Self> {
        Arc::new(Self::new(settings))
    }

    /// Copy of the current settings
    pub fn snapshot(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Replace all settings
    pub fn replace(&self, settings: Settings) {
        *self.settings.write() = settings;
    }

    /// Apply an in-place edit
    pub fn update(&self, f: impl FnOnce(&mut Settings)) {
        f(&mut self.settings.write());
    }

    pub fn set_api_key(&self, key: Option<String>) {
        self.update(|s| s.api_key = key);
    }

    pub fn set_model(&self, model: impl Into<String>) {
        let model = model.into();
        self.update(|s| s.model = model);
    }

    pub fn set_api_base(&self, base: Option<String>) {
        self.update(|s| s.api_base = base);
    }

    pub fn model(&self) -> String {
        self.settings.read().model.clone()
    }
}
