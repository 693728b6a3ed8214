//! Provider trait definition

use async_trait::async_trait;

use crate::config::Settings;
use crate::types::{ChatMessage, Tool, ToolCall};
use super::error::ProviderResult;

/// Model configuration for provider requests
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderModelConfig {
    /// Model identifier as used by the provider's API
    pub model: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
}

impl ProviderModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: None,
            api_base: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }
}

impl From<&Settings> for ProviderModelConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            model: settings.model.clone(),
            api_key: settings.resolve_api_key(),
            api_base: settings.api_base.clone(),
        }
    }
}

/// Options for a chat request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Tools the model may choose from; `None` omits tool metadata
    pub tools: Option<Vec<Tool>>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Offer `tools`; the model picks among them on its own
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn has_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|t| !t.is_empty())
    }
}

/// One item of model output
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseContent {
    Text(String),
    ToolUse(ToolCall),
}

/// Complete (non-streamed) model response, content in model order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub content: Vec<ResponseContent>,
}

impl ChatResponse {
    pub fn new(content: Vec<ResponseContent>) -> Self {
        Self { content }
    }

    /// A response holding a single text item
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![ResponseContent::Text(text.into())])
    }

    /// A response holding a single tool request
    pub fn tool_use(call: ToolCall) -> Self {
        Self::new(vec![ResponseContent::ToolUse(call)])
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|c| match c {
            ResponseContent::Text(t) => Some(t.as_str()),
            ResponseContent::ToolUse(_) => None,
        })
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.content.iter().filter_map(|c| match c {
            ResponseContent::ToolUse(call) => Some(call),
            ResponseContent::Text(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// The hosted language model, as seen by the orchestrator
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g., "anthropic", "openai")
    fn name(&self) -> &str;

    /// Run one chat completion over the full message list
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        model: ProviderModelConfig,
        options: ChatOptions,
    ) -> ProviderResult<ChatResponse>;
}
