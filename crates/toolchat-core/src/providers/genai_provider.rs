//! GenaiProvider - model calls through the genai crate
//!
//! Handles every provider genai speaks natively (Anthropic, OpenAI,
//! Gemini, Ollama, ...) plus OpenAI-compatible endpoints.

use std::sync::Arc;

use async_trait::async_trait;

use crate::logging::Logger;
use crate::types::ChatMessage;

use super::error::{ProviderError, ProviderResult};
use super::genai_adapter::{
    create_client, from_genai_response, model_name, requires_api_key, to_genai_options,
    to_genai_request,
};
use super::traits::{ChatOptions, ChatResponse, Provider, ProviderModelConfig};

/// Provider backed by a genai client built per request
pub struct GenaiProvider {
    provider_id: String,
    logger: Arc<dyn Logger>,
}

impl GenaiProvider {
    pub fn new(provider_id: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self {
            provider_id: provider_id.into(),
            logger,
        }
    }

    /// Environment variable hint shown when a key is missing
    fn env_var_hint(&self) -> String {
        crate::config::Settings {
            provider: self.provider_id.clone(),
            ..Default::default()
        }
        .api_key_env_var()
    }
}

#[async_trait]
impl Provider for GenaiProvider {
    fn name(&self) -> &str {
        &self.provider_id
    }

    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        model_config: ProviderModelConfig,
        options: ChatOptions,
    ) -> ProviderResult<ChatResponse> {
        if model_config.api_key.is_none() && requires_api_key(&self.provider_id) {
            return Err(ProviderError::missing_api_key(
                self.provider_id.clone(),
                self.env_var_hint(),
            ));
        }

        let model = model_name(&model_config.model);
        self.logger.info(&format!(
            "[GenaiProvider] chat: provider={}, model={}, messages={}, tools={}",
            self.provider_id,
            model,
            messages.len(),
            options.tools.as_ref().map_or(0, Vec::len)
        ));

        let client = create_client(&self.provider_id, &model_config);
        let request = to_genai_request(&messages, &options);
        let genai_options = to_genai_options(&options);

        let response = client
            .exec_chat(model, request, Some(&genai_options))
            .await
            .map_err(|e| {
                self.logger.error(&format!("[GenaiProvider] chat failed: {}", e));
                ProviderError::from_message(self.provider_id.clone(), e.to_string())
            })?;

        let response = from_genai_response(response);
        self.logger.debug(&format!(
            "[GenaiProvider] response: {} items, {} tool calls",
            response.content.len(),
            response.tool_calls().count()
        ));

        Ok(response)
    }
}
