//! Scripted provider for tests and offline demos
//!
//! Replays canned responses in order and records every request so
//! callers can assert on exactly what the model was sent.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::logging::Logger;
use crate::types::ChatMessage;

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatOptions, ChatResponse, Provider, ProviderModelConfig};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Response(ChatResponse),
    /// Fail the call as an upstream API error
    Error(String),
}

/// A request as the provider saw it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub model: ProviderModelConfig,
    pub options: ChatOptions,
}

type Responder = dyn Fn(usize, &[ChatMessage], &ChatOptions) -> ProviderResult<ChatResponse> + Send + Sync;

/// Provider that answers from a script instead of the network
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    fallback: Option<Box<Responder>>,
    requests: Mutex<Vec<RecordedRequest>>,
    logger: Option<Arc<dyn Logger>>,
}

impl ScriptedProvider {
    /// Replay `responses` in order, then fail
    pub fn new(responses: impl IntoIterator<Item = ChatResponse>) -> Self {
        Self::with_replies(responses.into_iter().map(ScriptedReply::Response))
    }

    pub fn with_replies(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            logger: None,
        }
    }

    /// Answer every call with `responder(call_index, messages, options)`
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(usize, &[ChatMessage], &ChatOptions) -> ProviderResult<ChatResponse> + Send + Sync + 'static,
    {
        Self::with_replies(Vec::new()).with_fallback(responder)
    }

    /// Used once the scripted replies run out
    pub fn with_fallback<F>(mut self, responder: F) -> Self
    where
        F: Fn(usize, &[ChatMessage], &ChatOptions) -> ProviderResult<ChatResponse> + Send + Sync + 'static,
    {
        self.fallback = Some(Box::new(responder));
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        model: ProviderModelConfig,
        options: ChatOptions,
    ) -> ProviderResult<ChatResponse> {
        let index = {
            let mut requests = self.requests.lock();
            requests.push(RecordedRequest {
                messages: messages.clone(),
                model,
                options: options.clone(),
            });
            requests.len() - 1
        };

        if let Some(logger) = &self.logger {
            logger.debug(&format!("[ScriptedProvider] call #{}", index));
        }

        let next = self.replies.lock().pop_front();
        match next {
            Some(ScriptedReply::Response(response)) => Ok(response),
            Some(ScriptedReply::Error(message)) => Err(ProviderError::api_error("scripted", 500, message)),
            None => match &self.fallback {
                Some(responder) => responder(index, &messages, &options),
                None => Err(ProviderError::Other(format!(
                    "scripted provider has no reply for call #{}",
                    index
                ))),
            },
        }
    }
}
