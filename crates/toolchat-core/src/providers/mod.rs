//! Model provider abstractions
//!
//! The orchestrator talks to the hosted model only through [`Provider`]:
//! a full message list plus optional tool catalog in, ordered text and
//! tool-use items out. [`GenaiProvider`] is the network implementation;
//! [`ScriptedProvider`] replays canned responses for tests.

mod traits;
mod error;
mod genai_adapter;
mod genai_provider;
mod scripted;

pub use traits::{ChatOptions, ChatResponse, Provider, ProviderModelConfig, ResponseContent};
pub use error::{ProviderError, ProviderResult};
pub use genai_provider::GenaiProvider;
pub use genai_adapter::{is_genai_native, is_openai_compatible, requires_api_key};
pub use scripted::{RecordedRequest, ScriptedProvider, ScriptedReply};

use std::sync::Arc;

use crate::logging::Logger;

/// Create the provider for a provider id.
///
/// Everything goes through genai; unknown ids are treated as
/// OpenAI-compatible endpoints and need `api_base` in settings.
pub fn create_provider(provider_id: &str, logger: Arc<dyn Logger>) -> Arc<dyn Provider> {
    if !is_genai_native(provider_id) && !is_openai_compatible(provider_id) {
        logger.warn(&format!(
            "[providers] '{}' is not a known provider; treating it as OpenAI-compatible",
            provider_id
        ));
    }
    Arc::new(GenaiProvider::new(provider_id, logger))
}
