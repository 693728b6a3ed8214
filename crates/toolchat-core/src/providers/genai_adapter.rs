//! Adapter between toolchat types and genai types
//!
//! Auth never goes through genai's own env-var lookup: the key arrives
//! already resolved in [`ProviderModelConfig`] (settings first, then the
//! provider's environment variable).

use std::future::Future;
use std::pin::Pin;

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatRequest as GenaiRequest,
    ChatResponse as GenaiResponse, ContentPart as GenaiPart, Tool as GenaiTool,
    ToolCall as GenaiToolCall,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};

use crate::types::{ChatMessage, MessageRole, Tool, ToolCall};

use super::traits::{ChatOptions, ChatResponse, ProviderModelConfig, ResponseContent};

// ============================================================================
// Request Conversion: toolchat -> genai
// ============================================================================

/// Convert a model-facing message; text blocks are joined with newlines
pub fn to_genai_message(msg: &ChatMessage) -> GenaiMessage {
    let text = msg.joined_text();
    match msg.role {
        MessageRole::System => GenaiMessage::system(text),
        MessageRole::User => GenaiMessage::user(text),
        MessageRole::Assistant => GenaiMessage::assistant(text),
    }
}

pub fn to_genai_tool(tool: &Tool) -> GenaiTool {
    GenaiTool::new(&tool.name)
        .with_description(&tool.description)
        .with_schema(tool.input_schema.clone())
}

/// Build the genai request. Tool metadata is attached only when tools are
/// offered; genai lets the model choose among attached tools ("auto").
pub fn to_genai_request(messages: &[ChatMessage], options: &ChatOptions) -> GenaiRequest {
    let mut request = GenaiRequest::new(messages.iter().map(to_genai_message).collect());

    if let Some(tools) = options.tools.as_ref().filter(|t| !t.is_empty()) {
        request = request.with_tools(tools.iter().map(to_genai_tool).collect::<Vec<_>>());
    }

    request
}

pub fn to_genai_options(options: &ChatOptions) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default();

    if let Some(max_tokens) = options.max_tokens {
        genai_opts = genai_opts.with_max_tokens(max_tokens);
    }

    genai_opts
}

// ============================================================================
// Response Conversion: genai -> toolchat
// ============================================================================

pub fn from_genai_tool_call(tc: &GenaiToolCall) -> ToolCall {
    ToolCall {
        id: tc.call_id.clone(),
        name: tc.fn_name.clone(),
        input: tc.fn_arguments.clone(),
    }
}

/// Model output in the order the model produced it
pub fn from_genai_response(response: GenaiResponse) -> ChatResponse {
    from_genai_parts(response.content.into_parts())
}

/// Keep text and tool-call parts in order; reasoning signatures, binary
/// payloads and tool responses are not model output for the loop.
pub fn from_genai_parts(parts: Vec<GenaiPart>) -> ChatResponse {
    let content = parts
        .into_iter()
        .filter_map(|part| match part {
            GenaiPart::Text(text) if !text.is_empty() => Some(ResponseContent::Text(text)),
            GenaiPart::ToolCall(call) => Some(ResponseContent::ToolUse(from_genai_tool_call(&call))),
            _ => None,
        })
        .collect();

    ChatResponse { content }
}

// ============================================================================
// Provider Resolution
// ============================================================================

/// Strip an optional "provider/" prefix ("openai/gpt-4o" -> "gpt-4o")
pub fn model_name(model: &str) -> &str {
    model.split_once('/').map(|(_, name)| name).unwrap_or(model)
}

/// Providers genai speaks natively
pub fn is_genai_native(provider: &str) -> bool {
    matches!(
        provider.to_lowercase().as_str(),
        "openai"
            | "anthropic"
            | "gemini"
            | "ollama"
            | "groq"
            | "xai"
            | "deepseek"
            | "cohere"
            | "fireworks"
            | "together"
    )
}

/// Providers reached through genai's OpenAI adapter at a fixed or custom endpoint
pub fn is_openai_compatible(provider: &str) -> bool {
    matches!(
        provider.to_lowercase().as_str(),
        "azure" | "openrouter" | "mistral" | "custom"
    )
}

/// Whether a key must be present before calling out
pub fn requires_api_key(provider: &str) -> bool {
    !matches!(provider.to_lowercase().as_str(), "ollama" | "custom")
}

/// Create a genai client that authenticates with `config.api_key` and
/// honours `config.api_base`.
pub fn create_client(provider: &str, config: &ProviderModelConfig) -> Client {
    let explicit_key = config.api_key.clone();

    let auth_resolver = AuthResolver::from_resolver_async_fn(
        move |_model_iden: ModelIden| -> Pin<Box<dyn Future<Output = genai::resolver::Result<Option<AuthData>>> + Send>> {
            let key = explicit_key.clone();
            Box::pin(async move { Ok(key.map(AuthData::from_single)) })
        },
    );

    let target_provider = provider.to_lowercase();
    let target_api_base = config.api_base.clone();

    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let fixed = match target_provider.as_str() {
                "openrouter" => Some("https://openrouter.ai/api/v1/"),
                "mistral" => Some("https://api.mistral.ai/v1/"),
                _ => None,
            };

            let endpoint = match (target_api_base.as_ref(), fixed) {
                (Some(base), _) => Endpoint::from_owned(base.clone()),
                (None, Some(url)) => Endpoint::from_static(url),
                (None, None) => return Ok(target),
            };

            let model = if is_openai_compatible(&target_provider) {
                ModelIden::new(AdapterKind::OpenAI, target.model.model_name.clone())
            } else {
                target.model.clone()
            };

            Ok(ServiceTarget {
                endpoint,
                auth: target.auth,
                model,
            })
        },
    );

    Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build()
}
