//! Model-call errors

use thiserror::Error;

/// Failure of an upstream model call.
///
/// Fatal for the `send_message` in flight; the orchestrator never retries.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No API key from settings or environment
    #[error("API key is required for {provider} (set it in settings or {env_var})")]
    MissingApiKey { provider: String, env_var: String },

    /// API request failed
    #[error("{provider} API error ({status}): {message}")]
    ApiError {
        provider: String,
        status: u16,
        message: String,
    },

    /// Rate limited or out of quota
    #[error("{provider} rate limited: {message}")]
    RateLimited { provider: String, message: String },

    /// Response could not be interpreted
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    pub fn api_error(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn missing_api_key(provider: impl Into<String>, env_var: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
            env_var: env_var.into(),
        }
    }

    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Classify a raw client error message by what it mentions
    pub fn from_message(provider: impl Into<String>, message: impl Into<String>) -> Self {
        let provider = provider.into();
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("429") || lower.contains("rate limit") || lower.contains("quota") {
            Self::rate_limited(provider, message)
        } else if lower.contains("401") || lower.contains("unauthorized") || lower.contains("authentication") {
            Self::api_error(provider, 401, message)
        } else {
            Self::api_error(provider, 500, message)
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
