//! Provider abstraction layer for hosted LLM APIs
//!
//! This module defines the common trait implemented by the Gemini and
//! OpenAI-compatible providers, plus the error type they share.

use async_trait::async_trait;
use thiserror::Error;

/// Error types for provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ProviderError {
    /// Map a non-success HTTP status and classified message to an error
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(message),
            429 => ProviderError::RateLimit(message),
            400 | 404 => ProviderError::BadRequest(message),
            _ => ProviderError::ApiError { status, message },
        }
    }
}

/// Trait for LLM API providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send a single-turn prompt and return the generated text
    ///
    /// `Ok(None)` means the model answered without any text.
    async fn generate_content(&self, prompt: &str) -> Result<Option<String>, ProviderError>;

    /// Get the provider name used in user-facing messages
    fn provider_name(&self) -> &str;

    /// Model identifier sent with every request
    fn model(&self) -> &str;
}

/// Supported provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Gemini,
    OpenAI,
}

impl ProviderType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Some(ProviderType::Gemini),
            "openai" | "openai-compatible" | "openai_compatible" => Some(ProviderType::OpenAI),
            _ => None,
        }
    }

    /// Environment variable consulted when the config omits an API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderType::Gemini => "GEMINI_API_KEY",
            ProviderType::OpenAI => "OPENAI_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderType::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderType::OpenAI => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::Gemini => "gemini-2.5-flash-lite",
            ProviderType::OpenAI => "gpt-4o-mini",
        }
    }
}
