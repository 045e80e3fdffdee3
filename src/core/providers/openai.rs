//! OpenAI-compatible provider implementation
//!
//! Works against api.openai.com as well as gateways that expose the same
//! `/chat/completions` surface (Gemini's OpenAI endpoint, LiteLLM, vLLM).

use crate::core::provider::{Provider, ProviderError};
use crate::models::openai::{
    OpenAIChatCompletionRequest, OpenAIChatCompletionResponse, OpenAIMessage,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, warn};

/// OpenAI provider
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    ///
    /// # Arguments
    ///
    /// * `api_key` - Bearer token for the endpoint
    /// * `base_url` - API base URL, e.g. `https://api.openai.com/v1`
    /// * `model` - Chat model name
    /// * `timeout` - Request timeout in seconds
    /// * `accept_invalid_certs` - Skip TLS verification (self-signed lab gateways)
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: u64,
        accept_invalid_certs: bool,
    ) -> Result<Self, ProviderError> {
        if accept_invalid_certs {
            warn!("TLS certificate verification disabled for {}", base_url);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| ProviderError::Unexpected(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    fn build_request(&self, prompt: &str) -> OpenAIChatCompletionRequest {
        OpenAIChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            max_tokens: None,
            temperature: None,
            stream: false,
        }
    }

    fn extract_text(response: OpenAIChatCompletionResponse) -> Option<String> {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
    }

    /// Classify OpenAI errors and provide helpful messages
    fn classify_error(error_detail: &str) -> String {
        let error_lower = error_detail.to_lowercase();

        if error_lower.contains("unsupported_country_region_territory")
            || error_lower.contains("country, region, or territory not supported")
        {
            return "OpenAI API is not available in your region.".to_string();
        }

        if error_lower.contains("invalid_api_key") || error_lower.contains("unauthorized") {
            return "Invalid API key. Please check the [llm] api_key or OPENAI_API_KEY setting."
                .to_string();
        }

        if error_lower.contains("rate_limit") || error_lower.contains("quota") {
            return "Rate limit exceeded. Please wait and try again, or upgrade your API plan."
                .to_string();
        }

        if error_lower.contains("model")
            && (error_lower.contains("not found") || error_lower.contains("does not exist"))
        {
            return "Model not found. Please check the [llm] model setting.".to_string();
        }

        error_detail.to_string()
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn generate_content(&self, prompt: &str) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| ProviderError::Unexpected(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Chat completion failed with status {}", status);
            return Err(ProviderError::from_status(
                status.as_u16(),
                Self::classify_error(&error_text),
            ));
        }

        let completion: OpenAIChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unexpected(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = &completion.usage {
            debug!(
                "Completion {} usage: prompt_tokens={}, completion_tokens={}",
                completion.id, usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(Self::extract_text(completion))
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
