//! Embedding service client
//!
//! Turns chunk and query text into vectors through an Ollama server.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EmbedderError {
    #[error("embedding api request failed: {0}")]
    ApiRequestFailed(String),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document chunks, one vector per input in order
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Embed a single search query
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    fn model(&self) -> &str;
}

pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    pub fn new(base_url: String, model: String, timeout: u64) -> Result<Self, EmbedderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| EmbedderError::ApiRequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    async fn embed(&self, input: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        let url = format!("{}/api/embed", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input,
            })
            .send()
            .await
            .map_err(|e| EmbedderError::ApiRequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedderError::ApiRequestFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbedderError::InvalidResponse(e.to_string()))?;

        check_batch(input.len(), embed_response.embeddings)
    }
}

/// Reject responses that do not carry one non-empty vector per input
fn check_batch(expected: usize, embeddings: Vec<Vec<f32>>) -> Result<Vec<Vec<f32>>, EmbedderError> {
    if embeddings.len() != expected {
        return Err(EmbedderError::InvalidResponse(format!(
            "expected {} embeddings, got {}",
            expected,
            embeddings.len()
        )));
    }
    if embeddings.iter().any(Vec::is_empty) {
        return Err(EmbedderError::InvalidResponse(
            "empty embedding vector".to_string(),
        ));
    }
    Ok(embeddings)
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding {} chunks with {}", texts.len(), self.model);
        self.embed(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbedderError::InvalidResponse("empty response".to_string()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
