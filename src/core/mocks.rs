//! In-memory stand-ins for the external services, used by unit tests

use crate::core::embedder::{Embedder, EmbedderError};
use crate::core::provider::{Provider, ProviderError};
use crate::core::vector_store::{VectorStore, VectorStoreError};
use crate::models::chroma::{Metadata, QueryResults};
use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Embeds every text as a vector of its length and a constant
#[derive(Default)]
pub struct MockEmbedder;

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        Ok(vec![text.len() as f32, 1.0])
    }

    fn model(&self) -> &str {
        "mock-embed"
    }
}

/// Embedder whose backend is always down
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        Err(EmbedderError::ApiRequestFailed("connection refused".into()))
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, EmbedderError> {
        Err(EmbedderError::ApiRequestFailed("connection refused".into()))
    }

    fn model(&self) -> &str {
        "mock-embed"
    }
}

#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: Metadata,
}

/// Vector store that answers queries with records in insertion order
#[derive(Default)]
pub struct MockVectorStore {
    records: Mutex<Vec<StoredRecord>>,
}

impl MockVectorStore {
    pub fn records(&self) -> Vec<StoredRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn get_ids_where(&self, filter: &Metadata) -> Result<Vec<String>, VectorStoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.iter().all(|(k, v)| r.metadata.get(k) == Some(v)))
            .map(|r| r.id.clone())
            .collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), VectorStoreError> {
        self.records
            .lock()
            .unwrap()
            .retain(|r| !ids.contains(&r.id));
        Ok(())
    }

    async fn add(
        &self,
        ids: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        documents: Vec<String>,
        metadatas: Vec<Metadata>,
    ) -> Result<(), VectorStoreError> {
        let mut records = self.records.lock().unwrap();
        for (((id, embedding), document), metadata) in
            ids.into_iter().zip(embeddings).zip(documents).zip(metadatas)
        {
            records.push(StoredRecord {
                id,
                embedding,
                document,
                metadata,
            });
        }
        Ok(())
    }

    async fn query(
        &self,
        query_embeddings: Vec<Vec<f32>>,
        n_results: usize,
    ) -> Result<QueryResults, VectorStoreError> {
        let records = self.records.lock().unwrap();
        let hits: Vec<&StoredRecord> = records.iter().take(n_results).collect();
        let per_query = query_embeddings.len();

        Ok(QueryResults {
            ids: vec![hits.iter().map(|r| r.id.clone()).collect(); per_query],
            embeddings: None,
            documents: Some(vec![
                hits.iter().map(|r| Some(r.document.clone())).collect();
                per_query
            ]),
            uris: None,
            included: vec![
                "metadatas".to_string(),
                "documents".to_string(),
                "distances".to_string(),
            ],
            data: None,
            metadatas: Some(vec![
                hits.iter().map(|r| Some(r.metadata.clone())).collect();
                per_query
            ]),
            distances: Some(vec![hits.iter().map(|_| Some(0.25)).collect(); per_query]),
        })
    }

    fn collection_name(&self) -> &str {
        "mock_collection"
    }
}

enum MockReply {
    Text(Option<String>),
    RateLimited(String),
}

/// LLM provider with a canned reply that records every prompt it receives
pub struct MockProvider {
    reply: MockReply,
    prompts: Mutex<Vec<String>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::answering("mock answer")
    }
}

impl MockProvider {
    pub fn answering(text: &str) -> Self {
        Self {
            reply: MockReply::Text(Some(text.to_string())),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn silent() -> Self {
        Self {
            reply: MockReply::Text(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: MockReply::RateLimited(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn generate_content(&self, prompt: &str) -> Result<Option<String>, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::RateLimited(message) => Err(ProviderError::RateLimit(message.clone())),
        }
    }

    fn provider_name(&self) -> &str {
        "Gemini"
    }

    fn model(&self) -> &str {
        "mock-llm"
    }
}

/// A request captured by [`FakeServer`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Local HTTP server that records every request and replies with canned JSON
pub struct FakeServer {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeServer {
    /// Serve on an ephemeral port; `respond` maps a request path and JSON
    /// body to the reply
    pub async fn spawn<F>(respond: F) -> Self
    where
        F: Fn(&str, &Value) -> (StatusCode, Value) + Clone + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        let app: Router = Router::new().fallback(move |uri: Uri, headers: HeaderMap, body: Bytes| {
            let recorded = recorded.clone();
            let respond = respond.clone();
            async move {
                let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                let (status, reply) = respond(uri.path(), &body);
                recorded.lock().unwrap().push(RecordedRequest {
                    path: uri.path().to_string(),
                    headers,
                    body,
                });
                (status, Json(reply))
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { url, requests }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}
