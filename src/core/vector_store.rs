//! Vector database client
//!
//! Stores chunk embeddings in a Chroma collection and runs nearest-neighbor
//! queries against it through Chroma's v2 HTTP API.

use crate::models::chroma::{
    AddRequest, CollectionResponse, CreateCollectionRequest, DeleteRequest, GetRequest,
    GetResponse, Metadata, QueryRequest, QueryResults,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("vector store connection failed: {0}")]
    Connection(String),

    #[error("vector store returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid vector store response: {0}")]
    InvalidResponse(String),

    #[error("invalid records: {0}")]
    InvalidRecords(String),
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Ids of every record whose metadata matches all entries of `filter`
    async fn get_ids_where(&self, filter: &Metadata) -> Result<Vec<String>, VectorStoreError>;

    async fn delete(&self, ids: &[String]) -> Result<(), VectorStoreError>;

    async fn add(
        &self,
        ids: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        documents: Vec<String>,
        metadatas: Vec<Metadata>,
    ) -> Result<(), VectorStoreError>;

    async fn query(
        &self,
        query_embeddings: Vec<Vec<f32>>,
        n_results: usize,
    ) -> Result<QueryResults, VectorStoreError>;

    fn collection_name(&self) -> &str;
}

/// Connection settings for a Chroma server
#[derive(Debug, Clone)]
pub struct ChromaSettings {
    pub base_url: String,
    pub tenant: String,
    pub database: String,
    pub collection: String,
    /// HNSW distance function: cosine, l2 or ip
    pub distance: String,
    pub timeout: u64,
}

pub struct ChromaStore {
    client: Client,
    collection_url: String,
    collection_name: String,
}

/// Fields requested from every query
const QUERY_INCLUDE: [&str; 3] = ["metadatas", "documents", "distances"];

impl ChromaStore {
    /// Connect to Chroma and get or create the configured collection
    pub async fn connect(settings: &ChromaSettings) -> Result<Self, VectorStoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout))
            .build()
            .map_err(|e| VectorStoreError::Connection(e.to_string()))?;

        let collections_url = collections_url(settings);

        let mut metadata = Metadata::new();
        metadata.insert(
            "hnsw:space".to_string(),
            Value::String(settings.distance.clone()),
        );

        let collection: CollectionResponse = post_json(
            &client,
            &collections_url,
            &CreateCollectionRequest {
                name: settings.collection.clone(),
                metadata,
                get_or_create: true,
            },
        )
        .await?;

        info!(
            "Using Chroma collection '{}' ({})",
            collection.name, collection.id
        );

        Ok(Self {
            client,
            collection_url: format!("{}/{}", collections_url, collection.id),
            collection_name: collection.name,
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}", self.collection_url, action)
    }
}

fn collections_url(settings: &ChromaSettings) -> String {
    format!(
        "{}/api/v2/tenants/{}/databases/{}/collections",
        settings.base_url.trim_end_matches('/'),
        settings.tenant,
        settings.database
    )
}

/// Check that parallel record arrays line up before sending them
fn check_records(
    ids: &[String],
    embeddings: &[Vec<f32>],
    documents: &[String],
    metadatas: &[Metadata],
) -> Result<(), VectorStoreError> {
    let n = ids.len();
    if embeddings.len() != n || documents.len() != n || metadatas.len() != n {
        return Err(VectorStoreError::InvalidRecords(format!(
            "ids={}, embeddings={}, documents={}, metadatas={}",
            n,
            embeddings.len(),
            documents.len(),
            metadatas.len()
        )));
    }
    Ok(())
}

async fn send_json<B: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    body: &B,
) -> Result<reqwest::Response, VectorStoreError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| VectorStoreError::Connection(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(VectorStoreError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response)
}

async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    client: &Client,
    url: &str,
    body: &B,
) -> Result<T, VectorStoreError> {
    send_json(client, url, body)
        .await?
        .json()
        .await
        .map_err(|e| VectorStoreError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn get_ids_where(&self, filter: &Metadata) -> Result<Vec<String>, VectorStoreError> {
        let response: GetResponse = post_json(
            &self.client,
            &self.endpoint("get"),
            &GetRequest {
                where_filter: Some(filter.clone()),
                include: Vec::new(),
            },
        )
        .await?;
        Ok(response.ids)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), VectorStoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        debug!("Deleting {} records from '{}'", ids.len(), self.collection_name);
        send_json(
            &self.client,
            &self.endpoint("delete"),
            &DeleteRequest { ids: ids.to_vec() },
        )
        .await?;
        Ok(())
    }

    async fn add(
        &self,
        ids: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        documents: Vec<String>,
        metadatas: Vec<Metadata>,
    ) -> Result<(), VectorStoreError> {
        check_records(&ids, &embeddings, &documents, &metadatas)?;
        if ids.is_empty() {
            return Ok(());
        }
        send_json(
            &self.client,
            &self.endpoint("add"),
            &AddRequest {
                ids,
                embeddings,
                documents,
                metadatas,
            },
        )
        .await?;
        Ok(())
    }

    async fn query(
        &self,
        query_embeddings: Vec<Vec<f32>>,
        n_results: usize,
    ) -> Result<QueryResults, VectorStoreError> {
        post_json(
            &self.client,
            &self.endpoint("query"),
            &QueryRequest {
                query_embeddings,
                n_results,
                include: QUERY_INCLUDE.iter().map(|s| s.to_string()).collect(),
            },
        )
        .await
    }

    fn collection_name(&self) -> &str {
        &self.collection_name
    }
}
