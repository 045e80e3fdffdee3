//! Chroma HTTP API data models
//!
//! Request bodies for the collection endpoints and the query result shape,
//! which is forwarded verbatim to the answer step.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata attached to a stored record
pub type Metadata = Map<String, Value>;

/// Body for `POST .../collections` (get-or-create)
#[derive(Debug, Clone, Serialize)]
pub struct CreateCollectionRequest {
    pub name: String,
    pub metadata: Metadata,
    pub get_or_create: bool,
}

/// Collection as returned by the collections endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionResponse {
    pub id: String,
    pub name: String,
}

/// Body for `POST .../collections/{id}/get`
#[derive(Debug, Clone, Serialize)]
pub struct GetRequest {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_filter: Option<Metadata>,
    pub include: Vec<String>,
}

/// Response of `POST .../collections/{id}/get`
#[derive(Debug, Clone, Deserialize)]
pub struct GetResponse {
    #[serde(default)]
    pub ids: Vec<String>,
}

/// Body for `POST .../collections/{id}/delete`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteRequest {
    pub ids: Vec<String>,
}

/// Body for `POST .../collections/{id}/add`
#[derive(Debug, Clone, Serialize)]
pub struct AddRequest {
    pub ids: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    pub documents: Vec<String>,
    pub metadatas: Vec<Metadata>,
}

/// Body for `POST .../collections/{id}/query`
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub query_embeddings: Vec<Vec<f32>>,
    pub n_results: usize,
    pub include: Vec<String>,
}

/// Nearest-neighbor query result
///
/// Every field is a list with one entry per query embedding. Fields that were
/// not requested through `include` come back as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    #[serde(default)]
    pub ids: Vec<Vec<String>>,
    #[serde(default)]
    pub embeddings: Option<Vec<Vec<Vec<f32>>>>,
    #[serde(default)]
    pub documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    pub uris: Option<Vec<Vec<Option<String>>>>,
    #[serde(default, alias = "include")]
    pub included: Vec<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    pub distances: Option<Vec<Vec<Option<f32>>>>,
}
