//! RAG API data models
//!
//! Request and response bodies for the HTTP endpoints, plus the metadata
//! stored alongside every chunk.

use crate::models::chroma::Metadata;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// POST /upsert request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertRequest {
    pub filename: String,
}

/// POST /upsert response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertResponse {
    pub status: String,
    pub document_id: String,
    pub chunks: usize,
}

/// POST /query request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Number of chunks to retrieve; falls back to `[request] default_top_k`
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// POST /query and POST /answer response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMessageResponse {
    pub llm_message: String,
}

/// Error body, `{"detail": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Metadata stored with each chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub filename: String,
    pub doc_id: String,
    pub chunk_index: usize,
}

impl ChunkMetadata {
    pub fn to_metadata(&self) -> Metadata {
        let mut map = Metadata::new();
        map.insert("filename".into(), Value::String(self.filename.clone()));
        map.insert("doc_id".into(), Value::String(self.doc_id.clone()));
        map.insert("chunk_index".into(), Value::from(self.chunk_index));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_top_k_optional() {
        let request: QueryRequest = serde_json::from_str(r#"{"query": "Where?"}"#).unwrap();
        assert_eq!(request.top_k, None);

        let request: QueryRequest =
            serde_json::from_str(r#"{"query": "Where?", "top_k": 3}"#).unwrap();
        assert_eq!(request.top_k, Some(3));
    }

    #[test]
    fn test_chunk_metadata_to_metadata() {
        let metadata = ChunkMetadata {
            filename: "ai.txt".into(),
            doc_id: "abc".into(),
            chunk_index: 4,
        }
        .to_metadata();
        assert_eq!(metadata["filename"], "ai.txt");
        assert_eq!(metadata["doc_id"], "abc");
        assert_eq!(metadata["chunk_index"], 4);
    }
}
