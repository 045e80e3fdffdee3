//! Retrieval-augmented generation pipeline
//!
//! Upserting a document runs read → split → embed → store. Answering a query
//! runs embed → nearest-neighbor search → context assembly → LLM call.
//! Answer extraction never fails: every problem is reported as a message
//! string in place of the answer.

use crate::core::documents::{self, DocumentError};
use crate::core::embedder::{Embedder, EmbedderError};
use crate::core::provider::Provider;
use crate::core::splitter::RecursiveCharacterSplitter;
use crate::core::vector_store::{VectorStore, VectorStoreError};
use crate::models::chroma::{Metadata, QueryResults};
use crate::models::rag::ChunkMetadata;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RagError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("embedding: {0}")]
    Embedding(#[from] EmbedderError),

    #[error("vector store: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("{0}")]
    InvalidRequest(String),
}

/// Reasons the answer step cannot build a prompt
///
/// The display strings are returned to clients verbatim.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnswerInputError {
    #[error("Invalid input: 'results' field missing.")]
    MissingResults,

    #[error("Invalid input: 'documents' field missing.")]
    MissingDocuments,

    #[error("Invalid input: 'query' field missing.")]
    MissingQuery,

    #[error("No documents found.")]
    NoDocuments,

    #[error("No document chunks available to answer the query.")]
    NoChunks,

    #[error("Unhandled error: {0}")]
    Malformed(String),
}

/// Result of indexing one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub document_id: String,
    pub chunks: usize,
}

pub struct RagService {
    data_folder: PathBuf,
    splitter: RecursiveCharacterSplitter,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn Provider>,
}

impl RagService {
    pub fn new(
        data_folder: PathBuf,
        splitter: RecursiveCharacterSplitter,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn Provider>,
    ) -> Self {
        Self {
            data_folder,
            splitter,
            embedder,
            store,
            provider,
        }
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    /// Index `filename`, replacing any chunks previously stored for it
    pub async fn upsert_document(&self, filename: &str) -> Result<UpsertOutcome, RagError> {
        let raw_text = documents::read_file(&self.data_folder, filename).await?;
        let chunks = self.splitter.split_text(&raw_text);
        let document_id = Uuid::new_v4().to_string();

        let mut filter = Metadata::new();
        filter.insert("filename".to_string(), Value::String(filename.to_string()));
        let existing = self.store.get_ids_where(&filter).await?;
        if !existing.is_empty() {
            info!(
                "Removing {} existing chunks for {}",
                existing.len(),
                filename
            );
            self.store.delete(&existing).await?;
        }

        if chunks.is_empty() {
            warn!("{} produced no chunks", filename);
            return Ok(UpsertOutcome {
                document_id,
                chunks: 0,
            });
        }

        let embeddings = self.embedder.embed_documents(&chunks).await?;

        let ids: Vec<String> = (0..chunks.len())
            .map(|i| format!("{}_{}", document_id, i))
            .collect();
        let metadatas: Vec<Metadata> = (0..chunks.len())
            .map(|i| {
                ChunkMetadata {
                    filename: filename.to_string(),
                    doc_id: document_id.clone(),
                    chunk_index: i,
                }
                .to_metadata()
            })
            .collect();

        let count = chunks.len();
        self.store.add(ids, embeddings, chunks, metadatas).await?;

        info!(
            "Indexed {} as {} ({} chunks)",
            filename, document_id, count
        );

        Ok(UpsertOutcome {
            document_id,
            chunks: count,
        })
    }

    /// Fetch the `k` stored chunks nearest to `query`
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<QueryResults, RagError> {
        if k == 0 {
            return Err(RagError::InvalidRequest(
                "top_k must be at least 1".to_string(),
            ));
        }

        let query_vec = self.embedder.embed_query(query).await?;
        let results = self.store.query(vec![query_vec], k).await?;
        debug!(
            "Retrieved {} ids for query",
            results.ids.first().map(Vec::len).unwrap_or(0)
        );
        Ok(results)
    }

    /// Retrieve context for `query` and ask the LLM to answer from it
    pub async fn query(&self, query: &str, top_k: usize) -> Result<String, RagError> {
        let results = self.retrieve(query, top_k).await?;
        let payload = json!({
            "status": "success",
            "results": results,
            "query": query,
        });
        Ok(self.answer(&payload).await)
    }

    /// Answer the query in a search-result payload using only its documents
    ///
    /// `input` has the shape `{"results": {"documents": [[...]], ...}, "query": "..."}`.
    pub async fn answer(&self, input: &Value) -> String {
        let (context, user_query) = match extract_context(input) {
            Ok(parts) => parts,
            Err(e) => return e.to_string(),
        };

        let prompt = build_prompt(&context, &user_query);
        let name = self.provider.provider_name();

        match self.provider.generate_content(&prompt).await {
            Err(e) => {
                warn!("{} call failed: {}", name, e);
                format!("{} API Error: {}", name, e)
            }
            Ok(Some(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => format!("{} returned an empty response.", name),
        }
    }
}

/// Validate a search-result payload and return `(context, query)`
///
/// Only the chunks retrieved for the first query embedding are used.
pub fn extract_context(input: &Value) -> Result<(String, String), AnswerInputError> {
    let results = input
        .get("results")
        .ok_or(AnswerInputError::MissingResults)?;
    let results = results.as_object().ok_or_else(|| {
        AnswerInputError::Malformed(format!(
            "expected 'results' to be an object, found {}",
            json_type(results)
        ))
    })?;
    let documents = results
        .get("documents")
        .ok_or(AnswerInputError::MissingDocuments)?;
    let query = input.get("query").ok_or(AnswerInputError::MissingQuery)?;

    let documents_list = match documents.as_array() {
        Some(list) if !list.is_empty() => list,
        _ => return Err(AnswerInputError::NoDocuments),
    };

    let doc_chunks = match &documents_list[0] {
        Value::Array(chunks) => chunks,
        other if is_empty_value(other) => return Err(AnswerInputError::NoChunks),
        other => {
            return Err(AnswerInputError::Malformed(format!(
                "expected a list of document chunks, found {}",
                json_type(other)
            )));
        }
    };
    if doc_chunks.is_empty() {
        return Err(AnswerInputError::NoChunks);
    }

    let mut texts = Vec::with_capacity(doc_chunks.len());
    for (i, chunk) in doc_chunks.iter().enumerate() {
        match chunk.as_str() {
            Some(text) => texts.push(text),
            None => {
                return Err(AnswerInputError::Malformed(format!(
                    "sequence item {}: expected str instance, {} found",
                    i,
                    json_type(chunk)
                )));
            }
        }
    }

    let user_query = match query {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    Ok((texts.join("\n\n"), user_query))
}

pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "\nUse ONLY the following context to answer the question.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question:\n\
         {query}\n\
         \n\
         Give the best possible answer strictly based on the context.\n"
    )
}

/// Null, false, zero and empty strings, lists or objects
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mocks::{MockEmbedder, MockProvider, MockVectorStore};

    fn service_with(
        dir: &std::path::Path,
        store: Arc<MockVectorStore>,
        provider: Arc<MockProvider>,
    ) -> RagService {
        RagService::new(
            dir.to_path_buf(),
            RecursiveCharacterSplitter::new(40, 0).unwrap(),
            Arc::new(MockEmbedder::default()),
            store,
            provider,
        )
    }

    fn sample_payload() -> Value {
        json!({
            "status": "success",
            "results": {
                "ids": [["0922824d_2"]],
                "embeddings": null,
                "documents": [[
                    "The field of AI research was founded at a workshop held on the campus of Dartmouth College in 1956."
                ]],
                "uris": null,
                "included": ["metadatas", "documents", "distances"],
                "data": null,
                "metadatas": [[{"chunk_index": 2, "filename": "ai.txt", "doc_id": "0922824d"}]],
                "distances": [[0.3447432518005371]]
            },
            "query": "Where was The field of AI research founded?"
        })
    }

    #[test]
    fn test_build_prompt_layout() {
        let prompt = build_prompt("chunk one\n\nchunk two", "Why?");
        assert_eq!(
            prompt,
            "\nUse ONLY the following context to answer the question.\n\nContext:\nchunk one\n\nchunk two\n\nQuestion:\nWhy?\n\nGive the best possible answer strictly based on the context.\n"
        );
    }

    #[test]
    fn test_extract_context_validation_order() {
        assert_eq!(
            extract_context(&json!({"query": "q"})).unwrap_err(),
            AnswerInputError::MissingResults
        );
        assert_eq!(
            extract_context(&json!({"results": {}, "query": "q"})).unwrap_err(),
            AnswerInputError::MissingDocuments
        );
        assert_eq!(
            extract_context(&json!({"results": {"documents": [["a"]]}})).unwrap_err(),
            AnswerInputError::MissingQuery
        );
    }

    #[test]
    fn test_extract_context_empty_documents() {
        for documents in [json!(null), json!([]), json!("text")] {
            let input = json!({"results": {"documents": documents}, "query": "q"});
            assert_eq!(
                extract_context(&input).unwrap_err(),
                AnswerInputError::NoDocuments
            );
        }

        for first in [json!([]), json!(null), json!(""), json!(0), json!(false), json!({})] {
            let input = json!({"results": {"documents": [first]}, "query": "q"});
            assert_eq!(
                extract_context(&input).unwrap_err(),
                AnswerInputError::NoChunks
            );
        }
    }

    #[test]
    fn test_extract_context_results_not_object() {
        for results in [json!(null), json!([]), json!("documents")] {
            let input = json!({"results": results, "query": "q"});
            let err = extract_context(&input).unwrap_err();
            assert!(matches!(err, AnswerInputError::Malformed(_)));
            assert!(err.to_string().starts_with("Unhandled error: "));
        }
    }

    #[test]
    fn test_extract_context_non_empty_scalar_chunks() {
        let input = json!({"results": {"documents": ["text"]}, "query": "q"});
        let err = extract_context(&input).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unhandled error: expected a list of document chunks, found str"
        );
    }

    #[test]
    fn test_extract_context_non_string_chunk() {
        let input = json!({"results": {"documents": [["ok", null]]}, "query": "q"});
        let err = extract_context(&input).unwrap_err();
        assert!(err.to_string().starts_with("Unhandled error: "));
    }

    #[test]
    fn test_extract_context_uses_first_query_only() {
        let input = json!({
            "results": {"documents": [["a", "b"], ["c"]]},
            "query": "q"
        });
        let (context, query) = extract_context(&input).unwrap();
        assert_eq!(context, "a\n\nb");
        assert_eq!(query, "q");
    }

    #[tokio::test]
    async fn test_answer_returns_trimmed_text_and_sends_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::answering("  Dartmouth College.\n"));
        let service = service_with(dir.path(), Arc::default(), provider.clone());

        let answer = service.answer(&sample_payload()).await;
        assert_eq!(answer, "Dartmouth College.");

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("campus of Dartmouth College in 1956."));
        assert!(prompts[0].contains("Question:\nWhere was The field of AI research founded?"));
    }

    #[tokio::test]
    async fn test_answer_reports_provider_errors() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::failing("quota exhausted"));
        let service = service_with(dir.path(), Arc::default(), provider);

        let answer = service.answer(&sample_payload()).await;
        assert_eq!(answer, "Gemini API Error: Rate limit exceeded: quota exhausted");
    }

    #[tokio::test]
    async fn test_answer_reports_empty_response() {
        let dir = tempfile::tempdir().unwrap();
        for provider in [MockProvider::silent(), MockProvider::answering("   ")] {
            let service = service_with(dir.path(), Arc::default(), Arc::new(provider));
            let answer = service.answer(&sample_payload()).await;
            assert_eq!(answer, "Gemini returned an empty response.");
        }
    }

    #[tokio::test]
    async fn test_answer_skips_provider_on_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::answering("unused"));
        let service = service_with(dir.path(), Arc::default(), provider.clone());

        let answer = service.answer(&json!({"query": "q"})).await;
        assert_eq!(answer, "Invalid input: 'results' field missing.");
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_stores_chunks_with_metadata() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ai.txt"),
            "AI research began in 1956.\n\nDartmouth hosted the workshop.",
        )
        .unwrap();
        let store = Arc::new(MockVectorStore::default());
        let service = service_with(dir.path(), store.clone(), Arc::new(MockProvider::default()));

        let outcome = service.upsert_document("ai.txt").await.unwrap();
        assert_eq!(outcome.chunks, 2);

        let records = store.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, format!("{}_0", outcome.document_id));
        assert_eq!(records[1].id, format!("{}_1", outcome.document_id));
        assert_eq!(records[0].document, "AI research began in 1956.");
        assert_eq!(records[0].embedding, vec![26.0, 1.0]);
        assert_eq!(records[1].metadata["filename"], "ai.txt");
        assert_eq!(records[1].metadata["doc_id"], outcome.document_id.as_str());
        assert_eq!(records[1].metadata["chunk_index"], 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_previous_chunks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ai.txt"), "first version").unwrap();
        std::fs::write(dir.path().join("other.txt"), "unrelated").unwrap();
        let store = Arc::new(MockVectorStore::default());
        let service = service_with(dir.path(), store.clone(), Arc::new(MockProvider::default()));

        let first = service.upsert_document("ai.txt").await.unwrap();
        service.upsert_document("other.txt").await.unwrap();
        std::fs::write(dir.path().join("ai.txt"), "second version").unwrap();
        let second = service.upsert_document("ai.txt").await.unwrap();

        assert_ne!(first.document_id, second.document_id);
        let records = store.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.metadata["doc_id"] != first.document_id.as_str()));
        assert!(records.iter().any(|r| r.document == "second version"));
        assert!(records.iter().any(|r| r.document == "unrelated"));
    }

    #[tokio::test]
    async fn test_upsert_empty_file_clears_old_chunks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ai.txt"), "content").unwrap();
        let store = Arc::new(MockVectorStore::default());
        let service = service_with(dir.path(), store.clone(), Arc::new(MockProvider::default()));

        service.upsert_document("ai.txt").await.unwrap();
        std::fs::write(dir.path().join("ai.txt"), "  \n").unwrap();
        let outcome = service.upsert_document("ai.txt").await.unwrap();

        assert_eq!(outcome.chunks, 0);
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(dir.path(), Arc::default(), Arc::new(MockProvider::default()));

        let err = service.upsert_document("nope.txt").await.unwrap_err();
        assert!(matches!(err, RagError::Document(DocumentError::NotFound(_))));
        assert!(err.to_string().starts_with("File not found: "));
    }

    #[tokio::test]
    async fn test_query_round_trip_through_store() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ai.txt"), "Dartmouth hosted the 1956 workshop.").unwrap();
        let provider = Arc::new(MockProvider::answering("At Dartmouth."));
        let service = service_with(dir.path(), Arc::default(), provider.clone());

        service.upsert_document("ai.txt").await.unwrap();
        let results = service.retrieve("Where?", 1).await.unwrap();
        assert_eq!(results.ids[0].len(), 1);

        let answer = service.query("Where?", 1).await.unwrap();
        assert_eq!(answer, "At Dartmouth.");
        assert!(provider.prompts()[0].contains("Dartmouth hosted the 1956 workshop."));
    }

    #[tokio::test]
    async fn test_query_with_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(MockProvider::answering("unused"));
        let service = service_with(dir.path(), Arc::default(), provider.clone());

        let answer = service.query("Where?", 3).await.unwrap();
        assert_eq!(answer, "No document chunks available to answer the query.");
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_rejects_zero_k() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(dir.path(), Arc::default(), Arc::new(MockProvider::default()));

        let err = service.retrieve("Where?", 0).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidRequest(_)));
    }
}
