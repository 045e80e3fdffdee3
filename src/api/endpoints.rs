//! API endpoint handlers
//!
//! This module implements the HTTP endpoints of the RAG service: document
//! upsert, query answering, direct answer extraction, and health checks.

use crate::core::config::Config;
use crate::core::constants::{SERVICE_NAME, VERSION, route};
use crate::core::documents::DocumentError;
use crate::core::rag::{RagError, RagService};
use crate::models::rag::{
    ErrorResponse, LlmMessageResponse, QueryRequest, UpsertRequest, UpsertResponse,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rag: Arc<RagService>,
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(route::ROOT, get(root))
        .route(route::UPSERT, post(upsert_document))
        .route(route::QUERY, post(query))
        .route(route::ANSWER, post(answer))
        .route(route::HEALTH, get(health_check))
        .with_state(state)
}

/// Build a `{"detail": ...}` error response
fn error_response(status: StatusCode, detail: String) -> Response {
    (status, Json(ErrorResponse { detail })).into_response()
}

impl IntoResponse for RagError {
    fn into_response(self) -> Response {
        let status = match &self {
            RagError::Document(DocumentError::NotFound(_)) => StatusCode::NOT_FOUND,
            RagError::Document(DocumentError::InvalidFilename(_)) => StatusCode::BAD_REQUEST,
            RagError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RagError::Document(DocumentError::Read { .. })
            | RagError::Embedding(_)
            | RagError::VectorStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        error_response(status, self.to_string())
    }
}

/// POST /upsert - Chunk, embed and store a document from the data folder
async fn upsert_document(
    State(state): State<AppState>,
    Json(request): Json<UpsertRequest>,
) -> Result<Json<UpsertResponse>, RagError> {
    info!("📥 Upsert request: filename={}", request.filename);

    let outcome = state.rag.upsert_document(&request.filename).await?;

    Ok(Json(UpsertResponse {
        status: "success".to_string(),
        document_id: outcome.document_id,
        chunks: outcome.chunks,
    }))
}

/// POST /query - Retrieve context and ask the LLM
async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<LlmMessageResponse>, RagError> {
    info!("query receive: {}", request.query);

    let top_k = request.top_k.unwrap_or(state.config.default_top_k);
    let llm_message = state.rag.query(&request.query, top_k).await?;

    Ok(Json(LlmMessageResponse { llm_message }))
}

/// POST /answer - Answer from a search result supplied by the caller
async fn answer(State(state): State<AppState>, Json(payload): Json<Value>) -> impl IntoResponse {
    let llm_message = state.rag.answer(&payload).await;
    Json(LlmMessageResponse { llm_message })
}

/// GET / - Root endpoint
async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "message": format!("{} v{}", SERVICE_NAME, VERSION),
        "status": "running",
        "config": {
            "llm_provider": state.rag.provider().provider_name(),
            "llm_model": state.rag.provider().model(),
            "embedding_model": state.rag.embedder().model(),
            "collection": state.rag.store().collection_name(),
            "chunk_size": state.config.chunk_size,
            "chunk_overlap": state.config.chunk_overlap,
            "default_top_k": state.config.default_top_k,
        },
        "endpoints": {
            "upsert": route::UPSERT,
            "query": route::QUERY,
            "answer": route::ANSWER,
            "health": route::HEALTH,
        },
    }))
}

/// GET /health - Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "llm_provider": state.rag.provider().provider_name(),
        "llm_api_key_configured": state.config.validate_api_key(),
        "embedding_model": state.rag.embedder().model(),
        "collection": state.rag.store().collection_name(),
    }))
}
