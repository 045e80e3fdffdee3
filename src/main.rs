//! Retrieval-Augmented-Generation API
//!
//! Indexes documents from a data folder into a Chroma collection using
//! Ollama embeddings, and answers questions by handing the nearest chunks to
//! a hosted LLM.

mod api;
mod core;
mod models;

use crate::api::endpoints::{AppState, create_router};
use crate::core::config::Config;
use crate::core::constants::{SERVICE_NAME, VERSION};
use crate::core::embedder::OllamaEmbedder;
use crate::core::logging::init_logging;
use crate::core::provider::{Provider, ProviderType};
use crate::core::providers::{GeminiProvider, OpenAIProvider};
use crate::core::rag::RagService;
use crate::core::splitter::RecursiveCharacterSplitter;
use crate::core::vector_store::{ChromaSettings, ChromaStore};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Check for --help flag
    if std::env::args().any(|arg| arg == "--help") {
        print_help();
        return;
    }

    // API keys may live in .env
    dotenv::dotenv().ok();

    let config = match Config::from_env() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            eprintln!("Configuration Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.log_level);

    print_startup_banner(&config);

    if !config.validate_api_key() {
        error!(
            "No API key configured for provider {:?}; set [llm] api_key or {}",
            config.provider,
            config.provider.api_key_env()
        );
        std::process::exit(1);
    }

    if !config.data_folder.is_dir() {
        warn!(
            "Data folder {} does not exist; upserts will fail until it is created",
            config.data_folder.display()
        );
    }

    let rag = match build_rag_service(&config).await {
        Ok(rag) => Arc::new(rag),
        Err(e) => {
            error!("Failed to initialise RAG pipeline: {:#}", e);
            std::process::exit(1);
        }
    };

    info!("Using provider: {}", rag.provider().provider_name());

    let app = create_router(AppState {
        config: config.clone(),
        rag,
    });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Wire the splitter, embedder, vector store and LLM provider together
async fn build_rag_service(config: &Config) -> anyhow::Result<RagService> {
    let splitter = RecursiveCharacterSplitter::new(config.chunk_size, config.chunk_overlap)?;

    let embedder = Arc::new(OllamaEmbedder::new(
        config.embedding_base_url.clone(),
        config.embedding_model.clone(),
        config.request_timeout,
    )?);

    let store = Arc::new(
        ChromaStore::connect(&ChromaSettings {
            base_url: config.chroma_url.clone(),
            tenant: config.chroma_tenant.clone(),
            database: config.chroma_database.clone(),
            collection: config.collection_name.clone(),
            distance: config.distance_metric.clone(),
            timeout: config.request_timeout,
        })
        .await?,
    );

    let provider: Arc<dyn Provider> = match config.provider {
        ProviderType::Gemini => Arc::new(GeminiProvider::new(
            config.llm_api_key.clone(),
            config.llm_base_url.clone(),
            config.llm_model.clone(),
            config.request_timeout,
        )?),
        ProviderType::OpenAI => Arc::new(OpenAIProvider::new(
            config.llm_api_key.clone(),
            config.llm_base_url.clone(),
            config.llm_model.clone(),
            config.request_timeout,
            config.accept_invalid_certs,
        )?),
    };

    Ok(RagService::new(
        config.data_folder.clone(),
        splitter,
        embedder,
        store,
        provider,
    ))
}

/// Print startup banner with configuration
fn print_startup_banner(config: &Config) {
    println!("🚀 {} v{}", SERVICE_NAME, VERSION);
    println!("✅ Configuration loaded successfully");
    println!("   LLM Provider: {:?}", config.provider);
    println!("   LLM Model: {}", config.llm_model);
    println!("   LLM Base URL: {}", config.llm_base_url);
    println!(
        "   Embedding: {} @ {}",
        config.embedding_model, config.embedding_base_url
    );
    println!(
        "   Vector Store: {} @ {} ({})",
        config.collection_name, config.chroma_url, config.distance_metric
    );
    println!("   Data Folder: {}", config.data_folder.display());
    println!(
        "   Chunking: size={} overlap={}",
        config.chunk_size, config.chunk_overlap
    );
    println!("   Default top_k: {}", config.default_top_k);
    println!("   Request Timeout: {}s", config.request_timeout);
    println!("   Server: {}:{}", config.host, config.port);
    println!();
}

/// Print help message
fn print_help() {
    println!("{} v{}", SERVICE_NAME, VERSION);
    println!();
    println!("Usage: ragline [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --help    Display this help message");
    println!();
    println!("Configuration is read from CONFIG_PATH (default: config.toml).");
    println!("Without a config file built-in defaults are used.");
    println!();
    println!("Sections:");
    println!("  [server]        host (0.0.0.0), port (8082), log_level (info)");
    println!("  [data]          folder (./data)");
    println!("  [chunking]      chunk_size (500), chunk_overlap (50)");
    println!("  [embedding]     base_url (http://localhost:11434), model (nomic-embed-text)");
    println!("  [vector_store]  base_url (http://localhost:8000), tenant, database,");
    println!("                  collection (rag_collection), distance (cosine)");
    println!("  [llm]           provider (gemini | openai), api_key, base_url, model,");
    println!("                  accept_invalid_certs (false)");
    println!("  [request]       request_timeout (90), default_top_k (1)");
    println!();
    println!("Environment variables:");
    println!("  CONFIG_PATH     - Path to the TOML configuration file");
    println!("  GEMINI_API_KEY  - Gemini API key when [llm] api_key is unset");
    println!("  OPENAI_API_KEY  - OpenAI-compatible API key when [llm] api_key is unset");
    println!("  RUST_LOG        - Overrides the configured log level");
    println!();
    println!("Endpoints:");
    println!("  POST /upsert    {{\"filename\": \"doc.txt\"}}");
    println!("  POST /query     {{\"query\": \"...\", \"top_k\": 1}}");
    println!("  POST /answer    {{\"results\": {{...}}, \"query\": \"...\"}}");
    println!("  GET  /health");
}
