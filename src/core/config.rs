//! Application configuration management
//!
//! This module loads and validates configuration from a TOML file. Every
//! section is optional; missing values fall back to defaults that match a
//! local Ollama + Chroma setup with Gemini answering. All configuration is
//! validated at startup.

use crate::core::provider::ProviderType;
use crate::core::splitter::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT: u64 = 90;

/// Default server port
const DEFAULT_PORT: u16 = 8082;

/// Default number of chunks retrieved per query
const DEFAULT_TOP_K: usize = 1;

/// Distance functions Chroma's HNSW index understands
const DISTANCE_METRICS: [&str; 3] = ["cosine", "l2", "ip"];

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_folder")]
    pub folder: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            folder: default_data_folder(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_chroma_url")]
    pub base_url: String,
    #[serde(default = "default_tenant")]
    pub tenant: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_distance")]
    pub distance: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_chroma_url(),
            tenant: default_tenant(),
            database: default_database(),
            collection: default_collection(),
            distance: default_distance(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            base_url: None,
            model: None,
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            default_top_k: default_top_k(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_folder() -> PathBuf {
    PathBuf::from("./data")
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_chroma_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_tenant() -> String {
    "default_tenant".to_string()
}

fn default_database() -> String {
    "default_database".to_string()
}

fn default_collection() -> String {
    "rag_collection".to_string()
}

fn default_distance() -> String {
    "cosine".to_string()
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub request: RequestConfig,
}

/// Application configuration
///
/// Loaded and validated once at startup so a misconfigured service fails
/// before it binds its port.
#[derive(Debug, Clone)]
pub struct Config {
    /// LLM provider answering queries
    pub provider: ProviderType,

    /// LLM API key, from the config file or the provider's env variable
    pub llm_api_key: String,

    /// LLM API base URL
    pub llm_base_url: String,

    /// LLM model name
    pub llm_model: String,

    /// Skip TLS verification for the LLM endpoint
    pub accept_invalid_certs: bool,

    /// Ollama base URL
    pub embedding_base_url: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Chroma server settings
    pub chroma_url: String,
    pub chroma_tenant: String,
    pub chroma_database: String,
    pub collection_name: String,
    pub distance_metric: String,

    /// Folder documents are read from
    pub data_folder: PathBuf,

    /// Splitter settings, in characters
    pub chunk_size: usize,
    pub chunk_overlap: usize,

    /// Server host address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Logging level
    pub log_level: String,

    /// Timeout for every outbound request, in seconds
    pub request_timeout: u64,

    /// Chunks retrieved when a query omits `top_k`
    pub default_top_k: usize,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, or if any value
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read configuration file")?;
        Self::from_toml_str(&content, |key| std::env::var(key).ok())
    }

    /// Load configuration from the path in `CONFIG_PATH` (default `config.toml`)
    ///
    /// When `CONFIG_PATH` is unset and `config.toml` does not exist, built-in
    /// defaults are used.
    pub fn from_env() -> Result<Self> {
        match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::from_file(path),
            Err(_) if Path::new("config.toml").exists() => Self::from_file("config.toml"),
            Err(_) => Self::from_toml_str("", |key| std::env::var(key).ok()),
        }
    }

    /// Parse and validate configuration text
    ///
    /// `env` resolves environment variables; the provider's API key variable
    /// is consulted when `[llm] api_key` is absent.
    pub fn from_toml_str<F>(content: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config: TomlConfig =
            toml::from_str(content).context("Failed to parse TOML configuration")?;

        let provider = ProviderType::from_str(&config.llm.provider)
            .context("Invalid llm.provider value. Must be one of: gemini, openai")?;

        let llm_api_key = config
            .llm
            .api_key
            .filter(|key| !key.is_empty())
            .or_else(|| env(provider.api_key_env()))
            .unwrap_or_default();

        if config.chunking.chunk_size == 0 {
            bail!("chunking.chunk_size must be greater than zero");
        }
        if config.chunking.chunk_overlap > config.chunking.chunk_size {
            bail!(
                "chunking.chunk_overlap ({}) must not exceed chunking.chunk_size ({})",
                config.chunking.chunk_overlap,
                config.chunking.chunk_size
            );
        }
        if config.request.default_top_k == 0 {
            bail!("request.default_top_k must be at least 1");
        }
        let distance = config.vector_store.distance.to_lowercase();
        if !DISTANCE_METRICS.contains(&distance.as_str()) {
            bail!(
                "Invalid vector_store.distance '{}'. Must be one of: cosine, l2, ip",
                config.vector_store.distance
            );
        }

        Ok(Config {
            provider,
            llm_api_key,
            llm_base_url: config
                .llm
                .base_url
                .unwrap_or_else(|| provider.default_base_url().to_string()),
            llm_model: config
                .llm
                .model
                .unwrap_or_else(|| provider.default_model().to_string()),
            accept_invalid_certs: config.llm.accept_invalid_certs,
            embedding_base_url: config.embedding.base_url,
            embedding_model: config.embedding.model,
            chroma_url: config.vector_store.base_url,
            chroma_tenant: config.vector_store.tenant,
            chroma_database: config.vector_store.database,
            collection_name: config.vector_store.collection,
            distance_metric: distance,
            data_folder: config.data.folder,
            chunk_size: config.chunking.chunk_size,
            chunk_overlap: config.chunking.chunk_overlap,
            host: config.server.host,
            port: config.server.port,
            log_level: config.server.log_level,
            request_timeout: config.request.request_timeout,
            default_top_k: config.request.default_top_k,
        })
    }

    /// Check that the LLM API key is present
    ///
    /// For OpenAI-compatible gateways an empty key is tolerated when a custom
    /// base URL is configured, since local servers often need none.
    pub fn validate_api_key(&self) -> bool {
        match self.provider {
            ProviderType::Gemini => !self.llm_api_key.is_empty(),
            ProviderType::OpenAI => {
                !self.llm_api_key.is_empty()
                    || self.llm_base_url != ProviderType::OpenAI.default_base_url()
            }
        }
    }
}
