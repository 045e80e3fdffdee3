//! Constants for service identity and HTTP routes

/// Name reported by the root endpoint and startup banner
pub const SERVICE_NAME: &str = "RAG API - Ollama + Chroma";

/// Crate version reported by the root endpoint
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP route paths
pub mod route {
    /// Service information
    pub const ROOT: &str = "/";

    /// Index a document from the data folder
    pub const UPSERT: &str = "/upsert";

    /// Retrieve context and answer a question
    pub const QUERY: &str = "/query";

    /// Answer from a caller-supplied search result
    pub const ANSWER: &str = "/answer";

    /// Liveness and configuration summary
    pub const HEALTH: &str = "/health";
}
