//! API data models
//!
//! This module contains data structures for the RAG endpoints and the
//! external Chroma and OpenAI-compatible APIs.

pub mod chroma;
pub mod openai;
pub mod rag;
