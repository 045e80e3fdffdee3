//! Core application modules
//!
//! This module contains configuration, logging, the external service
//! clients, and the RAG pipeline built on top of them.

pub mod config;
pub mod constants;
pub mod documents;
pub mod embedder;
pub mod logging;
pub mod provider;
pub mod providers;
pub mod rag;
pub mod splitter;
pub mod vector_store;

#[cfg(test)]
pub mod mocks;
