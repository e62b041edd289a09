//! # Vellum - a document-native RAG server
//!
//! Vellum ingests PDF and text documents, chunks and embeds them, indexes
//! the vectors in a pluggable store, and answers questions over them with a
//! configurable LLM provider. It runs as an HTTP server, a CLI, or a
//! library.
//!
//! ## Overview
//!
//! The pipeline: document loader → chunker → embedder → vector index →
//! retriever → generator.
//!
//! - **Ingestion** ([`ingest`]) - recursive PDF/text/markdown discovery,
//!   text and metadata extraction, figure/table caption detection
//! - **RAG core** ([`rag`]) - chunking strategies, embedding providers with
//!   an LRU cache, lexical + hybrid retrieval, prompt assembly
//! - **Vector stores** ([`store`]) - embedded HNSW (default), Qdrant,
//!   ChromaDB
//! - **LLM clients** ([`llm`]) - Gemini (default, multimodal), OpenAI,
//!   Ollama
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vellum::rag::{GeminiEmbedder, RagPipeline, TextChunker};
//! use vellum::store::EmbeddedStore;
//! use vellum::llm::{LlmClientFactory, Provider};
//!
//! let chunker = TextChunker::with_word_chunking(200, 50)?;
//! let embedder = Arc::new(GeminiEmbedder::new(api_key.clone(), "models/embedding-001".into())?);
//! let store = Arc::new(EmbeddedStore::new(Some("./data/index".into())).await?);
//! let llm = Provider::Gemini { api_key, model: "gemini-1.5-pro".into() }
//!     .create_client()
//!     .await?;
//!
//! let pipeline = RagPipeline::new(chunker, embedder, store, llm.into());
//! pipeline.ingest_directory("./data/papers", "papers").await?;
//! let answer = pipeline.answer("What is HNSW?", "papers").await?;
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `embedded-store` | Embedded HNSW vector store (default) |
//! | `ollama` | Ollama generation and embeddings (default) |
//! | `openai` | OpenAI generation and embeddings |
//! | `qdrant` | Qdrant vector store |
//! | `chromadb` | ChromaDB vector store over REST |
//! | `local-embeddings` | fastembed ONNX embedding models |
//!
//! Gemini support is always built in; it needs only reqwest.

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Environment-driven configuration.
pub mod config;
/// Document loading, PDF extraction, caption detection.
pub mod ingest;
/// LLM provider clients and abstractions.
pub mod llm;
/// Chunking, embeddings, retrieval, and the pipeline itself.
pub mod rag;
/// Vector store backends.
pub mod store;
/// Core types, API payloads, and error handling.
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use llm::{LlmClient, LlmClientFactory, Provider};
pub use rag::{RagPipeline, TextChunker};
pub use store::{VectorStore, VectorStoreProvider};
pub use types::{AppError, Document, DocumentMetadata, Result};

use std::sync::Arc;

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The assembled RAG pipeline.
    pub pipeline: Arc<RagPipeline>,
    /// Loaded configuration.
    pub config: Arc<Config>,
}
