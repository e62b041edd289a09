//! Environment-driven configuration.
//!
//! Everything has a sensible local-first default except provider API keys,
//! which stay optional until the matching provider is actually constructed.
//! A `.env` file in the working directory is honored via dotenvy.

use crate::types::{AppError, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: ProviderConfig,
    pub store: StoreConfig,
    pub rag: RagConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Google API key for Gemini generation and embeddings.
    pub google_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub ollama_url: String,
    /// Generation model, e.g. "gemini-1.5-pro".
    pub generation_model: String,
    /// Embedding model, e.g. "models/embedding-001".
    pub embedding_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Data directory for the embedded store. Empty string keeps it in memory.
    pub index_path: Option<String>,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub chromadb_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub score_threshold: f32,
    /// Default collection for CLI one-shot commands.
    pub collection: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let chunk_size = parse_env("VELLUM_CHUNK_SIZE", 1000)?;
        let chunk_overlap = parse_env("VELLUM_CHUNK_OVERLAP", 200)?;
        if chunk_overlap >= chunk_size {
            return Err(AppError::Configuration(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: parse_env("PORT", 3000)?,
            },
            providers: ProviderConfig {
                google_api_key: non_empty(env::var("GOOGLE_API_KEY").ok()),
                openai_api_key: non_empty(env::var("OPENAI_API_KEY").ok()),
                ollama_url: env::var("OLLAMA_URL")
                    .unwrap_or_else(|_| "http://localhost:11434".to_string()),
                generation_model: env::var("VELLUM_GENERATION_MODEL")
                    .unwrap_or_else(|_| "gemini-1.5-pro".to_string()),
                embedding_model: env::var("VELLUM_EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "models/embedding-001".to_string()),
            },
            store: StoreConfig {
                index_path: non_empty(env::var("VELLUM_INDEX_PATH").ok()),
                qdrant_url: env::var("QDRANT_URL")
                    .unwrap_or_else(|_| "http://localhost:6334".to_string()),
                qdrant_api_key: non_empty(env::var("QDRANT_API_KEY").ok()),
                chromadb_url: env::var("CHROMADB_URL")
                    .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            },
            rag: RagConfig {
                chunk_size,
                chunk_overlap,
                top_k: parse_env("VELLUM_TOP_K", 5)?,
                score_threshold: parse_env("VELLUM_SCORE_THRESHOLD", 0.0)?,
                collection: env::var("VELLUM_COLLECTION")
                    .unwrap_or_else(|_| "documents".to_string()),
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Configuration(format!("Invalid value for {}: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_filters_blank_values() {
        assert_eq!(non_empty(Some("".into())), None);
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some("key".into())), Some("key".to_string()));
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn parse_env_falls_back_to_default() {
        let value: usize = parse_env("VELLUM_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
