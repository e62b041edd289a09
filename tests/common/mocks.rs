//! Deterministic test doubles for the pipeline's external services.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use vellum::llm::{LlmClient, ModelInfo};
use vellum::rag::EmbeddingProvider;
use vellum::types::Result;

pub const HASH_EMBEDDER_DIMENSIONS: usize = 64;

/// Deterministic bag-of-words embedder.
///
/// Each word hashes into one of 64 buckets; texts sharing words get
/// similar vectors, which is enough signal for retrieval tests without a
/// model.
pub struct HashEmbedder;

fn bucket(word: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    word.to_lowercase().hash(&mut hasher);
    (hasher.finish() as usize) % HASH_EMBEDDER_DIMENSIONS
}

pub fn hash_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; HASH_EMBEDDER_DIMENSIONS];
    for word in text.split_whitespace() {
        vector[bucket(word)] += 1.0;
    }
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embedding(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_embedding(t)).collect())
    }

    fn dimensions(&self) -> usize {
        HASH_EMBEDDER_DIMENSIONS
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}

/// LLM double that returns a canned answer and counts calls.
pub struct EchoLlm {
    pub calls: AtomicUsize,
}

impl EchoLlm {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmClient for EchoLlm {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("mock answer".to_string())
    }

    async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("mock answer".to_string())
    }

    async fn generate_with_history(&self, _messages: &[(String, String)]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("mock answer".to_string())
    }

    async fn stream(
        &self,
        _prompt: &str,
    ) -> Result<Box<dyn futures::Stream<Item = Result<String>> + Send + Unpin>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stream = futures::stream::iter(vec![Ok("mock answer".to_string())]);
        Ok(Box::new(Box::pin(stream)))
    }

    fn model_name(&self) -> &str {
        "echo-model"
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            name: "echo-model".to_string(),
            provider: "test".to_string(),
            supports_streaming: true,
            supports_vision: false,
        }
    }
}

/// A Config with test-friendly defaults, no env access.
pub fn test_config() -> vellum::config::Config {
    vellum::config::Config {
        server: vellum::config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        providers: vellum::config::ProviderConfig {
            google_api_key: Some("test-key".to_string()),
            openai_api_key: None,
            ollama_url: "http://localhost:11434".to_string(),
            generation_model: "gemini-1.5-pro".to_string(),
            embedding_model: "models/embedding-001".to_string(),
        },
        store: vellum::config::StoreConfig {
            index_path: None,
            qdrant_url: "http://localhost:6334".to_string(),
            qdrant_api_key: None,
            chromadb_url: "http://localhost:8000".to_string(),
        },
        rag: vellum::config::RagConfig {
            chunk_size: 50,
            chunk_overlap: 10,
            top_k: 5,
            score_threshold: 0.0,
            collection: "documents".to_string(),
        },
    }
}
