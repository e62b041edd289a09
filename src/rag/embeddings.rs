//! Embedding providers.
//!
//! [`EmbeddingProvider`] abstracts over the supported embedding backends:
//! Gemini's `embedContent` API (default), OpenAI, Ollama, and fastembed's
//! local ONNX models. [`CachedEmbedder`] wraps any provider with the LRU
//! cache from [`super::cache`].

use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::cache::EmbeddingCache;

/// Maps text to fixed-size vectors for similarity search.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Output vector dimensionality.
    fn dimensions(&self) -> usize;

    /// Model identifier, used for cache keys.
    fn model_name(&self) -> &str;
}

// ============================================================================
// Gemini Embeddings
// ============================================================================

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_EMBEDDING_DIMENSIONS: usize = 768;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Gemini embedding client (`models/embedding-001`, 768 dimensions).
pub struct GeminiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

impl GeminiEmbedder {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "Google API key is required. Set GOOGLE_API_KEY or pass a key explicitly"
                    .to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            model,
        })
    }

    /// Point the client at a different API host. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1beta/{}:{}?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            method,
            self.api_key
        )
    }

    async fn post(&self, url: String, body: serde_json::Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "Gemini API error ({}): {}",
                status, text
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({ "content": { "parts": [{ "text": text }] } });
        let response = self.post(self.endpoint("embedContent"), body).await?;

        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Gemini response parse error: {}", e)))?;

        Ok(parsed.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": self.model,
                    "content": { "parts": [{ "text": text }] },
                })
            })
            .collect();

        let body = json!({ "requests": requests });
        let response = self.post(self.endpoint("batchEmbedContents"), body).await?;

        let parsed: BatchEmbedContentsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Gemini response parse error: {}", e)))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Gemini returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }

        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }

    fn dimensions(&self) -> usize {
        GEMINI_EMBEDDING_DIMENSIONS
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// OpenAI Embeddings
// ============================================================================

#[cfg(feature = "openai")]
pub use openai_embedder::OpenAIEmbedder;

#[cfg(feature = "openai")]
mod openai_embedder {
    use super::*;
    use async_openai::{Client, config::OpenAIConfig, types::CreateEmbeddingRequestArgs};

    const OPENAI_EMBEDDING_DIMENSIONS: usize = 1536;

    /// OpenAI embedding client (`text-embedding-3-small` by default).
    pub struct OpenAIEmbedder {
        client: Client<OpenAIConfig>,
        model: String,
    }

    impl OpenAIEmbedder {
        pub fn new(api_key: String, model: String) -> Self {
            let config = OpenAIConfig::new().with_api_key(api_key);
            Self {
                client: Client::with_config(config),
                model,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for OpenAIEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
            embeddings
                .pop()
                .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(texts.to_vec())
                .build()
                .map_err(|e| AppError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| AppError::Embedding(format!("OpenAI API error: {}", e)))?;

            Ok(response.data.into_iter().map(|d| d.embedding).collect())
        }

        fn dimensions(&self) -> usize {
            OPENAI_EMBEDDING_DIMENSIONS
        }

        fn model_name(&self) -> &str {
            &self.model
        }
    }
}

// ============================================================================
// Ollama Embeddings
// ============================================================================

#[cfg(feature = "ollama")]
pub use ollama_embedder::OllamaEmbedder;

#[cfg(feature = "ollama")]
mod ollama_embedder {
    use super::*;
    use ollama_rs::Ollama;
    use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};

    /// Ollama embedding client. Dimensions depend on the pulled model, so
    /// they are supplied by the caller (768 fits `nomic-embed-text`).
    pub struct OllamaEmbedder {
        client: Ollama,
        model: String,
        dimensions: usize,
    }

    impl OllamaEmbedder {
        pub fn new(base_url: String, model: String, dimensions: usize) -> Result<Self> {
            let (host, port) = {
                let without_scheme = base_url.split("://").nth(1).unwrap_or(&base_url);
                let mut parts = without_scheme.split(':');
                let host = parts.next().unwrap_or("localhost").to_string();
                let port = parts
                    .next()
                    .and_then(|p| p.trim_end_matches('/').parse().ok())
                    .unwrap_or(11434);
                (host, port)
            };

            Ok(Self {
                client: Ollama::new(host, port),
                model,
                dimensions,
            })
        }
    }

    #[async_trait]
    impl EmbeddingProvider for OllamaEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
            embeddings
                .pop()
                .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let request = GenerateEmbeddingsRequest::new(
                self.model.clone(),
                EmbeddingsInput::Multiple(texts.to_vec()),
            );

            let response = self
                .client
                .generate_embeddings(request)
                .await
                .map_err(|e| AppError::Embedding(format!("Ollama error: {}", e)))?;

            Ok(response.embeddings)
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        fn model_name(&self) -> &str {
            &self.model
        }
    }
}

// ============================================================================
// Local Embeddings (fastembed)
// ============================================================================

#[cfg(feature = "local-embeddings")]
pub use local_embedder::LocalEmbedder;

#[cfg(feature = "local-embeddings")]
mod local_embedder {
    use super::*;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    const LOCAL_EMBEDDING_DIMENSIONS: usize = 384;
    const LOCAL_MODEL_NAME: &str = "BAAI/bge-small-en-v1.5";

    /// Local ONNX embeddings via fastembed. No network after model download.
    pub struct LocalEmbedder {
        model: std::sync::Mutex<TextEmbedding>,
    }

    impl LocalEmbedder {
        pub fn new() -> Result<Self> {
            let model = TextEmbedding::try_new(
                InitOptions::new(EmbeddingModel::BGESmallENV15).with_show_download_progress(true),
            )
            .map_err(|e| AppError::Embedding(format!("Failed to load local model: {}", e)))?;

            Ok(Self {
                model: std::sync::Mutex::new(model),
            })
        }
    }

    #[async_trait]
    impl EmbeddingProvider for LocalEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
            embeddings
                .pop()
                .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let mut model = self
                .model
                .lock()
                .map_err(|_| AppError::Internal("Embedding model lock poisoned".to_string()))?;
            model
                .embed(texts.to_vec(), None)
                .map_err(|e| AppError::Embedding(format!("Local embedding failed: {}", e)))
        }

        fn dimensions(&self) -> usize {
            LOCAL_EMBEDDING_DIMENSIONS
        }

        fn model_name(&self) -> &str {
            LOCAL_MODEL_NAME
        }
    }
}

// ============================================================================
// Provider Selection
// ============================================================================

/// Pick an embedding provider from configuration.
///
/// Preference order mirrors generation: Gemini when a Google key is
/// present, then Ollama, then local fastembed models.
#[allow(unreachable_code)]
pub fn embedder_from_config(
    config: &crate::config::ProviderConfig,
) -> Result<Arc<dyn EmbeddingProvider>> {
    if let Some(ref key) = config.google_api_key {
        let embedder = GeminiEmbedder::new(key.clone(), config.embedding_model.clone())?;
        return Ok(Arc::new(embedder));
    }

    #[cfg(feature = "ollama")]
    {
        let embedder = OllamaEmbedder::new(
            config.ollama_url.clone(),
            "nomic-embed-text".to_string(),
            768,
        )?;
        return Ok(Arc::new(embedder));
    }

    #[cfg(feature = "local-embeddings")]
    {
        return Ok(Arc::new(LocalEmbedder::new()?));
    }

    Err(AppError::Configuration(
        "No embedding provider available: set GOOGLE_API_KEY or enable the 'ollama' or \
         'local-embeddings' feature"
            .to_string(),
    ))
}

// ============================================================================
// Cached Wrapper
// ============================================================================

/// Wraps a provider with an [`EmbeddingCache`].
pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    cache: Arc<dyn EmbeddingCache>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, cache: Arc<dyn EmbeddingCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = self.cache.compute_key(text, self.inner.model_name());
        if let Some(embedding) = self.cache.get(&key) {
            return Ok(embedding);
        }

        let embedding = self.inner.embed(text).await?;
        self.cache.set(&key, embedding.clone(), None)?;
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self.inner.model_name().to_string();

        // Split into cached hits and texts that still need the provider.
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut pending: Vec<(usize, String)> = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let key = self.cache.compute_key(text, &model);
            match self.cache.get(&key) {
                Some(embedding) => results.push(Some(embedding)),
                None => {
                    results.push(None);
                    pending.push((i, text.clone()));
                }
            }
        }

        if !pending.is_empty() {
            let pending_texts: Vec<String> = pending.iter().map(|(_, t)| t.clone()).collect();
            let fresh = self.inner.embed_batch(&pending_texts).await?;

            if fresh.len() != pending.len() {
                return Err(AppError::Embedding(format!(
                    "Provider returned {} embeddings for {} inputs",
                    fresh.len(),
                    pending.len()
                )));
            }

            for ((index, text), embedding) in pending.into_iter().zip(fresh) {
                let key = self.cache.compute_key(&text, &model);
                self.cache.set(&key, embedding.clone(), None)?;
                results[index] = Some(embedding);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::cache::LruEmbeddingCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic embedder counting provider calls.
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn cached_embedder_hits_cache_on_repeat() {
        let inner = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(LruEmbeddingCache::with_defaults());
        let embedder = CachedEmbedder::new(inner.clone(), cache);

        let first = embedder.embed("hello").await.unwrap();
        let second = embedder.embed("hello").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cached_batch_only_fetches_misses() {
        let inner = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(LruEmbeddingCache::with_defaults());
        let embedder = CachedEmbedder::new(inner.clone(), cache);

        embedder.embed("warm").await.unwrap();

        let batch = embedder
            .embed_batch(&["warm".to_string(), "cold".to_string()])
            .await
            .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], vec![4.0, 1.0]);
        // One call for the warmup, one for the single miss.
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let inner = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(LruEmbeddingCache::with_defaults());
        let embedder = CachedEmbedder::new(inner, cache);

        let batch = embedder
            .embed_batch(&["a".to_string(), "ccc".to_string(), "bb".to_string()])
            .await
            .unwrap();

        assert_eq!(batch[0][0], 1.0);
        assert_eq!(batch[1][0], 3.0);
        assert_eq!(batch[2][0], 2.0);
    }

    #[test]
    fn gemini_embedder_rejects_empty_key() {
        let result = GeminiEmbedder::new("".to_string(), "models/embedding-001".to_string());
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn gemini_endpoint_uses_full_model_path() {
        let embedder =
            GeminiEmbedder::new("k1".to_string(), "models/embedding-001".to_string()).unwrap();
        assert_eq!(
            embedder.endpoint("embedContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/embedding-001:embedContent?key=k1"
        );
    }
}
