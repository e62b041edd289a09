//! Vector store abstraction.
//!
//! One trait over every vector database backend so ingestion and retrieval
//! never care where vectors live:
//!
//! - `EmbeddedStore` - vellum-index, embedded HNSW (default)
//! - `QdrantStore` - external Qdrant server
//! - `ChromaStore` - external ChromaDB server via its REST API
//! - `InMemoryStore` - exact-scan store for tests
//!
//! # Example
//!
//! ```rust,ignore
//! use vellum::store::{VectorStore, VectorStoreProvider};
//!
//! let store = VectorStoreProvider::from_env().create_store().await?;
//! store.create_collection("documents", 768).await?;
//! store.upsert("documents", &documents).await?;
//! let hits = store.search("documents", &query_embedding, 10, 0.25).await?;
//! ```

use crate::types::{AppError, Document, Result, SearchResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for vector store providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Embedded HNSW store backed by vellum-index (default).
    ///
    /// No external process; optional persistence under `path`.
    #[cfg(feature = "embedded-store")]
    Embedded {
        /// Data directory (None for in-memory).
        path: Option<String>,
    },

    /// Qdrant server.
    #[cfg(feature = "qdrant")]
    Qdrant {
        /// Qdrant gRPC URL, e.g. "http://localhost:6334".
        url: String,
        /// Optional API key.
        api_key: Option<String>,
    },

    /// ChromaDB server, spoken over its REST API.
    #[cfg(feature = "chromadb")]
    ChromaDb {
        /// ChromaDB base URL, e.g. "http://localhost:8000".
        url: String,
    },

    /// In-memory exact-scan store for testing.
    InMemory,
}

impl VectorStoreProvider {
    /// Create a vector store instance from this provider configuration.
    pub async fn create_store(&self) -> Result<Box<dyn VectorStore>> {
        match self {
            #[cfg(feature = "embedded-store")]
            VectorStoreProvider::Embedded { path } => {
                let store = super::embedded::EmbeddedStore::new(path.clone()).await?;
                Ok(Box::new(store))
            }

            #[cfg(feature = "qdrant")]
            VectorStoreProvider::Qdrant { url, api_key } => {
                let store = super::qdrant::QdrantStore::new(url.clone(), api_key.clone())?;
                Ok(Box::new(store))
            }

            #[cfg(feature = "chromadb")]
            VectorStoreProvider::ChromaDb { url } => {
                let store = super::chroma::ChromaStore::new(url)?;
                Ok(Box::new(store))
            }

            VectorStoreProvider::InMemory => Ok(Box::new(InMemoryStore::new())),
        }
    }

    /// Pick a provider from environment variables.
    ///
    /// Checked in order: `VELLUM_INDEX_PATH` (embedded, persistent),
    /// `QDRANT_URL`, `CHROMADB_URL`; falls back to the embedded store
    /// in-memory, or `InMemory` when the feature is off.
    pub fn from_env() -> Self {
        #[cfg(feature = "embedded-store")]
        if let Ok(path) = std::env::var("VELLUM_INDEX_PATH") {
            if !path.is_empty() {
                return VectorStoreProvider::Embedded { path: Some(path) };
            }
        }

        #[cfg(feature = "qdrant")]
        if let Ok(url) = std::env::var("QDRANT_URL") {
            if !url.is_empty() {
                let api_key = std::env::var("QDRANT_API_KEY").ok().filter(|k| !k.is_empty());
                return VectorStoreProvider::Qdrant { url, api_key };
            }
        }

        #[cfg(feature = "chromadb")]
        if let Ok(url) = std::env::var("CHROMADB_URL") {
            if !url.is_empty() {
                return VectorStoreProvider::ChromaDb { url };
            }
        }

        #[cfg(feature = "embedded-store")]
        return VectorStoreProvider::Embedded { path: None };

        #[cfg(not(feature = "embedded-store"))]
        VectorStoreProvider::InMemory
    }
}

// ============================================================================
// Collection Info
// ============================================================================

/// Summary of a collection.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CollectionInfo {
    pub name: String,
    pub document_count: usize,
    pub dimensions: usize,
}

/// Statistics about a collection.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CollectionStats {
    pub name: String,
    pub document_count: usize,
    pub dimensions: usize,
    /// Index size in bytes, when the backend can report it.
    pub index_size_bytes: Option<u64>,
    pub distance_metric: String,
}

// ============================================================================
// Vector Store Trait
// ============================================================================

/// Abstract trait for vector database operations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of this backend ("embedded", "qdrant", ...).
    fn provider_name(&self) -> &'static str;

    /// Create a collection for vectors of the given dimensionality.
    ///
    /// # Errors
    ///
    /// Fails if the collection already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a collection and all of its data.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// List all collections.
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    /// Whether a collection exists.
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Statistics for one collection.
    async fn collection_stats(&self, name: &str) -> Result<CollectionStats>;

    /// Insert or update documents. Every document must carry an embedding.
    ///
    /// Returns the number of documents written.
    async fn upsert(&self, collection: &str, documents: &[Document]) -> Result<usize>;

    /// Nearest-neighbor search.
    ///
    /// Results are sorted by score descending and filtered by `threshold`.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Delete documents by ID, returning the number actually removed.
    async fn delete(&self, collection: &str, ids: &[String]) -> Result<usize>;

    /// Fetch one document by ID.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Number of documents in a collection.
    async fn count(&self, collection: &str) -> Result<usize> {
        let stats = self.collection_stats(collection).await?;
        Ok(stats.document_count)
    }
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Exact-scan in-memory store. Cosine similarity, no persistence.
pub struct InMemoryStore {
    collections: Arc<RwLock<HashMap<String, InMemoryCollection>>>,
}

struct InMemoryCollection {
    dimensions: usize,
    documents: HashMap<String, Document>,
}

impl InMemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn provider_name(&self) -> &'static str {
        "in-memory"
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(AppError::InvalidInput(format!(
                "Collection '{}' already exists",
                name
            )));
        }
        collections.insert(
            name.to_string(),
            InMemoryCollection {
                dimensions,
                documents: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections
            .write()
            .remove(name)
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}' not found", name)))?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let collections = self.collections.read();
        Ok(collections
            .iter()
            .map(|(name, col)| CollectionInfo {
                name: name.clone(),
                document_count: col.documents.len(),
                dimensions: col.dimensions,
            })
            .collect())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().contains_key(name))
    }

    async fn collection_stats(&self, name: &str) -> Result<CollectionStats> {
        let collections = self.collections.read();
        let col = collections
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}' not found", name)))?;

        Ok(CollectionStats {
            name: name.to_string(),
            document_count: col.documents.len(),
            dimensions: col.dimensions,
            index_size_bytes: None,
            distance_metric: "cosine".to_string(),
        })
    }

    async fn upsert(&self, collection: &str, documents: &[Document]) -> Result<usize> {
        let mut collections = self.collections.write();
        let col = collections
            .get_mut(collection)
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}' not found", collection)))?;

        for doc in documents {
            if doc.embedding.is_none() {
                return Err(AppError::InvalidInput(format!(
                    "Document '{}' is missing embedding",
                    doc.id
                )));
            }
            col.documents.insert(doc.id.clone(), doc.clone());
        }

        Ok(documents.len())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read();
        let col = collections
            .get(collection)
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}' not found", collection)))?;

        let mut results: Vec<SearchResult> = col
            .documents
            .values()
            .filter_map(|doc| {
                let doc_embedding = doc.embedding.as_ref()?;
                let score = Self::cosine_similarity(embedding, doc_embedding);
                (score >= threshold).then(|| SearchResult {
                    document: Document {
                        id: doc.id.clone(),
                        content: doc.content.clone(),
                        metadata: doc.metadata.clone(),
                        embedding: None,
                    },
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);

        Ok(results)
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<usize> {
        let mut collections = self.collections.write();
        let col = collections
            .get_mut(collection)
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}' not found", collection)))?;

        let mut count = 0;
        for id in ids {
            if col.documents.remove(id).is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read();
        let col = collections
            .get(collection)
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}' not found", collection)))?;

        Ok(col.documents.get(id).cloned())
    }
}

// ============================================================================
// Tests
// ============================================================================
