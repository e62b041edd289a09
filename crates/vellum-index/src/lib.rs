//! # vellum-index
//!
//! An embedded, pure-Rust vector database with HNSW approximate
//! nearest-neighbor search. It backs the Vellum RAG server's default vector
//! store, filling the role an external ANN service or FAISS binding would
//! otherwise play, with no native dependencies.
//!
//! - Named collections with fixed dimensionality and a distance metric
//! - Cosine, Euclidean, dot-product, and Manhattan metrics
//! - Thread-safe: lock-free collection map, internally synchronized index
//! - Optional JSON persistence; collections reload on open
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use vellum_index::{Config, DistanceMetric, VectorDb};
//!
//! let db = VectorDb::open(Config::memory()).await?;
//! db.create_collection("documents", 768, DistanceMetric::Cosine).await?;
//! db.insert("documents", "doc1", &embedding, None).await?;
//! let hits = db.search("documents", &query, 10).await?;
//! ```

#![warn(missing_docs)]

pub mod collection;
pub mod config;
pub mod distance;
pub mod error;
pub mod index;
pub mod persistence;
pub mod types;

pub use collection::Collection;
pub use config::{Config, HnswConfig};
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use types::{MetadataValue, SearchResult, VectorId, VectorMetadata};

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The database handle. Cheap to clone; all clones share state.
///
/// Collections live in an `scc::HashMap`, which is safe to touch across
/// `.await` points without holding a guard.
#[derive(Clone)]
pub struct VectorDb {
    inner: Arc<VectorDbInner>,
}

struct VectorDbInner {
    config: Config,
    collections: scc::HashMap<String, Arc<Collection>>,
}

impl VectorDb {
    /// Open a database. Persistent configurations reload their collections
    /// from disk.
    pub async fn open(config: Config) -> Result<Self> {
        let db = Self {
            inner: Arc::new(VectorDbInner {
                config: config.clone(),
                collections: scc::HashMap::new(),
            }),
        };

        if let Some(ref path) = config.data_path {
            db.load_collections(path).await?;
        }

        Ok(db)
    }

    /// Create a collection.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::CollectionExists`] if the name is taken.
    pub async fn create_collection(
        &self,
        name: &str,
        dimensions: usize,
        metric: DistanceMetric,
    ) -> Result<()> {
        info!(name, dimensions, %metric, "creating collection");

        if self.inner.collections.contains(name) {
            return Err(Error::CollectionExists(name.to_string()));
        }

        let collection = Collection::new(
            name.to_string(),
            dimensions,
            metric,
            self.inner.config.hnsw.clone(),
        )?;

        // insert errors if the key appeared concurrently
        if self
            .inner
            .collections
            .insert(name.to_string(), Arc::new(collection))
            .is_err()
        {
            return Err(Error::CollectionExists(name.to_string()));
        }

        if let Some(ref path) = self.inner.config.data_path {
            self.write_collection_manifest(path).await?;
        }

        Ok(())
    }

    /// Delete a collection and its on-disk data.
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        info!(name, "deleting collection");

        if self.inner.collections.remove(name).is_none() {
            return Err(Error::CollectionNotFound(name.to_string()));
        }

        if let Some(ref path) = self.inner.config.data_path {
            let collection_path = path.join(name);
            if collection_path.exists() {
                tokio::fs::remove_dir_all(&collection_path).await?;
            }
            self.write_collection_manifest(path).await?;
        }

        Ok(())
    }

    /// Whether a collection exists.
    pub fn collection_exists(&self, name: &str) -> bool {
        self.inner.collections.contains(name)
    }

    /// Names of all collections.
    pub fn list_collections(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.inner.collections.scan(|k, _| {
            names.push(k.clone());
        });
        names
    }

    /// Get a collection handle.
    pub fn get_collection(&self, name: &str) -> Result<Arc<Collection>> {
        self.inner
            .collections
            .read(name, |_, v| v.clone())
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    /// Insert a vector into a collection.
    pub async fn insert(
        &self,
        collection: &str,
        id: &str,
        vector: &[f32],
        metadata: Option<VectorMetadata>,
    ) -> Result<()> {
        let col = self.get_collection(collection)?;
        col.insert(id, vector, metadata)?;
        self.maybe_persist(collection).await
    }

    /// Insert multiple vectors, batching graph construction.
    pub async fn insert_batch<'a, I>(&self, collection: &str, vectors: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a [f32], Option<VectorMetadata>)>,
    {
        let col = self.get_collection(collection)?;
        let count = col.insert_batch(vectors)?;
        self.maybe_persist(collection).await?;
        debug!(collection, count, "inserted batch");
        Ok(count)
    }

    /// Replace an existing vector.
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        vector: &[f32],
        metadata: Option<VectorMetadata>,
    ) -> Result<()> {
        let col = self.get_collection(collection)?;
        col.update(id, vector, metadata)?;
        self.maybe_persist(collection).await
    }

    /// Delete a vector. Returns whether it existed.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let col = self.get_collection(collection)?;
        let deleted = col.delete(id)?;
        if deleted {
            self.maybe_persist(collection).await?;
        }
        Ok(deleted)
    }

    /// Delete multiple vectors, returning the number removed.
    pub async fn delete_batch(&self, collection: &str, ids: &[&str]) -> Result<usize> {
        let col = self.get_collection(collection)?;
        let count = col.delete_batch(ids)?;
        if count > 0 {
            self.maybe_persist(collection).await?;
        }
        Ok(count)
    }

    /// Search for the `limit` most similar vectors.
    pub async fn search(
        &self,
        collection: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let col = self.get_collection(collection)?;
        col.search(query, limit)
    }

    /// Search, dropping results scoring below `min_score`.
    pub async fn search_with_threshold(
        &self,
        collection: &str,
        query: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let col = self.get_collection(collection)?;
        col.search_with_threshold(query, limit, min_score)
    }

    /// Get a vector and its metadata by ID.
    pub async fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<(Vec<f32>, Option<VectorMetadata>)>> {
        let col = self.get_collection(collection)?;
        Ok(col.get(id))
    }

    /// Whether a vector exists.
    pub fn contains(&self, collection: &str, id: &str) -> Result<bool> {
        let col = self.get_collection(collection)?;
        Ok(col.contains(id))
    }

    /// Number of vectors in a collection.
    pub fn count(&self, collection: &str) -> Result<usize> {
        let col = self.get_collection(collection)?;
        Ok(col.len())
    }

    /// Collection statistics.
    pub fn collection_stats(&self, collection: &str) -> Result<CollectionStats> {
        let col = self.get_collection(collection)?;
        Ok(col.stats())
    }

    /// Rebuild a collection's index, reclaiming tombstone space.
    pub async fn compact(&self, collection: &str) -> Result<()> {
        let col = self.get_collection(collection)?;
        col.compact()
    }

    /// Write every collection to disk. No-op for in-memory databases.
    pub async fn persist(&self) -> Result<()> {
        let Some(ref path) = self.inner.config.data_path else {
            debug!("in-memory database, skipping persist");
            return Ok(());
        };

        let mut to_persist: Vec<(String, Arc<Collection>)> = Vec::new();
        self.inner.collections.scan(|name, collection| {
            to_persist.push((name.clone(), collection.clone()));
        });

        for (name, collection) in to_persist {
            persistence::save_collection(path, &name, &collection).await?;
        }
        self.write_collection_manifest(path).await?;

        Ok(())
    }

    async fn maybe_persist(&self, collection: &str) -> Result<()> {
        if !self.inner.config.auto_persist {
            return Ok(());
        }
        let Some(ref path) = self.inner.config.data_path else {
            return Ok(());
        };
        let col = self.get_collection(collection)?;
        persistence::save_collection(path, collection, &col).await
    }

    async fn load_collections(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            tokio::fs::create_dir_all(path).await?;
            return Ok(());
        }

        let manifest_path = path.join("collections.json");
        if !manifest_path.exists() {
            return Ok(());
        }

        let data = tokio::fs::read_to_string(&manifest_path).await?;
        let names: Vec<String> = serde_json::from_str(&data)
            .map_err(|e| Error::Persistence(format!("Failed to parse collections.json: {}", e)))?;

        for name in names {
            match persistence::load_collection(path, &name).await {
                Ok(collection) => {
                    let _ = self
                        .inner
                        .collections
                        .insert(name.clone(), Arc::new(collection));
                    info!(name, "loaded collection");
                }
                Err(e) => {
                    warn!(name, error = %e, "failed to load collection, skipping");
                }
            }
        }

        Ok(())
    }

    async fn write_collection_manifest(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path).await?;
        let names = self.list_collections();
        let data = serde_json::to_string_pretty(&names)
            .map_err(|e| Error::Persistence(format!("Failed to serialize manifest: {}", e)))?;
        tokio::fs::write(path.join("collections.json"), data).await?;
        Ok(())
    }
}

/// Statistics about a collection.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CollectionStats {
    /// Collection name.
    pub name: String,
    /// Number of live vectors.
    pub vector_count: usize,
    /// Vector dimensionality.
    pub dimensions: usize,
    /// Distance metric.
    pub metric: DistanceMetric,
    /// Approximate memory usage in bytes.
    pub memory_bytes: usize,
    /// HNSW parameters the collection was created with.
    pub hnsw_params: HnswParams,
}

/// HNSW parameters reported in stats.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HnswParams {
    /// Connections per layer.
    pub m: usize,
    /// Construction candidate list size.
    pub ef_construction: usize,
    /// Search candidate list size.
    pub ef_search: usize,
}
