//! Vector collection.
//!
//! A collection is a named container for vectors of one dimensionality and
//! one distance metric, backed by an HNSW index.

use crate::config::HnswConfig;
use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::index::HnswIndex;
use crate::types::{SearchResult, VectorMetadata};
use crate::{CollectionStats, HnswParams};

/// A named collection of vectors.
pub struct Collection {
    name: String,
    dimensions: usize,
    metric: DistanceMetric,
    index: HnswIndex,
    hnsw_config: HnswConfig,
}

impl Collection {
    /// Create a new collection.
    pub fn new(
        name: String,
        dimensions: usize,
        metric: DistanceMetric,
        hnsw_config: HnswConfig,
    ) -> Result<Self> {
        let index = HnswIndex::new(dimensions, metric, hnsw_config.clone())?;

        Ok(Self {
            name,
            dimensions,
            metric,
            index,
            hnsw_config,
        })
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vector dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Distance metric.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of vectors.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Insert a vector, replacing any existing vector with the same ID.
    pub fn insert(&self, id: &str, vector: &[f32], metadata: Option<VectorMetadata>) -> Result<()> {
        self.index.insert(id, vector, metadata)
    }

    /// Insert multiple vectors in one batch.
    pub fn insert_batch<'a, I>(&self, vectors: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a [f32], Option<VectorMetadata>)>,
    {
        self.index.insert_batch(vectors)
    }

    /// Replace an existing vector.
    pub fn update(&self, id: &str, vector: &[f32], metadata: Option<VectorMetadata>) -> Result<()> {
        self.index.update(id, vector, metadata)
    }

    /// Delete a vector.
    pub fn delete(&self, id: &str) -> Result<bool> {
        self.index.delete(id)
    }

    /// Delete multiple vectors.
    pub fn delete_batch(&self, ids: &[&str]) -> Result<usize> {
        self.index.delete_batch(ids)
    }

    /// Search for similar vectors.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.index.search(query, limit)
    }

    /// Search with a minimum score threshold.
    pub fn search_with_threshold(
        &self,
        query: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        self.index.search_with_threshold(query, limit, min_score)
    }

    /// Get a vector by ID.
    pub fn get(&self, id: &str) -> Option<(Vec<f32>, Option<VectorMetadata>)> {
        self.index.get(id)
    }

    /// Whether a vector exists.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Rebuild the index, reclaiming space left by deletions.
    pub fn compact(&self) -> Result<()> {
        self.index.compact()
    }

    /// Snapshot all vectors for persistence.
    pub fn export_all(&self) -> Vec<(String, Vec<f32>, Option<VectorMetadata>)> {
        self.index.export_all()
    }

    /// Collection statistics.
    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            name: self.name.clone(),
            vector_count: self.index.len(),
            dimensions: self.dimensions,
            metric: self.metric,
            memory_bytes: self.index.memory_usage(),
            hnsw_params: HnswParams {
                m: self.hnsw_config.m,
                ef_construction: self.hnsw_config.ef_construction,
                ef_search: self.hnsw_config.ef_search,
            },
        }
    }

    /// HNSW configuration this collection was created with.
    pub fn hnsw_config(&self) -> &HnswConfig {
        &self.hnsw_config
    }
}
