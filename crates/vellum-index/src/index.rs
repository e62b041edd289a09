//! HNSW index wrapper.
//!
//! Wraps `hnsw_rs` with string-ID mapping, metadata storage, and deletion
//! semantics. HNSW graphs cannot remove points, so deletion drops the ID
//! mapping and `compact()` rebuilds the graph from the live set.

use crate::config::HnswConfig;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::{SearchResult, VectorId, VectorMetadata};
use anndists::dist::distances::{DistCosine, DistDot, DistL1, DistL2};
use hnsw_rs::hnsw::Hnsw;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

/// Initial graph capacity. hnsw_rs grows layers lazily, so this only
/// bounds the per-layer allocation, not the number of vectors.
const GRAPH_CAPACITY: usize = 1_000_000;
const MAX_LAYER: usize = 16;

/// Thread-safe HNSW index with string-ID mapping.
pub struct HnswIndex {
    inner: RwLock<IndexInner>,
    /// String ID -> internal numeric ID of the live point.
    id_to_internal: RwLock<HashMap<VectorId, usize>>,
    /// Internal numeric ID -> string ID. Absent entries are tombstones.
    internal_to_id: RwLock<HashMap<usize, VectorId>>,
    /// Raw vectors, kept for `get`, export, and compaction.
    vectors: RwLock<HashMap<usize, Vec<f32>>>,
    metadata: RwLock<HashMap<usize, VectorMetadata>>,
    next_internal_id: AtomicUsize,
    dimensions: usize,
    metric: DistanceMetric,
    config: HnswConfig,
}

/// Monomorphized graph per metric; hnsw_rs types the distance functor.
enum IndexInner {
    Cosine(Hnsw<'static, f32, DistCosine>),
    Euclidean(Hnsw<'static, f32, DistL2>),
    DotProduct(Hnsw<'static, f32, DistDot>),
    Manhattan(Hnsw<'static, f32, DistL1>),
}

impl IndexInner {
    fn build(metric: DistanceMetric, config: &HnswConfig) -> Self {
        match metric {
            DistanceMetric::Cosine => IndexInner::Cosine(Hnsw::new(
                config.m,
                GRAPH_CAPACITY,
                MAX_LAYER,
                config.ef_construction,
                DistCosine {},
            )),
            DistanceMetric::Euclidean => IndexInner::Euclidean(Hnsw::new(
                config.m,
                GRAPH_CAPACITY,
                MAX_LAYER,
                config.ef_construction,
                DistL2 {},
            )),
            DistanceMetric::DotProduct => IndexInner::DotProduct(Hnsw::new(
                config.m,
                GRAPH_CAPACITY,
                MAX_LAYER,
                config.ef_construction,
                DistDot {},
            )),
            DistanceMetric::Manhattan => IndexInner::Manhattan(Hnsw::new(
                config.m,
                GRAPH_CAPACITY,
                MAX_LAYER,
                config.ef_construction,
                DistL1 {},
            )),
        }
    }

    fn insert(&self, vector: &[f32], internal_id: usize) {
        match self {
            IndexInner::Cosine(hnsw) => hnsw.insert((vector, internal_id)),
            IndexInner::Euclidean(hnsw) => hnsw.insert((vector, internal_id)),
            IndexInner::DotProduct(hnsw) => hnsw.insert((vector, internal_id)),
            IndexInner::Manhattan(hnsw) => hnsw.insert((vector, internal_id)),
        }
    }

    fn parallel_insert(&self, batch: &Vec<(&Vec<f32>, usize)>) {
        match self {
            IndexInner::Cosine(hnsw) => hnsw.parallel_insert(batch),
            IndexInner::Euclidean(hnsw) => hnsw.parallel_insert(batch),
            IndexInner::DotProduct(hnsw) => hnsw.parallel_insert(batch),
            IndexInner::Manhattan(hnsw) => hnsw.parallel_insert(batch),
        }
    }

    fn search(&self, query: &[f32], limit: usize, ef: usize) -> Vec<(usize, f32)> {
        let neighbors = match self {
            IndexInner::Cosine(hnsw) => hnsw.search(query, limit, ef),
            IndexInner::Euclidean(hnsw) => hnsw.search(query, limit, ef),
            IndexInner::DotProduct(hnsw) => hnsw.search(query, limit, ef),
            IndexInner::Manhattan(hnsw) => hnsw.search(query, limit, ef),
        };
        neighbors.into_iter().map(|n| (n.d_id, n.distance)).collect()
    }
}

impl HnswIndex {
    /// Create a new index.
    pub fn new(dimensions: usize, metric: DistanceMetric, config: HnswConfig) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::InvalidVector("Dimensions must be > 0".to_string()));
        }

        Ok(Self {
            inner: RwLock::new(IndexInner::build(metric, &config)),
            id_to_internal: RwLock::new(HashMap::new()),
            internal_to_id: RwLock::new(HashMap::new()),
            vectors: RwLock::new(HashMap::new()),
            metadata: RwLock::new(HashMap::new()),
            next_internal_id: AtomicUsize::new(0),
            dimensions,
            metric,
            config,
        })
    }

    /// Vector dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Distance metric.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of live vectors.
    pub fn len(&self) -> usize {
        self.id_to_internal.read().len()
    }

    /// Whether the index holds no live vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a vector with this ID exists.
    pub fn contains(&self, id: &str) -> bool {
        self.id_to_internal.read().contains_key(id)
    }

    fn validate(&self, id: &str, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidVector(format!(
                "Vector '{}' contains NaN or Inf",
                id
            )));
        }
        Ok(())
    }

    /// Register an ID, returning the internal ID to use. Re-inserting an
    /// existing ID tombstones the old point and assigns a fresh internal ID.
    fn assign_internal_id(&self, id: &str) -> usize {
        let internal_id = self.next_internal_id.fetch_add(1, Ordering::SeqCst);
        let mut id_to_internal = self.id_to_internal.write();
        let mut internal_to_id = self.internal_to_id.write();
        if let Some(old) = id_to_internal.insert(id.to_string(), internal_id) {
            internal_to_id.remove(&old);
            self.vectors.write().remove(&old);
            self.metadata.write().remove(&old);
        }
        internal_to_id.insert(internal_id, id.to_string());
        internal_id
    }

    /// Insert a vector. An existing vector with the same ID is replaced.
    pub fn insert(&self, id: &str, vector: &[f32], meta: Option<VectorMetadata>) -> Result<()> {
        self.validate(id, vector)?;

        let internal_id = self.assign_internal_id(id);

        self.vectors.write().insert(internal_id, vector.to_vec());
        if let Some(m) = meta {
            self.metadata.write().insert(internal_id, m);
        }

        self.inner.read().insert(vector, internal_id);

        trace!(id, internal_id, "inserted vector");
        Ok(())
    }

    /// Insert many vectors, batching graph construction.
    pub fn insert_batch<'a, I>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a [f32], Option<VectorMetadata>)>,
    {
        let mut staged: Vec<(Vec<f32>, usize)> = Vec::new();

        for (id, vector, meta) in items {
            self.validate(id, vector)?;
            let internal_id = self.assign_internal_id(id);
            self.vectors.write().insert(internal_id, vector.to_vec());
            if let Some(m) = meta {
                self.metadata.write().insert(internal_id, m);
            }
            staged.push((vector.to_vec(), internal_id));
        }

        if !staged.is_empty() {
            let inner = self.inner.read();
            if self.config.parallel_construction && staged.len() > 1 {
                let refs: Vec<(&Vec<f32>, usize)> =
                    staged.iter().map(|(v, id)| (v, *id)).collect();
                inner.parallel_insert(&refs);
            } else {
                for (v, id) in &staged {
                    inner.insert(v, *id);
                }
            }
        }

        debug!(count = staged.len(), "batch inserted vectors");
        Ok(staged.len())
    }

    /// Delete a vector. Returns `false` if the ID was unknown.
    ///
    /// The point stays in the HNSW graph as a tombstone until `compact()`;
    /// it can no longer be returned because its ID mapping is gone.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let Some(internal_id) = self.id_to_internal.write().remove(id) else {
            return Ok(false);
        };

        self.internal_to_id.write().remove(&internal_id);
        self.vectors.write().remove(&internal_id);
        self.metadata.write().remove(&internal_id);

        trace!(id, internal_id, "deleted vector");
        Ok(true)
    }

    /// Delete many vectors, returning the number actually removed.
    pub fn delete_batch(&self, ids: &[&str]) -> Result<usize> {
        let mut count = 0;
        for id in ids {
            if self.delete(id)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Search for the `limit` nearest live vectors.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }

        // Over-fetch so tombstoned points do not eat into the result count.
        let fetch = limit.saturating_add(limit / 2).max(limit + 4);
        let ef = self.config.ef_search.max(fetch);

        let neighbors = self.inner.read().search(query, fetch, ef);

        let internal_to_id = self.internal_to_id.read();
        let metadata = self.metadata.read();

        let mut results: Vec<SearchResult> = neighbors
            .into_iter()
            .filter_map(|(internal_id, distance)| {
                let id = internal_to_id.get(&internal_id)?;
                Some(SearchResult {
                    id: id.clone(),
                    score: self.distance_to_score(distance),
                    metadata: metadata.get(&internal_id).cloned(),
                })
            })
            .collect();

        results.truncate(limit);
        Ok(results)
    }

    /// Search, dropping results below `min_score`.
    pub fn search_with_threshold(
        &self,
        query: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let results = self.search(query, limit)?;
        Ok(results.into_iter().filter(|r| r.score >= min_score).collect())
    }

    /// Fetch a vector and its metadata by ID.
    pub fn get(&self, id: &str) -> Option<(Vec<f32>, Option<VectorMetadata>)> {
        let internal_id = *self.id_to_internal.read().get(id)?;
        let vector = self.vectors.read().get(&internal_id)?.clone();
        let meta = self.metadata.read().get(&internal_id).cloned();
        Some((vector, meta))
    }

    /// Replace an existing vector. Errors if the ID is unknown.
    pub fn update(&self, id: &str, vector: &[f32], meta: Option<VectorMetadata>) -> Result<()> {
        if !self.contains(id) {
            return Err(Error::VectorNotFound(id.to_string()));
        }
        self.insert(id, vector, meta)
    }

    /// Rebuild the graph from the live set, discarding tombstones.
    pub fn compact(&self) -> Result<()> {
        let live = self.export_all();

        self.id_to_internal.write().clear();
        self.internal_to_id.write().clear();
        self.vectors.write().clear();
        self.metadata.write().clear();
        self.next_internal_id.store(0, Ordering::SeqCst);

        *self.inner.write() = IndexInner::build(self.metric, &self.config);

        let batch: Vec<_> = live
            .iter()
            .map(|(id, v, m)| (id.as_str(), v.as_slice(), m.clone()))
            .collect();
        self.insert_batch(batch)?;

        debug!(count = live.len(), "compacted index");
        Ok(())
    }

    /// Snapshot all live vectors as `(id, vector, metadata)` tuples.
    pub fn export_all(&self) -> Vec<(String, Vec<f32>, Option<VectorMetadata>)> {
        let id_to_internal = self.id_to_internal.read();
        let vectors = self.vectors.read();
        let metadata = self.metadata.read();

        id_to_internal
            .iter()
            .filter_map(|(id, &internal_id)| {
                let vector = vectors.get(&internal_id)?.clone();
                let meta = metadata.get(&internal_id).cloned();
                Some((id.clone(), vector, meta))
            })
            .collect()
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        let vectors = self.vectors.read();
        let vector_bytes: usize = vectors.values().map(|v| v.len() * 4).sum();
        let id_bytes: usize = self.id_to_internal.read().keys().map(|s| s.len() * 2).sum();
        // Graph connections: ~m links of 4 bytes per layer per point.
        let graph_bytes = vectors.len() * self.config.m * 4 * MAX_LAYER;
        vector_bytes + id_bytes + graph_bytes
    }

    /// Map an hnsw_rs distance back to a similarity score.
    fn distance_to_score(&self, distance: f32) -> f32 {
        match self.metric {
            // DistCosine yields 1 - cos_sim.
            DistanceMetric::Cosine => 1.0 - distance,
            // DistDot yields 1 - dot for normalized data; invert the sign
            // convention so higher stays more similar.
            DistanceMetric::DotProduct => 1.0 - distance,
            DistanceMetric::Euclidean | DistanceMetric::Manhattan => 1.0 / (1.0 + distance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetadataValue;

    fn index(dims: usize) -> HnswIndex {
        HnswIndex::new(dims, DistanceMetric::Cosine, HnswConfig::default()).unwrap()
    }

    #[test]
    fn insert_and_search_returns_nearest_first() {
        let idx = index(3);
        idx.insert("a", &[1.0, 0.0, 0.0], None).unwrap();
        idx.insert("b", &[0.0, 1.0, 0.0], None).unwrap();
        idx.insert("c", &[0.9, 0.1, 0.0], None).unwrap();

        let results = idx.search(&[1.0, 0.0, 0.0], 10).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].id, "a");
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let idx = index(3);
        let result = idx.insert("a", &[1.0, 0.0], None);
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn rejects_non_finite_values() {
        let idx = index(2);
        assert!(idx.insert("a", &[f32::NAN, 0.0], None).is_err());
        assert!(idx.insert("a", &[f32::INFINITY, 0.0], None).is_err());
    }

    #[test]
    fn delete_hides_vector() {
        let idx = index(3);
        idx.insert("a", &[1.0, 0.0, 0.0], None).unwrap();
        assert_eq!(idx.len(), 1);

        assert!(idx.delete("a").unwrap());
        assert_eq!(idx.len(), 0);
        assert!(!idx.delete("a").unwrap());

        let results = idx.search(&[1.0, 0.0, 0.0], 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn reinsert_replaces_vector() {
        let idx = index(2);
        idx.insert("a", &[1.0, 0.0], None).unwrap();
        idx.insert("a", &[0.0, 1.0], None).unwrap();
        assert_eq!(idx.len(), 1);

        let (vector, _) = idx.get("a").unwrap();
        assert_eq!(vector, vec![0.0, 1.0]);
    }

    #[test]
    fn get_returns_metadata() {
        let idx = index(3);
        let meta = VectorMetadata::from_pairs([("title", MetadataValue::String("t".into()))]);
        idx.insert("a", &[1.0, 2.0, 3.0], Some(meta)).unwrap();

        let (vector, metadata) = idx.get("a").unwrap();
        assert_eq!(vector, vec![1.0, 2.0, 3.0]);
        assert_eq!(metadata.unwrap().get_string("title"), Some("t"));
    }

    #[test]
    fn update_requires_existing_id() {
        let idx = index(2);
        assert!(matches!(
            idx.update("missing", &[1.0, 0.0], None),
            Err(Error::VectorNotFound(_))
        ));
    }

    #[test]
    fn export_all_snapshots_live_set() {
        let idx = index(2);
        idx.insert("a", &[1.0, 0.0], None).unwrap();
        idx.insert("b", &[0.0, 1.0], None).unwrap();
        idx.delete("a").unwrap();

        let exported = idx.export_all();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].0, "b");
    }

    #[test]
    fn compact_preserves_search() {
        let idx = index(2);
        idx.insert("a", &[1.0, 0.0], None).unwrap();
        idx.insert("b", &[0.0, 1.0], None).unwrap();
        idx.delete("b").unwrap();

        idx.compact().unwrap();
        assert_eq!(idx.len(), 1);

        let results = idx.search(&[1.0, 0.0], 5).unwrap();
        assert_eq!(results[0].id, "a");
    }
}
