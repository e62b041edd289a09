//! Disk persistence for collections.
//!
//! Layout under the database data directory:
//!
//! ```text
//! {data_path}/collections.json          - list of collection names
//! {data_path}/{name}/metadata.json      - dimensions, metric, HNSW params
//! {data_path}/{name}/vectors.json       - full vector set with metadata
//! ```
//!
//! The HNSW graph itself is not serialized; it is rebuilt from the vector
//! set on load, which keeps the on-disk format independent of hnsw_rs
//! internals.

use crate::collection::Collection;
use crate::config::HnswConfig;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::types::VectorMetadata;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionMetadata {
    name: String,
    dimensions: usize,
    metric: String,
    hnsw_m: usize,
    hnsw_ef_construction: usize,
    hnsw_ef_search: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredVector {
    id: String,
    vector: Vec<f32>,
    metadata: Option<VectorMetadata>,
}

/// Save a collection's metadata and full vector set.
pub async fn save_collection(base_path: &Path, name: &str, collection: &Collection) -> Result<()> {
    let collection_path = base_path.join(name);
    tokio::fs::create_dir_all(&collection_path).await?;

    let metadata = CollectionMetadata {
        name: name.to_string(),
        dimensions: collection.dimensions(),
        metric: collection.metric().name().to_string(),
        hnsw_m: collection.hnsw_config().m,
        hnsw_ef_construction: collection.hnsw_config().ef_construction,
        hnsw_ef_search: collection.hnsw_config().ef_search,
    };

    let metadata_json = serde_json::to_string_pretty(&metadata)
        .map_err(|e| Error::Persistence(format!("Failed to serialize metadata: {}", e)))?;
    tokio::fs::write(collection_path.join("metadata.json"), metadata_json).await?;

    let vectors: Vec<StoredVector> = collection
        .export_all()
        .into_iter()
        .map(|(id, vector, metadata)| StoredVector {
            id,
            vector,
            metadata,
        })
        .collect();

    let vectors_json = serde_json::to_string(&vectors)
        .map_err(|e| Error::Persistence(format!("Failed to serialize vectors: {}", e)))?;
    tokio::fs::write(collection_path.join("vectors.json"), vectors_json).await?;

    info!(name, count = vectors.len(), "saved collection");
    Ok(())
}

/// Load a collection, rebuilding its index from the stored vector set.
pub async fn load_collection(base_path: &Path, name: &str) -> Result<Collection> {
    let collection_path = base_path.join(name);

    if !collection_path.exists() {
        return Err(Error::CollectionNotFound(name.to_string()));
    }

    let metadata_json = tokio::fs::read_to_string(collection_path.join("metadata.json")).await?;
    let metadata: CollectionMetadata = serde_json::from_str(&metadata_json)
        .map_err(|e| Error::Persistence(format!("Failed to parse metadata: {}", e)))?;

    let metric: DistanceMetric = metadata.metric.parse().map_err(Error::Persistence)?;

    let hnsw_config = HnswConfig {
        m: metadata.hnsw_m,
        ef_construction: metadata.hnsw_ef_construction,
        ef_search: metadata.hnsw_ef_search,
        parallel_construction: true,
    };

    let collection = Collection::new(
        metadata.name.clone(),
        metadata.dimensions,
        metric,
        hnsw_config,
    )?;

    let vectors_path = collection_path.join("vectors.json");
    if vectors_path.exists() {
        let vectors_json = tokio::fs::read_to_string(&vectors_path).await?;
        let vectors: Vec<StoredVector> = serde_json::from_str(&vectors_json)
            .map_err(|e| Error::Persistence(format!("Failed to parse vectors: {}", e)))?;

        let count = vectors.len();
        let batch: Vec<(&str, &[f32], Option<VectorMetadata>)> = vectors
            .iter()
            .map(|s| (s.id.as_str(), s.vector.as_slice(), s.metadata.clone()))
            .collect();
        collection.insert_batch(batch)?;

        debug!(name, count, "restored vectors");
    }

    info!(name, dimensions = metadata.dimensions, "loaded collection");
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetadataValue;
    use tempfile::TempDir;

    #[tokio::test]
    async fn save_load_roundtrips_vectors() {
        let temp_dir = TempDir::new().unwrap();

        let collection = Collection::new(
            "docs".to_string(),
            3,
            DistanceMetric::Cosine,
            HnswConfig::default(),
        )
        .unwrap();

        let meta = VectorMetadata::from_pairs([("title", MetadataValue::String("one".into()))]);
        collection.insert("v1", &[1.0, 0.0, 0.0], Some(meta)).unwrap();
        collection.insert("v2", &[0.0, 1.0, 0.0], None).unwrap();

        save_collection(temp_dir.path(), "docs", &collection)
            .await
            .unwrap();

        let loaded = load_collection(temp_dir.path(), "docs").await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimensions(), 3);

        let (vector, meta) = loaded.get("v1").unwrap();
        assert_eq!(vector, vec![1.0, 0.0, 0.0]);
        assert_eq!(meta.unwrap().get_string("title"), Some("one"));

        let results = loaded.search(&[1.0, 0.0, 0.0], 5).unwrap();
        assert_eq!(results[0].id, "v1");
    }

    #[tokio::test]
    async fn load_missing_collection_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_collection(temp_dir.path(), "ghost").await;
        assert!(matches!(result, Err(Error::CollectionNotFound(_))));
    }
}
