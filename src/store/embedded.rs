//! Embedded vector store backed by vellum-index (feature `embedded-store`).
//!
//! The index holds vectors and small metadata; full documents live in a
//! side-car map persisted as `documents.json` next to the index so search
//! results can return complete content without a second database.

use crate::types::{AppError, Document, Result, SearchResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::vectorstore::{CollectionInfo, CollectionStats, VectorStore};
use vellum_index::{Config, DistanceMetric, MetadataValue, VectorDb, VectorMetadata};

/// Default vector store: embedded HNSW, optional persistence.
pub struct EmbeddedStore {
    db: VectorDb,
    path: Option<PathBuf>,
    /// collection -> id -> full document
    documents: Arc<RwLock<HashMap<String, HashMap<String, Document>>>>,
}

impl EmbeddedStore {
    /// Open the store. With a path, previously persisted collections and
    /// documents are reloaded.
    pub async fn new(path: Option<String>) -> Result<Self> {
        let path_buf = path.map(PathBuf::from);

        let config = match path_buf {
            Some(ref p) => Config::persistent(p.clone()),
            None => Config::memory(),
        };

        let db = VectorDb::open(config).await.map_err(|e| {
            AppError::Configuration(format!("Failed to open embedded index: {}", e))
        })?;

        let store = Self {
            db,
            path: path_buf,
            documents: Arc::new(RwLock::new(HashMap::new())),
        };

        if let Some(ref path) = store.path {
            store.load_documents(path).await?;
        }

        Ok(store)
    }

    async fn load_documents(&self, path: &Path) -> Result<()> {
        let docs_path = path.join("documents.json");
        if !docs_path.exists() {
            return Ok(());
        }

        let data = tokio::fs::read_to_string(&docs_path)
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to read documents file: {}", e)))?;

        let loaded: HashMap<String, HashMap<String, Document>> = serde_json::from_str(&data)
            .map_err(|e| AppError::VectorStore(format!("Failed to parse documents file: {}", e)))?;

        *self.documents.write() = loaded;
        Ok(())
    }

    async fn save_documents(&self) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        // Serialize outside the lock so it is not held across await.
        let data = {
            let docs = self.documents.read();
            serde_json::to_string(&*docs)
                .map_err(|e| AppError::Internal(format!("Failed to serialize documents: {}", e)))?
        };

        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create data directory: {}", e)))?;
        tokio::fs::write(path.join("documents.json"), data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write documents file: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl VectorStore for EmbeddedStore {
    fn provider_name(&self) -> &'static str {
        "embedded"
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.db
            .create_collection(name, dimensions, DistanceMetric::Cosine)
            .await
            .map_err(|e| match e {
                vellum_index::Error::CollectionExists(name) => {
                    AppError::InvalidInput(format!("Collection '{}' already exists", name))
                }
                other => AppError::VectorStore(format!("Failed to create collection: {}", other)),
            })?;

        self.documents
            .write()
            .insert(name.to_string(), HashMap::new());

        self.save_documents().await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.db.delete_collection(name).await.map_err(|e| match e {
            vellum_index::Error::CollectionNotFound(name) => {
                AppError::NotFound(format!("Collection '{}' not found", name))
            }
            other => AppError::VectorStore(format!("Failed to delete collection: {}", other)),
        })?;

        self.documents.write().remove(name);
        self.save_documents().await
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let names = self.db.list_collections();

        let mut infos = Vec::with_capacity(names.len());
        for name in names {
            if let Ok(stats) = self.db.collection_stats(&name) {
                infos.push(CollectionInfo {
                    name,
                    document_count: stats.vector_count,
                    dimensions: stats.dimensions,
                });
            }
        }
        Ok(infos)
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.db.collection_exists(name))
    }

    async fn collection_stats(&self, name: &str) -> Result<CollectionStats> {
        let stats = self
            .db
            .collection_stats(name)
            .map_err(|_| AppError::NotFound(format!("Collection '{}' not found", name)))?;

        Ok(CollectionStats {
            name: stats.name,
            document_count: stats.vector_count,
            dimensions: stats.dimensions,
            index_size_bytes: Some(stats.memory_bytes as u64),
            distance_metric: stats.metric.name().to_string(),
        })
    }

    async fn upsert(&self, collection: &str, documents: &[Document]) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }
        if !self.db.collection_exists(collection) {
            return Err(AppError::NotFound(format!(
                "Collection '{}' not found",
                collection
            )));
        }

        for doc in documents {
            let embedding = doc.embedding.as_ref().ok_or_else(|| {
                AppError::InvalidInput(format!("Document '{}' is missing embedding", doc.id))
            })?;

            let meta = VectorMetadata::from_pairs([
                ("title", MetadataValue::String(doc.metadata.title.clone())),
                ("source", MetadataValue::String(doc.metadata.source.clone())),
            ]);

            self.db
                .insert(collection, &doc.id, embedding, Some(meta))
                .await
                .map_err(|e| AppError::VectorStore(format!("Failed to insert vector: {}", e)))?;

            let mut docs = self.documents.write();
            docs.entry(collection.to_string())
                .or_default()
                .insert(doc.id.clone(), doc.clone());
        }

        self.save_documents().await?;
        Ok(documents.len())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        // Fetch extra: threshold filtering happens after the ANN pass.
        let hits = self
            .db
            .search(collection, embedding, limit * 2)
            .await
            .map_err(|e| match e {
                vellum_index::Error::CollectionNotFound(name) => {
                    AppError::NotFound(format!("Collection '{}' not found", name))
                }
                other => AppError::VectorStore(format!("Search failed: {}", other)),
            })?;

        let docs = self.documents.read();
        let collection_docs = docs
            .get(collection)
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}' not found", collection)))?;

        let mut results = Vec::with_capacity(limit);
        for hit in hits {
            if hit.score < threshold {
                continue;
            }
            if let Some(doc) = collection_docs.get(&hit.id) {
                results.push(SearchResult {
                    document: Document {
                        id: doc.id.clone(),
                        content: doc.content.clone(),
                        metadata: doc.metadata.clone(),
                        embedding: None,
                    },
                    score: hit.score,
                });
                if results.len() >= limit {
                    break;
                }
            }
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(results)
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut deleted = 0;
        for id in ids {
            let removed = self
                .db
                .delete(collection, id)
                .await
                .map_err(|e| AppError::VectorStore(format!("Failed to delete vector: {}", e)))?;
            if removed {
                let mut docs = self.documents.write();
                if let Some(collection_docs) = docs.get_mut(collection) {
                    collection_docs.remove(id);
                }
                deleted += 1;
            }
        }

        self.save_documents().await?;
        Ok(deleted)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let docs = self.documents.read();
        let collection_docs = docs
            .get(collection)
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}' not found", collection)))?;

        Ok(collection_docs.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentMetadata;

    fn doc(id: &str, content: &str, embedding: Vec<f32>) -> Document {
        Document {
            id: id.to_string(),
            content: content.to_string(),
            metadata: DocumentMetadata::with_source("test"),
            embedding: Some(embedding),
        }
    }

    #[tokio::test]
    async fn upsert_and_search() {
        let store = EmbeddedStore::new(None).await.unwrap();
        store.create_collection("docs", 3).await.unwrap();

        let count = store
            .upsert(
                "docs",
                &[
                    doc("d1", "hello", vec![1.0, 0.0, 0.0]),
                    doc("d2", "goodbye", vec![0.0, 1.0, 0.0]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(count, 2);

        let results = store.search("docs", &[1.0, 0.1, 0.0], 10, 0.0).await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].document.id, "d1");
        assert_eq!(results[0].document.content, "hello");
    }

    #[tokio::test]
    async fn collection_lifecycle() {
        let store = EmbeddedStore::new(None).await.unwrap();

        store.create_collection("a", 4).await.unwrap();
        store.create_collection("b", 8).await.unwrap();
        assert_eq!(store.list_collections().await.unwrap().len(), 2);
        assert!(store.collection_exists("a").await.unwrap());

        store.delete_collection("a").await.unwrap();
        assert!(!store.collection_exists("a").await.unwrap());
    }

    #[tokio::test]
    async fn persistence_roundtrip() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().to_string_lossy().to_string();

        {
            let store = EmbeddedStore::new(Some(path.clone())).await.unwrap();
            store.create_collection("docs", 3).await.unwrap();
            store
                .upsert("docs", &[doc("d1", "persisted text", vec![1.0, 0.0, 0.0])])
                .await
                .unwrap();
        }

        let reopened = EmbeddedStore::new(Some(path)).await.unwrap();
        assert!(reopened.collection_exists("docs").await.unwrap());

        let fetched = reopened.get("docs", "d1").await.unwrap().unwrap();
        assert_eq!(fetched.content, "persisted text");

        let results = reopened
            .search("docs", &[1.0, 0.0, 0.0], 5, 0.0)
            .await
            .unwrap();
        assert_eq!(results[0].document.id, "d1");
    }

    #[tokio::test]
    async fn delete_removes_from_search() {
        let store = EmbeddedStore::new(None).await.unwrap();
        store.create_collection("docs", 3).await.unwrap();
        store
            .upsert("docs", &[doc("d1", "text", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        let removed = store.delete("docs", &["d1".to_string()]).await.unwrap();
        assert_eq!(removed, 1);

        let results = store.search("docs", &[1.0, 0.0, 0.0], 5, 0.0).await.unwrap();
        assert!(results.is_empty());
    }
}
