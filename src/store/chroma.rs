//! ChromaDB vector store over its REST API (feature `chromadb`).
//!
//! Talks to a running ChromaDB server (`/api/v1`). Collections are created
//! with `hnsw:space = cosine` so distances convert to similarity as
//! `1 - distance`. Document content and metadata travel in Chroma's
//! `documents` / `metadatas` arrays.

use crate::types::{AppError, Document, DocumentMetadata, Result, SearchResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::vectorstore::{CollectionInfo, CollectionStats, VectorStore};

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct ChromaStore {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChromaCollection {
    id: String,
    name: String,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<serde_json::Value>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    ids: Vec<String>,
    #[serde(default)]
    documents: Option<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Option<Vec<Option<serde_json::Value>>>,
}

impl ChromaStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("{}: {}", action, body)));
        }
        Err(AppError::VectorStore(format!(
            "ChromaDB {} failed ({}): {}",
            action, status, body
        )))
    }

    async fn collection_by_name(&self, name: &str) -> Result<ChromaCollection> {
        let response = self
            .client
            .get(self.url(&format!("collections/{}", name)))
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "Collection '{}' not found",
                name
            )));
        }
        let response = Self::check(response, "get collection").await?;
        response
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB response parse error: {}", e)))
    }

    async fn count_for(&self, collection_id: &str) -> Result<usize> {
        let response = self
            .client
            .get(self.url(&format!("collections/{}/count", collection_id)))
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB request failed: {}", e)))?;
        let response = Self::check(response, "count").await?;
        response
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB response parse error: {}", e)))
    }

    fn dimensions_of(collection: &ChromaCollection) -> usize {
        collection
            .metadata
            .as_ref()
            .and_then(|m| m.get("dimensions"))
            .and_then(|d| d.as_u64())
            .unwrap_or(0) as usize
    }

    /// Chroma metadatas are flat maps; pack document metadata into one.
    fn flatten_metadata(metadata: &DocumentMetadata) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("title".into(), json!(metadata.title));
        map.insert("source".into(), json!(metadata.source));
        map.insert("created_at".into(), json!(metadata.created_at.timestamp()));
        if let Some(ref author) = metadata.author {
            map.insert("author".into(), json!(author));
        }
        if let Some(pages) = metadata.page_count {
            map.insert("page_count".into(), json!(pages));
        }
        if !metadata.tags.is_empty() {
            map.insert("tags".into(), json!(metadata.tags.join(",")));
        }
        serde_json::Value::Object(map)
    }

    fn unflatten_metadata(value: Option<&serde_json::Value>) -> DocumentMetadata {
        let get_str = |key: &str| {
            value
                .and_then(|v| v.get(key))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        DocumentMetadata {
            title: get_str("title"),
            source: get_str("source"),
            author: value
                .and_then(|v| v.get("author"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            page_count: value
                .and_then(|v| v.get("page_count"))
                .and_then(|v| v.as_u64())
                .map(|n| n as usize),
            created_at: value
                .and_then(|v| v.get("created_at"))
                .and_then(|v| v.as_i64())
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
                .unwrap_or_else(chrono::Utc::now),
            tags: value
                .and_then(|v| v.get("tags"))
                .and_then(|v| v.as_str())
                .map(|s| s.split(',').map(|t| t.to_string()).collect())
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    fn provider_name(&self) -> &'static str {
        "chromadb"
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        if self.collection_exists(name).await? {
            return Err(AppError::InvalidInput(format!(
                "Collection '{}' already exists",
                name
            )));
        }

        let body = json!({
            "name": name,
            "metadata": { "hnsw:space": "cosine", "dimensions": dimensions },
            "get_or_create": false,
        });

        let response = self
            .client
            .post(self.url("collections"))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB request failed: {}", e)))?;
        Self::check(response, "create collection").await?;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("collections/{}", name)))
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB request failed: {}", e)))?;
        Self::check(response, "delete collection").await?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let response = self
            .client
            .get(self.url("collections"))
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB request failed: {}", e)))?;
        let response = Self::check(response, "list collections").await?;

        let collections: Vec<ChromaCollection> = response
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB response parse error: {}", e)))?;

        let mut infos = Vec::with_capacity(collections.len());
        for col in collections {
            let document_count = self.count_for(&col.id).await.unwrap_or(0);
            infos.push(CollectionInfo {
                dimensions: Self::dimensions_of(&col),
                name: col.name,
                document_count,
            });
        }
        Ok(infos)
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        match self.collection_by_name(name).await {
            Ok(_) => Ok(true),
            Err(AppError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn collection_stats(&self, name: &str) -> Result<CollectionStats> {
        let collection = self.collection_by_name(name).await?;
        let document_count = self.count_for(&collection.id).await?;

        Ok(CollectionStats {
            name: collection.name.clone(),
            document_count,
            dimensions: Self::dimensions_of(&collection),
            index_size_bytes: None,
            distance_metric: "cosine".to_string(),
        })
    }

    async fn upsert(&self, collection: &str, documents: &[Document]) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let col = self.collection_by_name(collection).await?;

        let mut ids = Vec::with_capacity(documents.len());
        let mut embeddings = Vec::with_capacity(documents.len());
        let mut contents = Vec::with_capacity(documents.len());
        let mut metadatas = Vec::with_capacity(documents.len());

        for doc in documents {
            let embedding = doc.embedding.as_ref().ok_or_else(|| {
                AppError::InvalidInput(format!("Document '{}' is missing embedding", doc.id))
            })?;
            ids.push(doc.id.clone());
            embeddings.push(embedding.clone());
            contents.push(doc.content.clone());
            metadatas.push(Self::flatten_metadata(&doc.metadata));
        }

        let body = json!({
            "ids": ids,
            "embeddings": embeddings,
            "documents": contents,
            "metadatas": metadatas,
        });

        let response = self
            .client
            .post(self.url(&format!("collections/{}/upsert", col.id)))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB request failed: {}", e)))?;
        Self::check(response, "upsert").await?;

        Ok(documents.len())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        let col = self.collection_by_name(collection).await?;

        let body = json!({
            "query_embeddings": [embedding],
            "n_results": limit,
            "include": ["documents", "metadatas", "distances"],
        });

        let response = self
            .client
            .post(self.url(&format!("collections/{}/query", col.id)))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB request failed: {}", e)))?;
        let response = Self::check(response, "query").await?;

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB response parse error: {}", e)))?;

        let ids = parsed.ids.into_iter().next().unwrap_or_default();
        let documents = parsed
            .documents
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();
        let metadatas = parsed
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default();
        let distances = parsed
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default();

        let mut results = Vec::with_capacity(ids.len());
        for (i, id) in ids.into_iter().enumerate() {
            // Cosine space: similarity = 1 - distance.
            let score = 1.0 - distances.get(i).copied().unwrap_or(1.0);
            if score < threshold {
                continue;
            }
            let content = documents
                .get(i)
                .and_then(|d| d.clone())
                .unwrap_or_default();
            let metadata = Self::unflatten_metadata(metadatas.get(i).and_then(|m| m.as_ref()));

            results.push(SearchResult {
                document: Document {
                    id,
                    content,
                    metadata,
                    embedding: None,
                },
                score,
            });
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(results)
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<usize> {
        let col = self.collection_by_name(collection).await?;

        let response = self
            .client
            .post(self.url(&format!("collections/{}/delete", col.id)))
            .json(&json!({ "ids": ids }))
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB request failed: {}", e)))?;
        let response = Self::check(response, "delete").await?;

        // Chroma returns the IDs it actually deleted.
        let deleted: Vec<String> = response.json().await.unwrap_or_default();
        Ok(deleted.len())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let col = self.collection_by_name(collection).await?;

        let body = json!({
            "ids": [id],
            "include": ["documents", "metadatas"],
        });

        let response = self
            .client
            .post(self.url(&format!("collections/{}/get", col.id)))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB request failed: {}", e)))?;
        let response = Self::check(response, "get").await?;

        let parsed: GetResponse = response
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("ChromaDB response parse error: {}", e)))?;

        if parsed.ids.is_empty() {
            return Ok(None);
        }

        let content = parsed
            .documents
            .and_then(|d| d.into_iter().next().flatten())
            .unwrap_or_default();
        let metadata_value = parsed.metadatas.and_then(|m| m.into_iter().next().flatten());

        Ok(Some(Document {
            id: id.to_string(),
            content,
            metadata: Self::unflatten_metadata(metadata_value.as_ref()),
            embedding: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn metadata_flattening_roundtrip() {
        let metadata = DocumentMetadata {
            title: "Paper".to_string(),
            source: "papers/a.pdf".to_string(),
            author: Some("Doe".to_string()),
            page_count: Some(12),
            created_at: Utc::now(),
            tags: vec!["ml".to_string(), "rag".to_string()],
        };

        let flat = ChromaStore::flatten_metadata(&metadata);
        let back = ChromaStore::unflatten_metadata(Some(&flat));

        assert_eq!(back.title, "Paper");
        assert_eq!(back.source, "papers/a.pdf");
        assert_eq!(back.author.as_deref(), Some("Doe"));
        assert_eq!(back.page_count, Some(12));
        assert_eq!(back.tags, vec!["ml", "rag"]);
    }

    #[test]
    fn unflatten_tolerates_missing_fields() {
        let back = ChromaStore::unflatten_metadata(None);
        assert!(back.title.is_empty());
        assert!(back.tags.is_empty());
        assert!(back.page_count.is_none());
    }

    #[test]
    fn url_building() {
        let store = ChromaStore::new("http://localhost:8000/").unwrap();
        assert_eq!(
            store.url("collections"),
            "http://localhost:8000/api/v1/collections"
        );
    }
}
