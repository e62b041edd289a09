//! Qdrant vector store (feature `qdrant`).
//!
//! Stores chunk content and document metadata in the point payload so
//! results round-trip without a side channel.

use crate::types::{AppError, Document, DocumentMetadata, Result, SearchResult};
use async_trait::async_trait;
use qdrant_client::{
    Qdrant,
    qdrant::{
        CreateCollectionBuilder, DeletePointsBuilder, Distance, PointId, PointStruct,
        SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
        point_id::PointIdOptions,
    },
};
use std::collections::HashMap;

use super::vectorstore::{CollectionInfo, CollectionStats, VectorStore};

pub struct QdrantStore {
    client: Qdrant,
}

impl QdrantStore {
    pub fn new(url: String, api_key: Option<String>) -> Result<Self> {
        let client = if let Some(key) = api_key {
            Qdrant::from_url(&url)
                .api_key(key)
                .build()
                .map_err(|e| AppError::VectorStore(format!("Failed to create Qdrant client: {}", e)))?
        } else {
            Qdrant::from_url(&url)
                .build()
                .map_err(|e| AppError::VectorStore(format!("Failed to create Qdrant client: {}", e)))?
        };

        Ok(Self { client })
    }

    fn payload_for(document: &Document) -> HashMap<String, qdrant_client::qdrant::Value> {
        let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
        payload.insert("content".to_string(), document.content.clone().into());
        payload.insert("title".to_string(), document.metadata.title.clone().into());
        payload.insert("source".to_string(), document.metadata.source.clone().into());
        payload.insert(
            "created_at".to_string(),
            document.metadata.created_at.timestamp().into(),
        );
        if let Some(ref author) = document.metadata.author {
            payload.insert("author".to_string(), author.clone().into());
        }
        if let Some(pages) = document.metadata.page_count {
            payload.insert("page_count".to_string(), (pages as i64).into());
        }
        payload.insert(
            "tags".to_string(),
            serde_json::to_value(&document.metadata.tags)
                .unwrap_or(serde_json::Value::Null)
                .into(),
        );
        payload
    }

    fn parse_search_results(
        &self,
        search_result: qdrant_client::qdrant::SearchResponse,
    ) -> Vec<SearchResult> {
        search_result
            .result
            .into_iter()
            .filter_map(|scored_point| {
                let payload = scored_point.payload;
                let content = payload.get("content")?.as_str()?.to_string();
                let title = payload.get("title")?.as_str()?.to_string();
                let source = payload.get("source")?.as_str()?.to_string();
                let created_at_ts = payload.get("created_at")?.as_integer()?;
                let author = payload
                    .get("author")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                let page_count = payload
                    .get("page_count")
                    .and_then(|v| v.as_integer())
                    .map(|n| n as usize);
                let tags: Vec<String> = payload
                    .get("tags")
                    .and_then(|v| serde_json::from_value(v.clone().into()).ok())
                    .unwrap_or_default();

                let id = match scored_point.id?.point_id_options? {
                    PointIdOptions::Num(num) => num.to_string(),
                    PointIdOptions::Uuid(uuid) => uuid,
                };

                Some(SearchResult {
                    document: Document {
                        id,
                        content,
                        metadata: DocumentMetadata {
                            title,
                            source,
                            author,
                            page_count,
                            created_at: chrono::DateTime::from_timestamp(created_at_ts, 0)?,
                            tags,
                        },
                        embedding: None,
                    },
                    score: scored_point.score,
                })
            })
            .collect()
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn provider_name(&self) -> &'static str {
        "qdrant"
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        if self.collection_exists(name).await? {
            return Err(AppError::InvalidInput(format!(
                "Collection '{}' already exists",
                name
            )));
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to create collection: {}", e)))?;

        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.client
            .delete_collection(name)
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to delete collection: {}", e)))?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to list collections: {}", e)))?;

        let mut result = Vec::new();
        for col in collections.collections {
            if let Ok(info) = self.client.collection_info(&col.name).await {
                let count = info
                    .result
                    .as_ref()
                    .map(|r| r.points_count.unwrap_or(0) as usize)
                    .unwrap_or(0);
                let dims = info
                    .result
                    .and_then(|r| {
                        r.config
                            .and_then(|c| c.params)
                            .and_then(|p| p.vectors_config)
                            .and_then(|v| match v.config {
                                Some(qdrant_client::qdrant::vectors_config::Config::Params(p)) => {
                                    Some(p.size as usize)
                                }
                                _ => None,
                            })
                    })
                    .unwrap_or(0);
                result.push(CollectionInfo {
                    name: col.name,
                    document_count: count,
                    dimensions: dims,
                });
            }
        }

        Ok(result)
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to list collections: {}", e)))?;

        Ok(collections.collections.iter().any(|c| c.name == name))
    }

    async fn collection_stats(&self, name: &str) -> Result<CollectionStats> {
        let info = self
            .client
            .collection_info(name)
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to get collection info: {}", e)))?;

        let result = info
            .result
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}' not found", name)))?;

        let document_count = result.points_count.unwrap_or(0) as usize;
        let dimensions = result
            .config
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| match v.config {
                Some(qdrant_client::qdrant::vectors_config::Config::Params(p)) => {
                    Some(p.size as usize)
                }
                _ => None,
            })
            .unwrap_or(0);

        Ok(CollectionStats {
            name: name.to_string(),
            document_count,
            dimensions,
            index_size_bytes: None,
            distance_metric: "cosine".to_string(),
        })
    }

    async fn upsert(&self, collection: &str, documents: &[Document]) -> Result<usize> {
        let mut points = Vec::with_capacity(documents.len());

        for document in documents {
            let embedding = document.embedding.as_ref().ok_or_else(|| {
                AppError::InvalidInput(format!("Document '{}' is missing embedding", document.id))
            })?;

            points.push(PointStruct::new(
                document.id.clone(),
                embedding.clone(),
                Self::payload_for(document),
            ));
        }

        let count = points.len();
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to upsert points: {}", e)))?;

        Ok(count)
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        let builder = SearchPointsBuilder::new(collection, embedding.to_vec(), limit as u64)
            .score_threshold(threshold)
            .with_payload(true);

        let search_result = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to search: {}", e)))?;

        Ok(self.parse_search_results(search_result))
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<usize> {
        let point_ids: Vec<PointId> = ids
            .iter()
            .map(|id| {
                if let Ok(num) = id.parse::<u64>() {
                    PointId {
                        point_id_options: Some(PointIdOptions::Num(num)),
                    }
                } else {
                    PointId {
                        point_id_options: Some(PointIdOptions::Uuid(id.to_string())),
                    }
                }
            })
            .collect();

        let count = point_ids.len();
        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(point_ids)
                    .wait(true),
            )
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to delete points: {}", e)))?;

        Ok(count)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        use qdrant_client::qdrant::GetPointsBuilder;

        let point_id: PointId = if let Ok(num) = id.parse::<u64>() {
            PointId {
                point_id_options: Some(PointIdOptions::Num(num)),
            }
        } else {
            PointId {
                point_id_options: Some(PointIdOptions::Uuid(id.to_string())),
            }
        };

        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(collection, vec![point_id])
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to get point: {}", e)))?;

        let Some(point) = response.result.into_iter().next() else {
            return Ok(None);
        };

        let payload = point.payload;
        let content = payload
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let title = payload
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let source = payload
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let created_at = payload
            .get("created_at")
            .and_then(|v| v.as_integer())
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(chrono::Utc::now);

        Ok(Some(Document {
            id: id.to_string(),
            content,
            metadata: DocumentMetadata {
                title,
                source,
                author: payload
                    .get("author")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                page_count: payload
                    .get("page_count")
                    .and_then(|v| v.as_integer())
                    .map(|n| n as usize),
                created_at,
                tags: payload
                    .get("tags")
                    .and_then(|v| serde_json::from_value(v.clone().into()).ok())
                    .unwrap_or_default(),
            },
            embedding: None,
        }))
    }
}
