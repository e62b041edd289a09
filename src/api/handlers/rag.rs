//! RAG API handlers: ingestion, search, question answering, collections.

use crate::rag::chunker::TextChunker;
use crate::rag::search::SearchStrategy;
use crate::types::{
    AppError, DeleteCollectionResponse, DocumentMetadata, IngestRequest, IngestResponse,
    QueryRequest, QueryResponse, Result, SearchRequest, SearchResponse, SearchResultItem,
    SourceAttribution,
};
use crate::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use std::time::Instant;

/// Ingest raw text into a collection.
///
/// The content is chunked, embedded, and stored; the collection is created
/// on first use with the embedder's dimensionality.
#[utoipa::path(
    post,
    path = "/api/rag/ingest",
    request_body = IngestRequest,
    responses(
        (status = 200, description = "Content ingested", body = IngestResponse),
        (status = 400, description = "Invalid request"),
        (status = 502, description = "Embedding provider failure"),
        (status = 500, description = "Internal server error")
    ),
    tag = "rag"
)]
pub async fn ingest(
    State(state): State<AppState>,
    Json(payload): Json<IngestRequest>,
) -> Result<Json<IngestResponse>> {
    let start = Instant::now();

    if payload.collection.is_empty() {
        return Err(AppError::InvalidInput("Collection name required".into()));
    }
    if payload.content.is_empty() {
        return Err(AppError::InvalidInput("Content required".into()));
    }

    // A per-request strategy overrides the configured chunker.
    let chunker_override = payload
        .chunking_strategy
        .as_deref()
        .map(|s| {
            let strategy = s.parse()?;
            TextChunker::new(
                strategy,
                state.config.rag.chunk_size,
                state.config.rag.chunk_overlap,
            )
        })
        .transpose()?;

    let metadata = DocumentMetadata {
        title: payload.title.clone().unwrap_or_default(),
        source: payload.source.clone().unwrap_or_else(|| "api".to_string()),
        author: None,
        page_count: None,
        created_at: Utc::now(),
        tags: payload.tags.clone(),
    };

    let outcome = state
        .pipeline
        .ingest_text(
            &payload.content,
            metadata,
            &payload.collection,
            chunker_override.as_ref(),
        )
        .await?;

    tracing::info!(
        collection = %payload.collection,
        chunks = outcome.chunks_created,
        duration_ms = start.elapsed().as_millis() as u64,
        "ingest request served"
    );

    Ok(Json(IngestResponse {
        collection: payload.collection,
        chunks_created: outcome.chunks_created,
        document_ids: outcome.document_ids,
    }))
}

/// Search a collection with a selectable strategy.
#[utoipa::path(
    post,
    path = "/api/rag/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Search completed", body = SearchResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Collection not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "rag"
)]
pub async fn search(
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();

    if payload.collection.is_empty() {
        return Err(AppError::InvalidInput("Collection name required".into()));
    }
    if payload.query.is_empty() {
        return Err(AppError::InvalidInput("Query required".into()));
    }

    if !state
        .pipeline
        .store()
        .collection_exists(&payload.collection)
        .await?
    {
        return Err(AppError::NotFound(format!(
            "Collection '{}' not found",
            payload.collection
        )));
    }

    let strategy: SearchStrategy = payload
        .strategy
        .as_deref()
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or_default();

    let results = state
        .pipeline
        .retrieve_with_strategy(
            &payload.query,
            &payload.collection,
            strategy,
            payload.limit,
            payload.threshold,
        )
        .await?;

    let items: Vec<SearchResultItem> = results
        .into_iter()
        .map(|r| SearchResultItem {
            id: r.document.id,
            content: r.document.content,
            score: r.score,
            metadata: r.document.metadata,
        })
        .collect();

    let total = items.len();
    let duration_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        collection = %payload.collection,
        strategy = %strategy,
        results = total,
        duration_ms,
        "search request served"
    );

    Ok(Json(SearchResponse {
        results: items,
        total,
        strategy: strategy.to_string(),
        duration_ms,
    }))
}

/// Answer a question from a collection's content.
#[utoipa::path(
    post,
    path = "/api/rag/query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Answer generated", body = QueryResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Collection not found"),
        (status = 502, description = "LLM provider failure"),
        (status = 500, description = "Internal server error")
    ),
    tag = "rag"
)]
pub async fn query(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();

    if payload.collection.is_empty() {
        return Err(AppError::InvalidInput("Collection name required".into()));
    }
    if payload.query.is_empty() {
        return Err(AppError::InvalidInput("Query required".into()));
    }

    if !state
        .pipeline
        .store()
        .collection_exists(&payload.collection)
        .await?
    {
        return Err(AppError::NotFound(format!(
            "Collection '{}' not found",
            payload.collection
        )));
    }

    let top_k = payload.top_k.unwrap_or(state.config.rag.top_k);
    let threshold = payload
        .threshold
        .unwrap_or(state.config.rag.score_threshold);

    let answer = state
        .pipeline
        .answer_with(&payload.query, &payload.collection, top_k, threshold)
        .await?;

    let duration_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        collection = %payload.collection,
        sources = answer.sources.len(),
        model = %answer.model,
        duration_ms,
        "query request served"
    );

    Ok(Json(QueryResponse {
        answer: answer.answer,
        model: answer.model,
        sources: answer
            .sources
            .into_iter()
            .map(|s| SourceAttribution {
                id: s.id,
                title: s.title,
                source: s.source,
                score: s.score,
            })
            .collect(),
        duration_ms,
    }))
}

/// List collections.
#[utoipa::path(
    get,
    path = "/api/rag/collections",
    responses(
        (status = 200, description = "Collections listed", body = Vec<crate::store::CollectionInfo>),
        (status = 500, description = "Internal server error")
    ),
    tag = "rag"
)]
pub async fn list_collections(
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::store::CollectionInfo>>> {
    let collections = state.pipeline.store().list_collections().await?;
    Ok(Json(collections))
}

/// Delete a collection.
#[utoipa::path(
    delete,
    path = "/api/rag/collections/{name}",
    params(("name" = String, Path, description = "Collection name")),
    responses(
        (status = 200, description = "Collection deleted", body = DeleteCollectionResponse),
        (status = 404, description = "Collection not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "rag"
)]
pub async fn delete_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DeleteCollectionResponse>> {
    let store = state.pipeline.store();

    if !store.collection_exists(&name).await? {
        return Err(AppError::NotFound(format!(
            "Collection '{}' not found",
            name
        )));
    }

    let stats = store.collection_stats(&name).await?;
    store.delete_collection(&name).await?;

    tracing::info!(
        collection = %name,
        documents = stats.document_count,
        "collection deleted"
    );

    Ok(Json(DeleteCollectionResponse {
        collection: name,
        documents_deleted: stats.document_count,
    }))
}
