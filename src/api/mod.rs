//! HTTP API layer, built on Axum.
//!
//! # Endpoints
//!
//! - `POST /api/rag/ingest` - chunk, embed, and store raw text
//! - `POST /api/rag/search` - retrieve chunks (semantic/bm25/fuzzy/hybrid)
//! - `POST /api/rag/query` - full RAG answer with source attributions
//! - `GET /api/rag/collections` - list collections
//! - `DELETE /api/rag/collections/{name}` - drop a collection
//! - `GET /api/health` - liveness probe
//!
//! Errors surface as JSON `{"error": "..."}` with the status mapped from
//! [`crate::types::AppError`].

/// Request and response handlers.
pub mod handlers;
/// Router assembly.
pub mod routes;

pub use routes::create_router;

use utoipa::OpenApi;

/// OpenAPI document for the REST surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::rag::ingest,
        handlers::rag::search,
        handlers::rag::query,
        handlers::rag::list_collections,
        handlers::rag::delete_collection,
    ),
    components(schemas(
        crate::types::DocumentMetadata,
        crate::store::CollectionInfo,
        crate::types::IngestRequest,
        crate::types::IngestResponse,
        crate::types::SearchRequest,
        crate::types::SearchResponse,
        crate::types::SearchResultItem,
        crate::types::QueryRequest,
        crate::types::QueryResponse,
        crate::types::SourceAttribution,
        crate::types::DeleteCollectionResponse,
        crate::types::HealthResponse,
    )),
    tags(
        (name = "rag", description = "Ingestion, retrieval, and question answering"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
