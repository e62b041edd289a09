use crate::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the application router with CORS and request tracing.
pub fn create_router() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(crate::api::handlers::health))
        .route("/api/rag/ingest", post(crate::api::handlers::rag::ingest))
        .route("/api/rag/search", post(crate::api::handlers::rag::search))
        .route("/api/rag/query", post(crate::api::handlers::rag::query))
        .route(
            "/api/rag/collections",
            get(crate::api::handlers::rag::list_collections),
        )
        .route(
            "/api/rag/collections/{name}",
            axum::routing::delete(crate::api::handlers::rag::delete_collection),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
