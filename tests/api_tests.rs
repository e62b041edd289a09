//! HTTP API tests over the real router with injected test doubles.

mod common;

use axum_test::TestServer;
use common::mocks::{test_config, EchoLlm, HashEmbedder};
use serde_json::{json, Value};
use std::sync::Arc;

use vellum::rag::{RagPipeline, TextChunker};
use vellum::store::InMemoryStore;
use vellum::AppState;

fn test_server() -> TestServer {
    let config = test_config();
    let pipeline = RagPipeline::new(
        TextChunker::with_word_chunking(config.rag.chunk_size, config.rag.chunk_overlap).unwrap(),
        Arc::new(HashEmbedder),
        Arc::new(InMemoryStore::new()),
        Arc::new(EchoLlm::new()),
    )
    .with_top_k(config.rag.top_k);

    let state = AppState {
        pipeline: Arc::new(pipeline),
        config: Arc::new(config),
    };

    let app = vellum::api::create_router().with_state(state);
    TestServer::new(app).expect("failed to start test server")
}

#[tokio::test]
async fn health_reports_ok() {
    let server = test_server();

    let response = server.get("/api/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].as_str().is_some());
}

#[tokio::test]
async fn ingest_then_search_roundtrip() {
    let server = test_server();

    let response = server
        .post("/api/rag/ingest")
        .json(&json!({
            "collection": "docs",
            "content": "Rust is a systems programming language with a borrow checker \
                        that enforces memory safety at compile time.",
            "title": "Rust notes",
            "source": "notes.txt",
            "tags": ["rust"]
        }))
        .await;
    response.assert_status_ok();

    let ingest: Value = response.json();
    assert_eq!(ingest["collection"], "docs");
    assert!(ingest["chunks_created"].as_u64().unwrap() >= 1);

    let response = server
        .post("/api/rag/search")
        .json(&json!({
            "collection": "docs",
            "query": "borrow checker memory safety",
            "limit": 5
        }))
        .await;
    response.assert_status_ok();

    let search: Value = response.json();
    assert_eq!(search["strategy"], "semantic");
    assert!(search["total"].as_u64().unwrap() >= 1);
    assert_eq!(search["results"][0]["metadata"]["title"], "Rust notes");
}

#[tokio::test]
async fn query_returns_answer_with_sources() {
    let server = test_server();

    server
        .post("/api/rag/ingest")
        .json(&json!({
            "collection": "docs",
            "content": "HNSW builds a layered proximity graph for approximate nearest \
                        neighbor search in logarithmic time.",
            "title": "HNSW"
        }))
        .await
        .assert_status_ok();

    let response = server
        .post("/api/rag/query")
        .json(&json!({
            "collection": "docs",
            "query": "How does HNSW search?"
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["answer"], "mock answer");
    assert_eq!(body["model"], "echo-model");
    assert!(!body["sources"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn search_unknown_collection_is_404() {
    let server = test_server();

    let response = server
        .post("/api/rag/search")
        .json(&json!({ "collection": "ghost", "query": "anything" }))
        .await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn ingest_validates_input() {
    let server = test_server();

    let response = server
        .post("/api/rag/ingest")
        .json(&json!({ "collection": "", "content": "text" }))
        .await;
    response.assert_status_bad_request();

    let response = server
        .post("/api/rag/ingest")
        .json(&json!({ "collection": "docs", "content": "" }))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn bad_strategy_is_rejected() {
    let server = test_server();

    server
        .post("/api/rag/ingest")
        .json(&json!({ "collection": "docs", "content": "some indexed text here" }))
        .await
        .assert_status_ok();

    let response = server
        .post("/api/rag/search")
        .json(&json!({
            "collection": "docs",
            "query": "text",
            "strategy": "pagerank"
        }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn collections_lifecycle_over_http() {
    let server = test_server();

    server
        .post("/api/rag/ingest")
        .json(&json!({ "collection": "papers", "content": "vector search content" }))
        .await
        .assert_status_ok();

    let response = server.get("/api/rag/collections").await;
    response.assert_status_ok();
    let list: Value = response.json();
    assert_eq!(list[0]["name"], "papers");
    assert!(list[0]["document_count"].as_u64().unwrap() >= 1);

    let response = server.delete("/api/rag/collections/papers").await;
    response.assert_status_ok();
    let deleted: Value = response.json();
    assert_eq!(deleted["collection"], "papers");

    let response = server.get("/api/rag/collections").await;
    let list: Value = response.json();
    assert!(list.as_array().unwrap().is_empty());

    // Deleting again is a 404.
    server
        .delete("/api/rag/collections/papers")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn per_request_chunking_strategy() {
    let server = test_server();

    let response = server
        .post("/api/rag/ingest")
        .json(&json!({
            "collection": "docs",
            "content": "First sentence about retrieval. Second sentence about generation. \
                        Third sentence about indexing.",
            "chunking_strategy": "sentence"
        }))
        .await;
    response.assert_status_ok();

    let response = server
        .post("/api/rag/ingest")
        .json(&json!({
            "collection": "docs",
            "content": "text",
            "chunking_strategy": "token"
        }))
        .await;
    response.assert_status_bad_request();
}
