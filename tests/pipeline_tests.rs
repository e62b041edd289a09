//! End-to-end pipeline tests over deterministic test doubles: hash
//! embedder, in-memory store, canned LLM.

mod common;

use common::mocks::{EchoLlm, HashEmbedder};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use vellum::rag::{ChunkingStrategy, RagPipeline, SearchStrategy, TextChunker};
use vellum::store::InMemoryStore;
use vellum::types::DocumentMetadata;

fn pipeline() -> (RagPipeline, Arc<EchoLlm>) {
    let llm = Arc::new(EchoLlm::new());
    let pipeline = RagPipeline::new(
        TextChunker::with_word_chunking(8, 2).unwrap(),
        Arc::new(HashEmbedder),
        Arc::new(InMemoryStore::new()),
        llm.clone(),
    );
    (pipeline, llm)
}

const RUST_TEXT: &str = "Rust is a systems programming language focused on safety \
    and performance. The borrow checker enforces memory safety at compile time \
    without a garbage collector.";

const COOKING_TEXT: &str = "Slow roasting vegetables brings out their natural \
    sweetness. Season generously with olive oil salt and fresh herbs before \
    placing them in the oven.";

#[tokio::test]
async fn ingest_creates_collection_and_chunks() {
    let (pipeline, _) = pipeline();

    let outcome = pipeline
        .ingest_text(
            RUST_TEXT,
            DocumentMetadata::with_source("rust.txt"),
            "docs",
            None,
        )
        .await
        .unwrap();

    assert!(outcome.chunks_created > 1);
    assert_eq!(outcome.chunks_created, outcome.document_ids.len());
    assert!(pipeline.store().collection_exists("docs").await.unwrap());
    assert_eq!(
        pipeline.store().count("docs").await.unwrap(),
        outcome.chunks_created
    );
}

#[tokio::test]
async fn empty_content_is_rejected() {
    let (pipeline, _) = pipeline();

    let result = pipeline
        .ingest_text(
            "   ",
            DocumentMetadata::with_source("empty.txt"),
            "docs",
            None,
        )
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn retrieve_prefers_on_topic_chunks() {
    let (pipeline, _) = pipeline();

    pipeline
        .ingest_text(
            RUST_TEXT,
            DocumentMetadata::with_source("rust.txt"),
            "docs",
            None,
        )
        .await
        .unwrap();
    pipeline
        .ingest_text(
            COOKING_TEXT,
            DocumentMetadata::with_source("cooking.txt"),
            "docs",
            None,
        )
        .await
        .unwrap();

    let results = pipeline
        .retrieve("borrow checker memory safety", "docs", 3, 0.0)
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert_eq!(results[0].document.metadata.source, "rust.txt");
}

#[tokio::test]
async fn answer_includes_sources() {
    let (pipeline, llm) = pipeline();

    pipeline
        .ingest_text(
            RUST_TEXT,
            DocumentMetadata::with_source("rust.txt"),
            "docs",
            None,
        )
        .await
        .unwrap();

    let answer = pipeline
        .answer("What does the borrow checker enforce?", "docs")
        .await
        .unwrap();

    assert_eq!(answer.answer, "mock answer");
    assert_eq!(answer.model, "echo-model");
    assert!(!answer.sources.is_empty());
    assert_eq!(answer.sources[0].source, "rust.txt");
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_retrieval_skips_the_llm() {
    let (pipeline, llm) = pipeline();

    pipeline
        .ingest_text(
            RUST_TEXT,
            DocumentMetadata::with_source("rust.txt"),
            "docs",
            None,
        )
        .await
        .unwrap();

    // Threshold of 1.1 is unsatisfiable for cosine scores.
    let answer = pipeline
        .answer_with("anything", "docs", 5, 1.1)
        .await
        .unwrap();

    assert!(answer.sources.is_empty());
    assert!(answer.answer.contains("could not find"));
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn strategy_reranking_stays_within_candidates() {
    let (pipeline, _) = pipeline();

    pipeline
        .ingest_text(
            RUST_TEXT,
            DocumentMetadata::with_source("rust.txt"),
            "docs",
            None,
        )
        .await
        .unwrap();
    pipeline
        .ingest_text(
            COOKING_TEXT,
            DocumentMetadata::with_source("cooking.txt"),
            "docs",
            None,
        )
        .await
        .unwrap();

    for strategy in [
        SearchStrategy::Bm25,
        SearchStrategy::Fuzzy,
        SearchStrategy::Hybrid,
    ] {
        let results = pipeline
            .retrieve_with_strategy("borrow checker", "docs", strategy, 3, 0.0)
            .await
            .unwrap();
        assert!(
            results.len() <= 3,
            "{:?} returned more than top_k results",
            strategy
        );
    }
}

#[tokio::test]
async fn bm25_strategy_matches_lexically() {
    let (pipeline, _) = pipeline();

    pipeline
        .ingest_text(
            RUST_TEXT,
            DocumentMetadata::with_source("rust.txt"),
            "docs",
            None,
        )
        .await
        .unwrap();
    pipeline
        .ingest_text(
            COOKING_TEXT,
            DocumentMetadata::with_source("cooking.txt"),
            "docs",
            None,
        )
        .await
        .unwrap();

    let results = pipeline
        .retrieve_with_strategy("roasting vegetables", "docs", SearchStrategy::Bm25, 2, 0.0)
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert_eq!(results[0].document.metadata.source, "cooking.txt");
}

#[tokio::test]
async fn ingest_directory_reports_counts_and_skips() {
    let (pipeline, _) = pipeline();

    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), RUST_TEXT).unwrap();
    std::fs::write(dir.path().join("b.md"), COOKING_TEXT).unwrap();
    std::fs::write(dir.path().join("broken.pdf"), b"not a pdf").unwrap();

    let report = pipeline
        .ingest_directory(dir.path(), "docs")
        .await
        .unwrap();

    assert_eq!(report.documents_loaded, 2);
    assert!(report.chunks_created >= 2);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].0.ends_with("broken.pdf"));
}

#[tokio::test]
async fn captions_become_searchable_tags() {
    let (pipeline, _) = pipeline();

    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("paper.md"),
        "The architecture is shown below.\n\
         Figure 1: Transformer encoder stack\n\
         Results follow in the next section.\n\
         Table 2: Benchmark accuracy",
    )
    .unwrap();

    pipeline.ingest_directory(dir.path(), "docs").await.unwrap();

    let results = pipeline
        .retrieve("transformer encoder architecture", "docs", 5, 0.0)
        .await
        .unwrap();

    assert!(!results.is_empty());
    let tags = &results[0].document.metadata.tags;
    assert!(tags.contains(&"figure-1".to_string()), "tags: {:?}", tags);
    assert!(tags.contains(&"table-2".to_string()), "tags: {:?}", tags);
}

#[tokio::test]
async fn per_request_chunker_override_applies() {
    let (pipeline, _) = pipeline();

    let sentence_chunker = TextChunker::new(ChunkingStrategy::Sentence, 200, 0).unwrap();
    let outcome = pipeline
        .ingest_text(
            RUST_TEXT,
            DocumentMetadata::with_source("rust.txt"),
            "docs",
            Some(&sentence_chunker),
        )
        .await
        .unwrap();

    // 200-char sentence packing produces fewer chunks than the 8-word window.
    assert!(outcome.chunks_created <= 2);
}
