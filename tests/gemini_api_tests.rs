//! Wire-level tests for the Gemini clients against a mocked API server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vellum::llm::{GeminiClient, LlmClient};
use vellum::rag::{EmbeddingProvider, GeminiEmbedder};

fn generate_response(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 4, "candidatesTokenCount": 8, "totalTokenCount": 12 }
    })
}

#[tokio::test]
async fn generate_parses_candidate_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(generate_response("Hello from Gemini")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new("test-key".to_string(), "gemini-1.5-pro".to_string())
        .unwrap()
        .with_base_url(server.uri());

    let answer = client.generate("Say hello").await.unwrap();
    assert_eq!(answer, "Hello from Gemini");
}

#[tokio::test]
async fn system_prompt_is_sent_as_system_instruction() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
        .and(body_partial_json(json!({
            "systemInstruction": { "parts": [{ "text": "Be terse." }] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(generate_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new("test-key".to_string(), "gemini-1.5-pro".to_string())
        .unwrap()
        .with_base_url(server.uri());

    let answer = client.generate_with_system("Be terse.", "hi").await.unwrap();
    assert_eq!(answer, "ok");
}

#[tokio::test]
async fn history_maps_assistant_to_model_role() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
        .and(body_partial_json(json!({
            "contents": [
                { "role": "user", "parts": [{ "text": "first" }] },
                { "role": "model", "parts": [{ "text": "reply" }] },
                { "role": "user", "parts": [{ "text": "second" }] }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(generate_response("done")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new("test-key".to_string(), "gemini-1.5-pro".to_string())
        .unwrap()
        .with_base_url(server.uri());

    let messages = vec![
        ("user".to_string(), "first".to_string()),
        ("assistant".to_string(), "reply".to_string()),
        ("user".to_string(), "second".to_string()),
    ];

    let answer = client.generate_with_history(&messages).await.unwrap();
    assert_eq!(answer, "done");
}

#[tokio::test]
async fn api_errors_surface_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
        .respond_with(
            ResponseTemplate::new(429).set_body_string(r#"{"error":"rate limited"}"#),
        )
        .mount(&server)
        .await;

    let client = GeminiClient::new("test-key".to_string(), "gemini-1.5-pro".to_string())
        .unwrap()
        .with_base_url(server.uri());

    let err = client.generate("hello").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("429"));
    assert!(message.contains("rate limited"));
}

#[tokio::test]
async fn empty_candidates_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let client = GeminiClient::new("test-key".to_string(), "gemini-1.5-pro".to_string())
        .unwrap()
        .with_base_url(server.uri());

    assert!(client.generate("hello").await.is_err());
}

#[tokio::test]
async fn embed_content_parses_values() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/embedding-001:embedContent"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embedding": { "values": [0.1, 0.2, 0.3] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = GeminiEmbedder::new("test-key".to_string(), "models/embedding-001".to_string())
        .unwrap()
        .with_base_url(server.uri());

    let embedding = embedder.embed("hello").await.unwrap();
    assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn batch_embed_preserves_order_and_count() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/embedding-001:batchEmbedContents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [
                { "values": [1.0, 0.0] },
                { "values": [0.0, 1.0] }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = GeminiEmbedder::new("test-key".to_string(), "models/embedding-001".to_string())
        .unwrap()
        .with_base_url(server.uri());

    let embeddings = embedder
        .embed_batch(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    assert_eq!(embeddings.len(), 2);
    assert_eq!(embeddings[0], vec![1.0, 0.0]);
    assert_eq!(embeddings[1], vec![0.0, 1.0]);
}

#[tokio::test]
async fn batch_embed_rejects_count_mismatch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/embedding-001:batchEmbedContents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [ { "values": [1.0, 0.0] } ]
        })))
        .mount(&server)
        .await;

    let embedder = GeminiEmbedder::new("test-key".to_string(), "models/embedding-001".to_string())
        .unwrap()
        .with_base_url(server.uri());

    let result = embedder
        .embed_batch(&["first".to_string(), "second".to_string()])
        .await;

    assert!(result.is_err());
}
