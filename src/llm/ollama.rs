//! Ollama client for local inference (feature `ollama`).

use crate::llm::client::{LlmClient, ModelInfo};
use crate::types::{AppError, Result};
use async_stream::stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
};

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Result<Self> {
        let (host, port) = parse_host_port(&base_url);
        let client = Ollama::new(host, port);
        Ok(Self { client, model })
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatMessageRequest::new(self.model.clone(), messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::Llm(format!("Ollama error: {}", e)))?;

        Ok(response.message.content)
    }
}

/// Split `http://host:port` into its pieces, defaulting to localhost:11434.
fn parse_host_port(base_url: &str) -> (String, u16) {
    let without_scheme = base_url.split("://").nth(1).unwrap_or(base_url);
    let mut parts = without_scheme.split(':');
    let host = match parts.next() {
        Some(h) if !h.is_empty() => h.to_string(),
        _ => "localhost".to_string(),
    };
    let port = parts
        .next()
        .and_then(|p| p.trim_end_matches('/').parse().ok())
        .unwrap_or(11434);
    (host, port)
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(vec![ChatMessage::user(prompt.to_string())]).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(vec![
            ChatMessage::system(system.to_string()),
            ChatMessage::user(prompt.to_string()),
        ])
        .await
    }

    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        let chat_messages: Vec<ChatMessage> = messages
            .iter()
            .map(|(role, content)| match role.as_str() {
                "system" => ChatMessage::system(content.clone()),
                "assistant" => ChatMessage::assistant(content.clone()),
                _ => ChatMessage::user(content.clone()),
            })
            .collect();

        self.chat(chat_messages).await
    }

    async fn stream(
        &self,
        prompt: &str,
    ) -> Result<Box<dyn Stream<Item = Result<String>> + Send + Unpin>> {
        let messages = vec![ChatMessage::user(prompt.to_string())];
        let request = ChatMessageRequest::new(self.model.clone(), messages);

        let mut stream_response = self
            .client
            .send_chat_messages_stream(request)
            .await
            .map_err(|e| AppError::Llm(format!("Ollama stream error: {}", e)))?;

        let output_stream = stream! {
            while let Some(chunk_result) = stream_response.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        let content = chunk.message.content;
                        if !content.is_empty() {
                            yield Ok(content);
                        }
                    }
                    Err(_) => {
                        yield Err(AppError::Llm("Stream chunk error".to_string()));
                        break;
                    }
                }
            }
        };

        Ok(Box::new(Box::pin(output_stream)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            name: self.model.clone(),
            provider: "Ollama".to_string(),
            supports_streaming: true,
            supports_vision: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_url() {
        assert_eq!(
            parse_host_port("http://localhost:11434"),
            ("localhost".to_string(), 11434)
        );
    }

    #[test]
    fn defaults_missing_port() {
        assert_eq!(
            parse_host_port("http://localhost"),
            ("localhost".to_string(), 11434)
        );
    }

    #[test]
    fn parses_custom_host_and_port() {
        assert_eq!(
            parse_host_port("http://192.168.1.100:8080"),
            ("192.168.1.100".to_string(), 8080)
        );
    }

    #[test]
    fn tolerates_missing_scheme() {
        assert_eq!(
            parse_host_port("localhost:9999"),
            ("localhost".to_string(), 9999)
        );
    }
}
