//! Google Gemini LLM client.
//!
//! Talks to the Generative Language API v1beta (`:generateContent` and
//! `:streamGenerateContent`) over reqwest. This is the default generation
//! backend and the only multimodal one: `generate_with_images` sends local
//! image files as base64 `inlineData` parts.

use crate::llm::client::{LlmClient, ModelInfo};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use base64::Engine;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Gemini client for API-based inference.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error if the API key is empty, matching
    /// the behavior of provider construction elsewhere: misconfiguration
    /// surfaces at startup, not on the first request.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "Google API key is required. Set GOOGLE_API_KEY or pass a key explicitly"
                    .to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model,
        })
    }

    /// Point the client at a different API host. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            method,
            self.api_key
        )
    }

    /// Build a generateContent body from user/model turns and an optional
    /// system instruction.
    fn build_body(contents: Vec<serde_json::Value>, system: Option<&str>) -> serde_json::Value {
        let mut body = json!({ "contents": contents });
        if let Some(sys) = system {
            body["systemInstruction"] = json!({ "parts": [{ "text": sys }] });
        }
        body
    }

    fn user_turn(text: &str) -> serde_json::Value {
        json!({ "role": "user", "parts": [{ "text": text }] })
    }

    async fn send(&self, body: &serde_json::Value) -> Result<GenerateResponse> {
        let response = self
            .client
            .post(self.endpoint("generateContent"))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Llm(format!("Gemini response read failed: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::Llm(format!(
                "Gemini API error ({}): {}",
                status, text
            )));
        }

        serde_json::from_str(&text)
            .map_err(|e| AppError::Llm(format!("Gemini response parse error: {}", e)))
    }

    /// Pull the first candidate's concatenated text out of a response.
    fn extract_text(response: GenerateResponse) -> Result<String> {
        let text = response
            .candidates
            .into_iter()
            .find_map(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AppError::Llm("Empty response from Gemini".to_string()));
        }
        Ok(text)
    }

    fn mime_type_for(path: &str) -> Result<&'static str> {
        let extension = path.rsplit('.').next().unwrap_or_default().to_lowercase();
        match extension.as_str() {
            "png" => Ok("image/png"),
            "jpg" | "jpeg" => Ok("image/jpeg"),
            "webp" => Ok("image/webp"),
            other => Err(AppError::InvalidInput(format!(
                "Unsupported image type '.{}' (png, jpeg, webp)",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = Self::build_body(vec![Self::user_turn(prompt)], None);
        Self::extract_text(self.send(&body).await?)
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let body = Self::build_body(vec![Self::user_turn(prompt)], Some(system));
        Self::extract_text(self.send(&body).await?)
    }

    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        // Gemini keeps the system prompt out of the turn list.
        let mut system: Option<String> = None;
        let mut contents = Vec::with_capacity(messages.len());

        for (role, content) in messages {
            match role.as_str() {
                "system" => system = Some(content.clone()),
                "assistant" => {
                    contents.push(json!({ "role": "model", "parts": [{ "text": content }] }))
                }
                _ => contents.push(json!({ "role": "user", "parts": [{ "text": content }] })),
            }
        }

        let body = Self::build_body(contents, system.as_deref());
        Self::extract_text(self.send(&body).await?)
    }

    async fn generate_with_images(&self, prompt: &str, image_paths: &[String]) -> Result<String> {
        let mut parts = vec![json!({ "text": prompt })];

        for path in image_paths {
            let mime_type = Self::mime_type_for(path)?;
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| AppError::InvalidInput(format!("Cannot read image {}: {}", path, e)))?;
            let data = base64::engine::general_purpose::STANDARD.encode(bytes);
            parts.push(json!({ "inlineData": { "mimeType": mime_type, "data": data } }));
        }

        let contents = vec![json!({ "role": "user", "parts": parts })];
        let body = Self::build_body(contents, None);
        Self::extract_text(self.send(&body).await?)
    }

    async fn stream(
        &self,
        prompt: &str,
    ) -> Result<Box<dyn futures::Stream<Item = Result<String>> + Send + Unpin>> {
        let body = Self::build_body(vec![Self::user_turn(prompt)], None);
        let url = format!("{}&alt=sse", self.endpoint("streamGenerateContent"));

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!(
                "Gemini API error ({}): {}",
                status, text
            )));
        }

        let mut bytes = response.bytes_stream();

        // The endpoint emits server-sent events: one `data: {json}` line per
        // chunk. Buffer bytes until a full line is available.
        let result_stream = async_stream::stream! {
            let mut buffer = String::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(data) => {
                        buffer.push_str(&String::from_utf8_lossy(&data));
                        while let Some(newline) = buffer.find('\n') {
                            let line: String = buffer.drain(..=newline).collect();
                            let line = line.trim();
                            let Some(payload) = line.strip_prefix("data:") else {
                                continue;
                            };
                            let payload = payload.trim();
                            if payload.is_empty() {
                                continue;
                            }
                            match serde_json::from_str::<GenerateResponse>(payload) {
                                Ok(parsed) => {
                                    if let Ok(text) = Self::extract_text(parsed) {
                                        yield Ok(text);
                                    }
                                }
                                Err(e) => {
                                    yield Err(AppError::Llm(format!(
                                        "Gemini stream parse error: {}",
                                        e
                                    )));
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(AppError::Llm(format!("Gemini stream error: {}", e)));
                        break;
                    }
                }
            }
        };

        Ok(Box::new(Box::pin(result_stream)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            name: self.model.clone(),
            provider: "Google".to_string(),
            supports_streaming: true,
            supports_vision: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_api_key() {
        let result = GeminiClient::new("  ".to_string(), "gemini-1.5-pro".to_string());
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn endpoint_includes_model_and_key() {
        let client = GeminiClient::new("k123".to_string(), "gemini-1.5-pro".to_string()).unwrap();
        let url = client.endpoint("generateContent");
        assert_eq!(
            url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent?key=k123"
        );
    }

    #[test]
    fn system_prompt_becomes_system_instruction() {
        let body = GeminiClient::build_body(
            vec![GeminiClient::user_turn("hi")],
            Some("You are terse."),
        );
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            json!("You are terse.")
        );
        assert_eq!(body["contents"][0]["role"], json!("user"));
    }

    #[test]
    fn extract_text_joins_parts() {
        let response = GenerateResponse {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    parts: vec![
                        CandidatePart {
                            text: Some("Hello ".to_string()),
                        },
                        CandidatePart {
                            text: Some("world".to_string()),
                        },
                    ],
                }),
            }],
        };
        assert_eq!(GeminiClient::extract_text(response).unwrap(), "Hello world");
    }

    #[test]
    fn extract_text_rejects_empty_candidates() {
        let response = GenerateResponse { candidates: vec![] };
        assert!(GeminiClient::extract_text(response).is_err());
    }

    #[test]
    fn mime_type_mapping() {
        assert_eq!(GeminiClient::mime_type_for("fig.png").unwrap(), "image/png");
        assert_eq!(
            GeminiClient::mime_type_for("scan.JPEG").unwrap(),
            "image/jpeg"
        );
        assert!(GeminiClient::mime_type_for("doc.tiff").is_err());
    }

    #[test]
    fn model_info_reports_vision_support() {
        let client = GeminiClient::new("k".to_string(), "gemini-1.5-pro".to_string()).unwrap();
        let info = client.model_info();
        assert_eq!(info.provider, "Google");
        assert!(info.supports_vision);
        assert!(info.supports_streaming);
    }
}
