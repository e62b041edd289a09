//! LLM client abstraction and provider selection.
//!
//! Every provider implements [`LlmClient`]; callers pick one at runtime via
//! [`Provider`] or by name through [`LlmClientFactory`], so application code
//! never depends on a concrete backend.

use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Generic LLM client trait for provider abstraction.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion from a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with a system prompt.
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate with conversation history as (role, content) pairs.
    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String>;

    /// Generate from a text prompt plus local image files.
    ///
    /// Only multimodal providers override this; the default is an error.
    async fn generate_with_images(&self, _prompt: &str, _image_paths: &[String]) -> Result<String> {
        Err(AppError::Llm(format!(
            "Model '{}' does not support image input",
            self.model_name()
        )))
    }

    /// Stream a completion chunk by chunk.
    async fn stream(
        &self,
        prompt: &str,
    ) -> Result<Box<dyn futures::Stream<Item = Result<String>> + Send + Unpin>>;

    /// The model identifier this client talks to.
    fn model_name(&self) -> &str;

    /// Static description of the model and its capabilities.
    fn model_info(&self) -> ModelInfo;
}

/// Description of a model behind an [`LlmClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub provider: String,
    pub supports_streaming: bool,
    pub supports_vision: bool,
}

/// Provider enum for runtime selection.
#[derive(Debug, Clone)]
pub enum Provider {
    /// Google Gemini via the Generative Language API.
    Gemini { api_key: String, model: String },

    /// OpenAI API and compatible endpoints.
    #[cfg(feature = "openai")]
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// Local Ollama server.
    #[cfg(feature = "ollama")]
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Create a client instance for this provider.
    pub async fn create_client(&self) -> Result<Box<dyn LlmClient>> {
        match self {
            Provider::Gemini { api_key, model } => Ok(Box::new(
                super::gemini::GeminiClient::new(api_key.clone(), model.clone())?,
            )),

            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => Ok(Box::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            ))),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone())?,
            )),
        }
    }

    /// Human-readable provider name.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini { .. } => "Gemini",
            #[cfg(feature = "openai")]
            Provider::OpenAI { .. } => "OpenAI",
            #[cfg(feature = "ollama")]
            Provider::Ollama { .. } => "Ollama",
        }
    }

    /// The model this provider is configured for.
    pub fn model(&self) -> &str {
        match self {
            Provider::Gemini { model, .. } => model,
            #[cfg(feature = "openai")]
            Provider::OpenAI { model, .. } => model,
            #[cfg(feature = "ollama")]
            Provider::Ollama { model, .. } => model,
        }
    }
}

/// Builds providers from configuration and provider names.
///
/// The factory owns a default provider and resolves `"gemini"`, `"openai"`,
/// and `"ollama"` by name; anything else is an invalid-input error.
pub struct LlmClientFactory {
    default_provider: Provider,
    config: crate::config::ProviderConfig,
}

impl LlmClientFactory {
    /// Create a factory with an explicit default provider.
    pub fn new(default_provider: Provider, config: crate::config::ProviderConfig) -> Self {
        Self {
            default_provider,
            config,
        }
    }

    /// Pick the default provider from configuration: Gemini when a Google
    /// key is present, otherwise Ollama (when enabled).
    #[allow(unreachable_code)]
    pub fn from_config(config: &crate::config::ProviderConfig) -> Result<Self> {
        if let Some(ref key) = config.google_api_key {
            let provider = Provider::Gemini {
                api_key: key.clone(),
                model: config.generation_model.clone(),
            };
            return Ok(Self::new(provider, config.clone()));
        }

        #[cfg(feature = "ollama")]
        {
            let provider = Provider::Ollama {
                base_url: config.ollama_url.clone(),
                model: config.generation_model.clone(),
            };
            return Ok(Self::new(provider, config.clone()));
        }

        Err(AppError::Configuration(
            "No LLM provider available: set GOOGLE_API_KEY or enable the 'ollama' feature"
                .to_string(),
        ))
    }

    /// Create a client using the default provider.
    pub async fn create_default(&self) -> Result<Box<dyn LlmClient>> {
        self.default_provider.create_client().await
    }

    /// Resolve a provider by name and create a client for it.
    pub async fn create_by_name(&self, name: &str) -> Result<Box<dyn LlmClient>> {
        self.provider_by_name(name)?.create_client().await
    }

    /// Resolve a provider by name using the factory's configuration.
    pub fn provider_by_name(&self, name: &str) -> Result<Provider> {
        match name.to_lowercase().as_str() {
            "gemini" | "google" => {
                let api_key = self.config.google_api_key.clone().ok_or_else(|| {
                    AppError::Configuration(
                        "Google API key is required. Set GOOGLE_API_KEY".to_string(),
                    )
                })?;
                Ok(Provider::Gemini {
                    api_key,
                    model: self.config.generation_model.clone(),
                })
            }

            #[cfg(feature = "openai")]
            "openai" => {
                let api_key = self.config.openai_api_key.clone().ok_or_else(|| {
                    AppError::Configuration(
                        "OpenAI API key is required. Set OPENAI_API_KEY".to_string(),
                    )
                })?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: "https://api.openai.com/v1".to_string(),
                    model: self.config.generation_model.clone(),
                })
            }

            #[cfg(feature = "ollama")]
            "ollama" => Ok(Provider::Ollama {
                base_url: self.config.ollama_url.clone(),
                model: self.config.generation_model.clone(),
            }),

            other => Err(AppError::InvalidInput(format!(
                "Unsupported model type: {}",
                other
            ))),
        }
    }

    /// The configured default provider.
    pub fn default_provider(&self) -> &Provider {
        &self.default_provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;

    fn provider_config() -> ProviderConfig {
        ProviderConfig {
            google_api_key: Some("test-key".to_string()),
            openai_api_key: None,
            ollama_url: "http://localhost:11434".to_string(),
            generation_model: "gemini-1.5-pro".to_string(),
            embedding_model: "models/embedding-001".to_string(),
        }
    }

    #[test]
    fn provider_reports_name_and_model() {
        let provider = Provider::Gemini {
            api_key: "k".to_string(),
            model: "gemini-1.5-flash".to_string(),
        };
        assert_eq!(provider.name(), "Gemini");
        assert_eq!(provider.model(), "gemini-1.5-flash");
    }

    #[test]
    fn factory_prefers_gemini_when_key_present() {
        let factory = LlmClientFactory::from_config(&provider_config()).unwrap();
        assert_eq!(factory.default_provider().name(), "Gemini");
    }

    #[cfg(feature = "ollama")]
    #[test]
    fn factory_falls_back_to_ollama_without_key() {
        let mut config = provider_config();
        config.google_api_key = None;
        let factory = LlmClientFactory::from_config(&config).unwrap();
        assert_eq!(factory.default_provider().name(), "Ollama");
    }

    #[test]
    fn unknown_provider_name_is_rejected() {
        let factory = LlmClientFactory::from_config(&provider_config()).unwrap();
        let err = factory.provider_by_name("claude").unwrap_err();
        assert!(err.to_string().contains("Unsupported model type"));
    }

    #[test]
    fn provider_name_resolution_is_case_insensitive() {
        let factory = LlmClientFactory::from_config(&provider_config()).unwrap();
        assert_eq!(factory.provider_by_name("GEMINI").unwrap().name(), "Gemini");
    }
}
