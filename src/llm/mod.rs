//! LLM provider clients and abstractions.
//!
//! A unified interface over the generation backends named in the project's
//! dependency surface: Google Gemini (default, multimodal), OpenAI, and
//! local Ollama. The [`LlmClient`] trait hides the wire differences;
//! [`Provider`] and [`LlmClientFactory`] select a backend at runtime.
//!
//! # Example
//!
//! ```ignore
//! use vellum::llm::{LlmClientFactory, Provider};
//!
//! let factory = LlmClientFactory::from_config(&config.providers)?;
//! let client = factory.create_default().await?;
//! let answer = client.generate("What is retrieval-augmented generation?").await?;
//! ```
//!
//! # Streaming
//!
//! All providers stream through `stream()`, which yields text chunks as a
//! `Stream<Item = Result<String>>`.

/// Core LLM client trait, provider enum, and factory.
pub mod client;
/// Google Gemini over the Generative Language API.
pub mod gemini;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LlmClient, LlmClientFactory, ModelInfo, Provider};
pub use gemini::GeminiClient;
