//! LLM integration crate for crimestat.
//!
//! This crate provides a provider-agnostic abstraction for chat completions.
//! The retrieval core never depends on it; only the chat handler does.
//!
//! # Providers
//! - **OpenAI-compatible**: Groq (default) and OpenAI chat completions
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use crimestat_llm::{ChatMessage, LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new(vec![ChatMessage::user("Hola")], "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{ChatMessage, ChatRole, LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiCompatClient};
pub use types::ProviderType;
