//! LLM integration crate for the Ratewise CLI.
//!
//! This crate provides a provider-agnostic abstraction for the single
//! model-call boundary of the query pipeline: one prompt in, one completion
//! out, with a bounded deadline and an explicit failure signal distinct
//! from an empty completion.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI**: Hosted chat-completion models
//!
//! # Example
//! ```no_run
//! use ratewise_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
