//! LLM layer
//!
//! This module handles every call to a remote language model:
//! - Provider abstraction (OpenRouter, Gemini)
//! - Request/response types shared by the providers
//! - Building a provider from the user's selection and API keys

pub mod types;
pub mod provider;
pub mod openrouter;
pub mod gemini;

// Re-export key types
pub use types::{Message, Role, CompletionResponse, Usage};
pub use provider::{connect, LLMProvider, ModelMetadata};
pub use openrouter::OpenRouterProvider;
pub use gemini::GeminiProvider;
