//! AI capabilities for deskbot.
//!
//! This crate provides:
//! - [`EmbeddingProvider`] for turning text into fixed-length vectors
//! - [`CompletionProvider`] for generating text from a system instruction
//!   and a user turn
//! - HTTP implementations for OpenAI-compatible endpoints and Ollama
//! - Credential management for API keys
//!
//! The two capabilities are separate traits; the embedding backend and the
//! completion backend are configured independently.
//!
//! ```text
//! ┌───────────────────────┐     ┌────────────────────────┐
//! │   EmbeddingProvider   │     │   CompletionProvider   │
//! │  embed(text) -> [f32] │     │ complete(req) -> text  │
//! └───────────┬───────────┘     └────────────┬───────────┘
//!             │                              │
//!     ┌───────┴────────┐           ┌─────────┴────────┐
//!     │ OpenAiProvider │           │  OpenAiProvider  │
//!     │ OllamaProvider │           │  OllamaProvider  │
//!     └────────────────┘           └──────────────────┘
//! ```

mod error;

pub mod auth;
pub mod providers;

pub use error::{Error, Result};
pub use providers::{
    CompletionProvider, CompletionRequest, Embedding, EmbeddingProvider, OllamaProvider,
    OpenAiProvider, OutputFormat,
};
