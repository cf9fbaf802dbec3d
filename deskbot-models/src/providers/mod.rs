//! Capability traits and their HTTP implementations.
//!
//! [`EmbeddingProvider`] and [`CompletionProvider`] are the only two things
//! the rest of deskbot knows about AI backends. Either may fail with a
//! provider [`Error`](crate::Error); callers decide how to degrade.
//!
//! # Example
//!
//! ```ignore
//! use deskbot_models::{CompletionProvider, CompletionRequest, OpenAiProvider};
//!
//! async fn answer(provider: &dyn CompletionProvider) -> deskbot_models::Result<String> {
//!     let request = CompletionRequest::new("You are a support agent.", "Where is my order?")
//!         .with_max_tokens(500);
//!     provider.complete(request).await
//! }
//! ```

mod ollama;
mod openai;
mod types;

use async_trait::async_trait;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use types::{CompletionRequest, Embedding, OutputFormat};

use crate::Result;

/// Converts text into a fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name for logs (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Any quota, network or model failure.
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// Generates text from a system instruction and a user turn.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logs (e.g., "gemini", "ollama").
    fn name(&self) -> &str;

    /// Run one completion.
    ///
    /// A successful call may return empty text; callers treat that as a
    /// soft failure.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Echoes the user turn back, prefixed with the system instruction.
    struct EchoProvider;

    #[async_trait]
    impl CompletionProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<String> {
            Ok(format!("[{}] {}", request.system_instruction, request.user_text))
        }
    }

    #[async_trait]
    impl EmbeddingProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn embed(&self, text: &str) -> Result<Embedding> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    #[tokio::test]
    async fn completion_trait_object_dispatches() {
        let provider: Arc<dyn CompletionProvider> = Arc::new(EchoProvider);
        let text = provider
            .complete(CompletionRequest::new("sys", "hello"))
            .await
            .unwrap();
        assert_eq!(text, "[sys] hello");
    }

    #[tokio::test]
    async fn embedding_trait_object_dispatches() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(EchoProvider);
        let vector = provider.embed("abc").await.unwrap();
        assert_eq!(vector, vec![3.0, 1.0]);
    }
}
