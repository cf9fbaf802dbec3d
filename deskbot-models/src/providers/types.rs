//! Request types shared by provider implementations.

use serde::{Deserialize, Serialize};

/// A text embedding.
pub type Embedding = Vec<f32>;

/// Shape of the text a completion should produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Free-form text.
    #[default]
    Text,
    /// A single JSON object.
    Json,
}

/// Request for a single-turn completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System instruction steering the model.
    pub system_instruction: String,
    /// The user turn.
    pub user_text: String,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Requested output shape.
    #[serde(default)]
    pub format: OutputFormat,
}

impl CompletionRequest {
    /// Create a new text completion request.
    pub fn new(system_instruction: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_text: user_text.into(),
            max_tokens: None,
            format: OutputFormat::Text,
        }
    }

    /// Cap the number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Ask for a JSON object instead of free text.
    pub fn json(mut self) -> Self {
        self.format = OutputFormat::Json;
        self
    }
}
