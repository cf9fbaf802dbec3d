//! Operator-controlled bot behaviour.
//!
//! A single [`BotConfig`] row lives in the store. It is read once at the
//! start of each operation and passed down explicitly.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::now;

pub const DEFAULT_SYSTEM_PROMPT: &str = "Você é um assistente de suporte útil e prestativo. Use a base de conhecimento fornecida para responder perguntas de forma clara e profissional em português.";

pub const DEFAULT_FALLBACK_MESSAGE: &str = "Desculpe, não tenho informações suficientes para responder essa pergunta. Um agente humano irá ajudá-lo em breve.";

pub const MAX_TOKENS_LIMIT: u32 = 8192;
pub const MAX_RESPONSE_DELAY_MS: u64 = 60_000;

/// The singleton bot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    pub auto_respond: bool,
    pub require_approval: bool,
    pub response_delay_ms: u64,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub fallback_message: String,
    pub updated_at: DateTime<Utc>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            auto_respond: true,
            require_approval: false,
            response_delay_ms: 2000,
            max_tokens: 500,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
            updated_at: now(),
        }
    }
}

impl BotConfig {
    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.response_delay_ms)
    }
}

/// Partial update of [`BotConfig`]. Absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfigUpdate {
    pub auto_respond: Option<bool>,
    pub require_approval: Option<bool>,
    pub response_delay_ms: Option<u64>,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
    pub fallback_message: Option<String>,
}

impl BotConfigUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(max_tokens) = self.max_tokens
            && !(1..=MAX_TOKENS_LIMIT).contains(&max_tokens)
        {
            return Err(Error::Validation(format!(
                "max_tokens must be between 1 and {}",
                MAX_TOKENS_LIMIT
            )));
        }
        if let Some(delay) = self.response_delay_ms
            && delay > MAX_RESPONSE_DELAY_MS
        {
            return Err(Error::Validation(format!(
                "response_delay_ms must be at most {}",
                MAX_RESPONSE_DELAY_MS
            )));
        }
        if self
            .system_prompt
            .as_deref()
            .is_some_and(|s| s.trim().is_empty())
        {
            return Err(Error::Validation("system_prompt must not be blank".into()));
        }
        if self
            .fallback_message
            .as_deref()
            .is_some_and(|s| s.trim().is_empty())
        {
            return Err(Error::Validation("fallback_message must not be blank".into()));
        }
        Ok(())
    }

    /// Validate and apply onto `config`, stamping `updated_at`.
    pub fn apply_to(self, config: &mut BotConfig) -> Result<()> {
        self.validate()?;
        if let Some(v) = self.auto_respond {
            config.auto_respond = v;
        }
        if let Some(v) = self.require_approval {
            config.require_approval = v;
        }
        if let Some(v) = self.response_delay_ms {
            config.response_delay_ms = v;
        }
        if let Some(v) = self.max_tokens {
            config.max_tokens = v;
        }
        if let Some(v) = self.system_prompt {
            config.system_prompt = v;
        }
        if let Some(v) = self.fallback_message {
            config.fallback_message = v;
        }
        config.updated_at = now();
        Ok(())
    }
}
