use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default port for the deskbot server
pub const DEFAULT_PORT: u16 = 5000;
/// Default host for the deskbot server
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Environment variable holding the remote database token unless overridden
pub const DEFAULT_TOKEN_ENV: &str = "DESKBOT_DB_TOKEN";

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDeskbotConfig {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub storage: StorageSection,

    #[serde(default)]
    pub embedding: RawProviderSection,

    #[serde(default)]
    pub completion: RawProviderSection,

    #[serde(default)]
    pub delivery: DeliverySection,
}

/// Server config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawProviderSection {
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskbotConfig {
    pub server: ServerSection,
    #[serde(default)]
    pub storage: StorageSection,
    pub embedding: ProviderSection,
    pub completion: ProviderSection,
    #[serde(default)]
    pub delivery: DeliverySection,
}

impl Default for DeskbotConfig {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            storage: StorageSection::default(),
            embedding: ProviderSection::new(ProviderKind::OpenAi),
            completion: ProviderSection::new(ProviderKind::Gemini),
            delivery: DeliverySection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Where the database lives.
///
/// `url` selects a remote libSQL database; otherwise `path` (or the
/// platform data directory when unset) holds a local file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StorageSection {
    pub path: Option<PathBuf>,
    pub url: Option<String>,
    /// Name of the environment variable holding the remote auth token
    pub token_env: Option<String>,
}

impl StorageSection {
    pub fn token_env(&self) -> &str {
        self.token_env.as_deref().unwrap_or(DEFAULT_TOKEN_ENV)
    }
}

/// One AI capability backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSection {
    pub provider: ProviderKind,
    /// Overrides the provider's default model
    pub model: Option<String>,
    /// Overrides the provider's default endpoint
    pub base_url: Option<String>,
}

impl ProviderSection {
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            model: None,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Ollama,
}

impl ProviderKind {
    /// Credential name in the keyring, if the provider needs one
    pub fn credential(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("openai"),
            Self::Gemini => Some("gemini"),
            Self::Ollama => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DeliverySection {
    /// Base URL of the chat-platform adapter; delivery is disabled when unset
    pub webhook_url: Option<String>,
    /// Maximum characters per message, the sink default when unset
    pub message_limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = DeskbotConfig::default();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.embedding.provider, ProviderKind::OpenAi);
        assert_eq!(config.completion.provider, ProviderKind::Gemini);
        assert!(config.storage.path.is_none());
        assert!(config.delivery.webhook_url.is_none());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = DeskbotConfig {
            server: ServerSection {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            storage: StorageSection {
                url: Some("libsql://support.turso.io".to_string()),
                token_env: Some("SUPPORT_DB_TOKEN".to_string()),
                ..Default::default()
            },
            embedding: ProviderSection {
                provider: ProviderKind::Ollama,
                model: Some("nomic-embed-text".to_string()),
                base_url: Some("http://gpu-box:11434".to_string()),
            },
            completion: ProviderSection::new(ProviderKind::OpenAi),
            delivery: DeliverySection {
                webhook_url: Some("http://localhost:3001".to_string()),
                message_limit: Some(1500),
            },
        };

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: DeskbotConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.storage, config.storage);
        assert_eq!(parsed.embedding, config.embedding);
        assert_eq!(parsed.completion.provider, ProviderKind::OpenAi);
        assert_eq!(parsed.delivery, config.delivery);
    }

    #[test]
    fn test_raw_config_partial_parsing() {
        let toml_str = r#"
[server]
port = 9000

[completion]
provider = "ollama"
"#;
        let raw: RawDeskbotConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(raw.server.port, Some(9000));
        assert!(raw.server.host.is_none());
        assert_eq!(raw.completion.provider, Some(ProviderKind::Ollama));
        assert!(raw.completion.model.is_none());
        assert!(raw.embedding.provider.is_none());
    }

    #[test]
    fn test_raw_config_empty_uses_none() {
        let raw: RawDeskbotConfig = toml::from_str("").unwrap();

        assert!(raw.server.port.is_none());
        assert!(raw.server.host.is_none());
        assert!(raw.embedding.provider.is_none());
        assert!(raw.delivery.webhook_url.is_none());
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let result: Result<RawDeskbotConfig, _> =
            toml::from_str("[embedding]\nprovider = \"anthropic\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_token_env_default() {
        assert_eq!(StorageSection::default().token_env(), DEFAULT_TOKEN_ENV);
        let custom = StorageSection {
            token_env: Some("MY_TOKEN".to_string()),
            ..Default::default()
        };
        assert_eq!(custom.token_env(), "MY_TOKEN");
    }

    #[test]
    fn test_provider_credentials() {
        assert_eq!(ProviderKind::OpenAi.credential(), Some("openai"));
        assert_eq!(ProviderKind::Gemini.credential(), Some("gemini"));
        assert_eq!(ProviderKind::Ollama.credential(), None);
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
    }
}
