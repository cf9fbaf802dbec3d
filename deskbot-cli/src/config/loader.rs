use super::types::{
    DEFAULT_HOST, DEFAULT_PORT, DeskbotConfig, DeliverySection, ProviderKind, ProviderSection,
    RawDeskbotConfig, RawProviderSection, RawServerConfig, ServerSection, StorageSection,
};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Overrides the project config directory (useful for isolated tests)
pub const PROJECT_CONFIG_DIR_ENV: &str = "DESKBOT_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<DeskbotConfig> {
        let mut raw = RawDeskbotConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path() {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        raw = Self::merge_raw(raw, Self::read_raw(&Self::project_config_path())?);

        Ok(Self::finalize(raw))
    }

    /// Load a single file as a complete config, defaults filling the gaps
    pub fn load_from_path(path: &Path) -> Result<DeskbotConfig> {
        Ok(Self::finalize(Self::read_raw(path)?))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".deskbot/config.toml")
        }
    }

    /// Default local database file, under the platform data directory
    pub fn default_database_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().join("deskbot.db"))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "deskbot")
    }

    /// A missing file is an empty layer
    fn read_raw(path: &Path) -> Result<RawDeskbotConfig> {
        if !path.exists() {
            return Ok(RawDeskbotConfig::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("invalid config in {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawDeskbotConfig, overlay: RawDeskbotConfig) -> RawDeskbotConfig {
        RawDeskbotConfig {
            server: RawServerConfig {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
            },
            storage: StorageSection {
                path: overlay.storage.path.or(base.storage.path),
                url: overlay.storage.url.or(base.storage.url),
                token_env: overlay.storage.token_env.or(base.storage.token_env),
            },
            embedding: Self::merge_provider(base.embedding, overlay.embedding),
            completion: Self::merge_provider(base.completion, overlay.completion),
            delivery: DeliverySection {
                webhook_url: overlay.delivery.webhook_url.or(base.delivery.webhook_url),
                message_limit: overlay.delivery.message_limit.or(base.delivery.message_limit),
            },
        }
    }

    fn merge_provider(base: RawProviderSection, overlay: RawProviderSection) -> RawProviderSection {
        RawProviderSection {
            provider: overlay.provider.or(base.provider),
            model: overlay.model.or(base.model),
            base_url: overlay.base_url.or(base.base_url),
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawDeskbotConfig) -> DeskbotConfig {
        DeskbotConfig {
            server: ServerSection {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: raw.server.port.unwrap_or(DEFAULT_PORT),
            },
            storage: raw.storage,
            embedding: Self::finalize_provider(raw.embedding, ProviderKind::OpenAi),
            completion: Self::finalize_provider(raw.completion, ProviderKind::Gemini),
            delivery: raw.delivery,
        }
    }

    fn finalize_provider(raw: RawProviderSection, default: ProviderKind) -> ProviderSection {
        ProviderSection {
            provider: raw.provider.unwrap_or(default),
            model: raw.model,
            base_url: raw.base_url,
        }
    }

    /// Save config to a specific path
    ///
    /// Creates parent directories if they don't exist.
    pub fn save_to_path(config: &DeskbotConfig, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(config)?;
        std::fs::write(path, toml)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::TempDir;

    // ==================== Save Tests ====================

    #[test]
    fn test_save_creates_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = DeskbotConfig {
            server: ServerSection {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            ..Default::default()
        };

        ConfigLoader::save_to_path(&config, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("host = \"0.0.0.0\""));
        assert!(contents.contains("port = 8080"));
        assert!(contents.contains("provider = \"gemini\""));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir
            .path()
            .join("nested")
            .join("deep")
            .join("config.toml");

        ConfigLoader::save_to_path(&DeskbotConfig::default(), &path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_saved_defaults_load_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        ConfigLoader::save_to_path(&DeskbotConfig::default(), &path).unwrap();
        let loaded = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(loaded.server.port, DEFAULT_PORT);
        assert_eq!(loaded.embedding.provider, ProviderKind::OpenAi);
        assert_eq!(loaded.completion.provider, ProviderKind::Gemini);
    }

    // ==================== Load Tests ====================

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.toml");

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_load_from_partial_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9999

[storage]
path = "/var/lib/deskbot/support.db"

[embedding]
provider = "ollama"
model = "nomic-embed-text"

[delivery]
webhook_url = "http://localhost:3001"
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(
            config.storage.path,
            Some(PathBuf::from("/var/lib/deskbot/support.db"))
        );
        assert_eq!(config.embedding.provider, ProviderKind::Ollama);
        assert_eq!(config.embedding.model.as_deref(), Some("nomic-embed-text"));
        assert_eq!(config.completion.provider, ProviderKind::Gemini);
        assert_eq!(
            config.delivery.webhook_url.as_deref(),
            Some("http://localhost:3001")
        );
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        let result = ConfigLoader::load_from_path(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_raw_overlay_overrides_base() {
        let base: RawDeskbotConfig = toml::from_str(
            r#"
[server]
host = "127.0.0.1"
port = 5000

[completion]
provider = "gemini"
model = "gemini-2.5-flash"
base_url = "https://example.test/v1"
"#,
        )
        .unwrap();
        let overlay: RawDeskbotConfig = toml::from_str(
            r#"
[server]
port = 8080

[completion]
provider = "ollama"
"#,
        )
        .unwrap();

        let merged = ConfigLoader::merge_raw(base, overlay);

        assert_eq!(merged.server.host, Some("127.0.0.1".to_string()));
        assert_eq!(merged.server.port, Some(8080));
        assert_eq!(merged.completion.provider, Some(ProviderKind::Ollama));
        // overlay's None falls through to base value via .or()
        assert_eq!(merged.completion.model.as_deref(), Some("gemini-2.5-flash"));
        assert_eq!(
            merged.completion.base_url.as_deref(),
            Some("https://example.test/v1")
        );
    }

    #[test]
    fn test_merge_raw_none_preserves_base() {
        let base: RawDeskbotConfig = toml::from_str(
            r#"
[storage]
url = "libsql://support.turso.io"
token_env = "SUPPORT_TOKEN"

[delivery]
webhook_url = "http://adapter:3001"
message_limit = 1500
"#,
        )
        .unwrap();

        let merged = ConfigLoader::merge_raw(base, RawDeskbotConfig::default());

        assert_eq!(
            merged.storage.url.as_deref(),
            Some("libsql://support.turso.io")
        );
        assert_eq!(merged.storage.token_env(), "SUPPORT_TOKEN");
        assert_eq!(
            merged.delivery.webhook_url.as_deref(),
            Some("http://adapter:3001")
        );
        assert_eq!(merged.delivery.message_limit, Some(1500));
    }

    #[test]
    fn test_user_config_path_mentions_deskbot() {
        let path = ConfigLoader::user_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("deskbot"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    #[serial]
    fn test_project_config_path() {
        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::remove_var(PROJECT_CONFIG_DIR_ENV) };
        let path = ConfigLoader::project_config_path();
        assert_eq!(path, PathBuf::from(".deskbot/config.toml"));
    }

    #[test]
    #[serial]
    fn test_load_reads_project_config_from_env_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.toml"),
            "[server]\nport = 6123\n\n[completion]\nprovider = \"openai\"\n",
        )
        .unwrap();

        // SAFETY: env-mutating tests are serialized
        unsafe { std::env::set_var(PROJECT_CONFIG_DIR_ENV, temp_dir.path()) };
        let config = ConfigLoader::load();
        unsafe { std::env::remove_var(PROJECT_CONFIG_DIR_ENV) };

        let config = config.unwrap();
        assert_eq!(config.server.port, 6123);
        assert_eq!(config.completion.provider, ProviderKind::OpenAi);
    }
}
