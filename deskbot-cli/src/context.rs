//! Wiring from process config to the store, AI providers and delivery sink.

use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow};
use deskbot_core::{DeliverySink, DisabledSink, Store, TicketLifecycle, TursoStore, WebhookSink};
use deskbot_models::auth::CredentialStore;
use deskbot_models::{CompletionProvider, EmbeddingProvider, OllamaProvider, OpenAiProvider};
use tracing::{debug, warn};

use crate::config::{ConfigLoader, DeskbotConfig, ProviderKind, ProviderSection, StorageSection};

/// Keyring service name for every deskbot credential
pub const KEYRING_SERVICE: &str = "deskbot";

/// Credential name of the delivery webhook token
pub const DELIVERY_CREDENTIAL: &str = "delivery";

pub fn credentials() -> CredentialStore {
    CredentialStore::new(KEYRING_SERVICE).with_env_fallback()
}

/// Loaded config plus an open store; providers are built on demand so that
/// read-only commands work without API keys.
pub struct Context {
    pub config: DeskbotConfig,
    pub store: Arc<dyn Store>,
    credentials: CredentialStore,
}

impl Context {
    pub async fn load() -> Result<Self> {
        let config = ConfigLoader::load()?;
        Self::with_config(config).await
    }

    pub async fn with_config(config: DeskbotConfig) -> Result<Self> {
        let store = open_store(&config.storage).await?;
        Ok(Self {
            config,
            store,
            credentials: credentials(),
        })
    }

    pub fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        build_embedder(&self.config.embedding, &self.credentials)
    }

    pub fn completer(&self) -> Result<Arc<dyn CompletionProvider>> {
        build_completer(&self.config.completion, &self.credentials)
    }

    pub fn sink(&self) -> Arc<dyn DeliverySink> {
        let delivery = &self.config.delivery;
        let Some(url) = &delivery.webhook_url else {
            warn!("no delivery webhook configured; approved responses will stay undelivered");
            return Arc::new(DisabledSink);
        };

        let mut sink = WebhookSink::new(url);
        if let Some(token) = self.credentials.find(DELIVERY_CREDENTIAL) {
            sink = sink.with_token(token);
        }
        if let Some(limit) = delivery.message_limit {
            sink = sink.with_message_limit(limit);
        }
        debug!(url = %sink.base_url(), "delivering through webhook");
        Arc::new(sink)
    }

    pub fn lifecycle(&self) -> Result<TicketLifecycle> {
        Ok(TicketLifecycle::new(
            Arc::clone(&self.store),
            self.embedder()?,
            self.completer()?,
            self.sink(),
        ))
    }
}

/// Open the configured database, creating a local file when needed.
pub async fn open_store(storage: &StorageSection) -> Result<Arc<dyn Store>> {
    if let Some(url) = &storage.url {
        let token = std::env::var(storage.token_env())
            .with_context(|| format!("{} must hold the database token", storage.token_env()))?;
        debug!(%url, "opening remote database");
        let store = TursoStore::new_remote(url, &token).await?;
        return Ok(Arc::new(store));
    }

    let path = match &storage.path {
        Some(path) => path.clone(),
        None => ConfigLoader::default_database_path()
            .ok_or_else(|| anyhow!("could not determine a data directory; set [storage] path"))?,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    debug!(path = %path.display(), "opening local database");
    let store = TursoStore::new_local(&path).await?;
    Ok(Arc::new(store))
}

pub fn build_embedder(
    section: &ProviderSection,
    credentials: &CredentialStore,
) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match section.provider {
        ProviderKind::Ollama => {
            let provider = ollama(section);
            match &section.model {
                Some(model) => Arc::new(provider.with_embed_model(model)),
                None => Arc::new(provider),
            }
        }
        kind => {
            let provider = openai_compatible(kind, section, credentials)?;
            match &section.model {
                Some(model) => Arc::new(provider.with_embedding_model(model)),
                None => Arc::new(provider),
            }
        }
    };
    Ok(provider)
}

pub fn build_completer(
    section: &ProviderSection,
    credentials: &CredentialStore,
) -> Result<Arc<dyn CompletionProvider>> {
    let provider: Arc<dyn CompletionProvider> = match section.provider {
        ProviderKind::Ollama => {
            let provider = ollama(section);
            match &section.model {
                Some(model) => Arc::new(provider.with_chat_model(model)),
                None => Arc::new(provider),
            }
        }
        kind => {
            let provider = openai_compatible(kind, section, credentials)?;
            match &section.model {
                Some(model) => Arc::new(provider.with_completion_model(model)),
                None => Arc::new(provider),
            }
        }
    };
    Ok(provider)
}

fn ollama(section: &ProviderSection) -> OllamaProvider {
    match &section.base_url {
        Some(url) => OllamaProvider::with_base_url(url),
        None => OllamaProvider::new(),
    }
}

fn openai_compatible(
    kind: ProviderKind,
    section: &ProviderSection,
    credentials: &CredentialStore,
) -> Result<OpenAiProvider> {
    let mut provider = match kind {
        ProviderKind::Gemini => OpenAiProvider::gemini(),
        _ => OpenAiProvider::openai(),
    };
    if let Some(credential) = kind.credential() {
        let key = credentials.get(credential).with_context(|| {
            format!("no API key for {kind}; run `deskbot auth set {credential}`")
        })?;
        provider = provider.with_api_key(key);
    }
    if let Some(url) = &section.base_url {
        provider = provider.with_base_url(url);
    }
    Ok(provider)
}
