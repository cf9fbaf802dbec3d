//! Shared application state for the deskbot server

use std::sync::Arc;

use chrono::{DateTime, Utc};
use deskbot_core::{DeliverySink, Dispatcher, KnowledgeIndex, Store, TicketLifecycle};
use deskbot_models::{CompletionProvider, EmbeddingProvider};

/// Shared application state accessible by all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Embedding capability, for knowledge creation and search
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: KnowledgeIndex,
    pub lifecycle: Arc<TicketLifecycle>,
    pub dispatcher: Arc<Dispatcher>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        embedder: Arc<dyn EmbeddingProvider>,
        completer: Arc<dyn CompletionProvider>,
        sink: Arc<dyn DeliverySink>,
    ) -> Self {
        let lifecycle = Arc::new(TicketLifecycle::new(
            store.clone(),
            embedder.clone(),
            completer,
            sink,
        ));
        Self {
            dispatcher: Arc::new(Dispatcher::new(lifecycle.clone())),
            index: KnowledgeIndex::new(embedder.clone()),
            store,
            embedder,
            lifecycle,
            started_at: Utc::now(),
        }
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
