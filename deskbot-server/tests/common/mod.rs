//! Shared test utilities for deskbot-server integration tests

use std::sync::Arc;

use axum_test::TestServer;
use deskbot_core::testing::{MockCompleter, MockEmbedder, RecordingSink};
use deskbot_core::{Store, TursoStore};
use deskbot_server::{AppState, create_router};

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub sink: Arc<RecordingSink>,
}

/// Router over an in-memory store with scripted providers and no send delay.
pub async fn create_test_app(require_approval: bool) -> TestApp {
    create_test_app_with(require_approval, MockEmbedder::new().with_default(vec![1.0, 0.0])).await
}

#[allow(dead_code)]
pub async fn create_test_app_with(require_approval: bool, embedder: MockEmbedder) -> TestApp {
    let store = Arc::new(TursoStore::new_memory().await.unwrap());
    let mut config = store.get_config().await.unwrap();
    config.response_delay_ms = 0;
    config.require_approval = require_approval;
    store.save_config(&config).await.unwrap();

    let sink = Arc::new(RecordingSink::new());
    let state = Arc::new(AppState::new(
        store,
        Arc::new(embedder),
        Arc::new(MockCompleter::new().with_reply("Reembolsos em até 30 dias.")),
        sink.clone(),
    ));
    let server = TestServer::new(create_router(state.clone())).unwrap();

    TestApp {
        server,
        state,
        sink,
    }
}
