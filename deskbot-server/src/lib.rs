//! deskbot-server - HTTP API for the deskbot support assistant
//!
//! This crate exposes the dashboard operations (knowledge, tickets,
//! responses, feedback, config, paused channels, stats) and the inbound
//! event endpoint that chat-platform adapters post to. All state lives in
//! the store behind [`AppState`].

mod error;
pub mod http;
mod state;

use std::sync::Arc;

use tokio::net::TcpListener;

pub use error::{ApiError, ApiResult, ErrorResponse, ServerError};
pub use http::create_router;
pub use state::AppState;

/// The deskbot HTTP server
pub struct DeskbotServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl DeskbotServer {
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Run the server, binding to the configured address
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;
        self.run_with_listener(listener).await
    }

    /// Run the server on an already bound listener
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("deskbot server listening on {}", addr);
        }

        let undelivered = self.state.lifecycle.undelivered().await.map_err(|e| {
            ServerError::Internal(format!("failed to read undelivered responses: {}", e))
        })?;
        if !undelivered.is_empty() {
            tracing::warn!(
                count = undelivered.len(),
                "approved responses are waiting for delivery; retry them via approve"
            );
        }

        axum::serve(listener, create_router(self.state))
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the socket address string (e.g., "127.0.0.1:5000")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn test_server_config_addr() {
        let config = ServerConfig::new("0.0.0.0", 8080);
        assert_eq!(config.addr(), "0.0.0.0:8080");
    }
}
