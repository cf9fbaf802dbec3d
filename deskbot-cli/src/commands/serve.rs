//! Run the deskbot HTTP server
//!
//! The server exposes the dashboard API and the inbound-event endpoint that
//! chat-platform adapters post to.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use deskbot_server::{AppState, DeskbotServer, ServerConfig};
use tracing::info;

use crate::context::Context;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    pub host: Option<String>,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let context = Context::load().await?;
    let server_config = ServerConfig::new(
        args.host
            .unwrap_or_else(|| context.config.server.host.clone()),
        args.port.unwrap_or(context.config.server.port),
    );

    let state = AppState::new(
        Arc::clone(&context.store),
        context.embedder()?,
        context.completer()?,
        context.sink(),
    );

    info!(
        embedding = %context.config.embedding.provider,
        completion = %context.config.completion.provider,
        "Starting deskbot server on {}",
        server_config.addr()
    );

    DeskbotServer::new(server_config, Arc::new(state))
        .run()
        .await
        .map_err(Into::into)
}
