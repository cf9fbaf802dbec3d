use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod context;

#[derive(Parser)]
#[command(name = "deskbot", about = "Support-ticket assistant with grounded replies")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage API credentials
    Auth(commands::auth::AuthArgs),
    /// Manage paused channels
    Channels(commands::channels::ChannelsArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Manage the knowledge base
    Knowledge(commands::knowledge::KnowledgeArgs),
    /// Review and approve bot responses
    Responses(commands::responses::ResponsesArgs),
    /// Run the deskbot server
    Serve(commands::serve::ServeArgs),
    /// Show ticket, response and feedback statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Auth(args) => commands::auth::run(args),
        Commands::Channels(args) => commands::channels::run(args).await,
        Commands::Config(args) => commands::config::run(args).await,
        Commands::Knowledge(args) => commands::knowledge::run(args).await,
        Commands::Responses(args) => commands::responses::run(args).await,
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::Stats => commands::stats::run().await,
    }
}
