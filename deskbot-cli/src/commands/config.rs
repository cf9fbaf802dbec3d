use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use deskbot_core::events::render_config;
use deskbot_core::{BotConfig, BotConfigUpdate};

use crate::config::{ConfigLoader, DeskbotConfig};
use crate::context::Context;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (merged)
    Show,
    /// Show configuration file paths
    Path,
    /// Write a config file with every default filled in
    Init {
        /// Write the project config instead of the user config
        #[arg(long)]
        project: bool,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show or change the bot's runtime settings (stored in the database)
    Bot {
        #[command(subcommand)]
        command: BotCommands,
    },
}

#[derive(Subcommand)]
pub enum BotCommands {
    /// Show the bot settings
    Show,
    /// Change some bot settings; omitted flags keep their value
    Set(BotSetArgs),
}

#[derive(Args)]
pub struct BotSetArgs {
    #[arg(long)]
    pub auto_respond: Option<bool>,
    #[arg(long)]
    pub require_approval: Option<bool>,
    /// Delay before sending, in milliseconds (0-60000)
    #[arg(long)]
    pub response_delay_ms: Option<u64>,
    /// Completion budget (1-8192)
    #[arg(long)]
    pub max_tokens: Option<u32>,
    #[arg(long)]
    pub system_prompt: Option<String>,
    #[arg(long)]
    pub fallback_message: Option<String>,
}

impl From<BotSetArgs> for BotConfigUpdate {
    fn from(args: BotSetArgs) -> Self {
        Self {
            auto_respond: args.auto_respond,
            require_approval: args.require_approval,
            response_delay_ms: args.response_delay_ms,
            max_tokens: args.max_tokens,
            system_prompt: args.system_prompt,
            fallback_message: args.fallback_message,
        }
    }
}

pub async fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(),
        ConfigCommands::Path => show_paths(),
        ConfigCommands::Init { project, force } => init(project, force),
        ConfigCommands::Bot { command } => {
            let context = Context::load().await?;
            match command {
                BotCommands::Show => {
                    let config = context.store.get_config().await?;
                    println!("{}", render_config(&config));
                }
                BotCommands::Set(args) => {
                    let config = update_bot(&context, args.into()).await?;
                    println!("{}", render_config(&config));
                }
            }
            Ok(())
        }
    }
}

fn show_config() -> Result<()> {
    let config = ConfigLoader::load()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{}", toml_str);
    Ok(())
}

fn show_paths() -> Result<()> {
    println!("User config:    {:?}", ConfigLoader::user_config_path());
    println!("Project config: {:?}", ConfigLoader::project_config_path());
    println!("Database:       {:?}", ConfigLoader::default_database_path());
    Ok(())
}

fn init(project: bool, force: bool) -> Result<()> {
    let path = if project {
        ConfigLoader::project_config_path()
    } else {
        match ConfigLoader::user_config_path() {
            Some(path) => path,
            None => bail!("Could not determine user config path"),
        }
    };
    if path.exists() && !force {
        bail!("{} already exists; pass --force to replace it", path.display());
    }
    ConfigLoader::save_to_path(&DeskbotConfig::default(), &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn update_bot(context: &Context, update: BotConfigUpdate) -> Result<BotConfig> {
    if update == BotConfigUpdate::default() {
        bail!("nothing to change; pass at least one setting");
    }
    let mut config = context.store.get_config().await?;
    update.apply_to(&mut config)?;
    context.store.save_config(&config).await?;
    Ok(config)
}
