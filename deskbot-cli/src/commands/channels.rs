//! Per-channel pause gate

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::Cell;
use deskbot_core::PausedChannel;

use super::table;
use crate::context::Context;

#[derive(Debug, Args)]
pub struct ChannelsArgs {
    #[command(subcommand)]
    pub command: ChannelsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ChannelsCommand {
    /// List paused channels
    List,
    /// Stop automated responses in a channel
    Pause {
        channel_id: String,
        #[arg(long, default_value = "")]
        guild: String,
        /// Human-readable channel name
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Re-enable automated responses in a channel
    Resume { channel_id: String },
}

pub async fn run(args: ChannelsArgs) -> Result<()> {
    let context = Context::load().await?;
    let store = &context.store;
    match args.command {
        ChannelsCommand::List => {
            let paused = store.list_paused_channels().await?;
            if paused.is_empty() {
                println!("No paused channels.");
                return Ok(());
            }
            let mut table = table(&["Channel", "Name", "Guild", "Paused at"]);
            for channel in &paused {
                table.add_row(vec![
                    Cell::new(&channel.channel_id),
                    Cell::new(&channel.channel_name),
                    Cell::new(&channel.guild_id),
                    Cell::new(channel.paused_at.format("%Y-%m-%d %H:%M")),
                ]);
            }
            println!("{table}");
        }
        ChannelsCommand::Pause {
            channel_id,
            guild,
            name,
        } => {
            if channel_id.trim().is_empty() {
                anyhow::bail!("channel id must not be blank");
            }
            let paused = store
                .pause_channel(&PausedChannel::new(channel_id, guild, name))
                .await?;
            println!(
                "Paused {} since {}.",
                paused.channel_id,
                paused.paused_at.format("%Y-%m-%d %H:%M")
            );
        }
        ChannelsCommand::Resume { channel_id } => {
            if store.resume_channel(&channel_id).await? {
                println!("Resumed {channel_id}.");
            } else {
                println!("{channel_id} was not paused.");
            }
        }
    }
    Ok(())
}
