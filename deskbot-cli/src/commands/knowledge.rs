//! Knowledge base commands

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::Cell;
use deskbot_core::knowledge::{add_entry, backfill_embeddings, delete_entry};
use deskbot_core::{KnowledgeId, KnowledgeIndex, NewKnowledgeEntry};
use dialoguer::{Confirm, theme::ColorfulTheme};

use super::{excerpt, parse_id, table};
use crate::context::Context;

#[derive(Debug, Args)]
pub struct KnowledgeArgs {
    #[command(subcommand)]
    pub command: KnowledgeCommand,
}

#[derive(Debug, Subcommand)]
pub enum KnowledgeCommand {
    /// List every entry, oldest first
    List,
    /// Add an entry and compute its embedding
    Add {
        /// Short topic label
        subject: String,
        /// The fact the bot may use when answering
        information: String,
    },
    /// Delete an entry
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show entries similar to a query
    Search { query: String },
    /// Compute embeddings for entries that lack one
    Backfill,
}

pub async fn run(args: KnowledgeArgs) -> Result<()> {
    let context = Context::load().await?;
    match args.command {
        KnowledgeCommand::List => list(&context).await,
        KnowledgeCommand::Add {
            subject,
            information,
        } => add(&context, subject, information).await,
        KnowledgeCommand::Delete { id, yes } => delete(&context, &id, yes).await,
        KnowledgeCommand::Search { query } => search(&context, &query).await,
        KnowledgeCommand::Backfill => backfill(&context).await,
    }
}

async fn list(context: &Context) -> Result<()> {
    let entries = context.store.list_knowledge().await?;
    if entries.is_empty() {
        println!("No knowledge entries yet.");
        println!();
        println!("Add one with: deskbot knowledge add <subject> <information>");
        return Ok(());
    }

    let mut table = table(&["ID", "Subject", "Information", "Embedded"]);
    for entry in &entries {
        table.add_row(vec![
            Cell::new(entry.id),
            Cell::new(&entry.subject),
            Cell::new(excerpt(&entry.information, 60)),
            Cell::new(if entry.has_embedding() { "yes" } else { "no" }),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn add(context: &Context, subject: String, information: String) -> Result<()> {
    let embedder = context.embedder()?;
    let entry = add_entry(
        context.store.as_ref(),
        embedder.as_ref(),
        NewKnowledgeEntry::new(subject, information),
    )
    .await?;

    println!("Added {} ({})", entry.subject, entry.id);
    if !entry.has_embedding() {
        println!("Embedding failed; run `deskbot knowledge backfill` once the provider is reachable.");
    }
    Ok(())
}

async fn delete(context: &Context, raw_id: &str, yes: bool) -> Result<()> {
    let id: KnowledgeId = parse_id(raw_id, "knowledge")?;

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete knowledge entry {id}?"))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    delete_entry(context.store.as_ref(), id).await?;
    println!("Deleted {id}.");
    Ok(())
}

async fn search(context: &Context, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("query must not be blank");
    }
    let index = KnowledgeIndex::new(context.embedder()?);
    let corpus = context.store.list_knowledge().await?;
    let hits = index.similar(query, &corpus).await?;

    if hits.is_empty() {
        println!("No similar entries.");
        return Ok(());
    }

    let mut table = table(&["Similarity", "Subject", "Information"]);
    for hit in &hits {
        table.add_row(vec![
            Cell::new(format!("{:.3}", hit.similarity)),
            Cell::new(&hit.subject),
            Cell::new(excerpt(&hit.information, 60)),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn backfill(context: &Context) -> Result<()> {
    let embedder = context.embedder()?;
    let filled = backfill_embeddings(context.store.as_ref(), embedder.as_ref()).await?;
    println!("Filled {filled} embedding(s).");
    Ok(())
}
