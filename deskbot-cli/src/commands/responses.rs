//! Review, approve and reject bot responses

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color};
use deskbot_core::{BotResponse, Delivery, ResponseId, ResponseStatus, TicketId};

use super::{excerpt, parse_id, table};
use crate::context::Context;

#[derive(Debug, Args)]
pub struct ResponsesArgs {
    #[command(subcommand)]
    pub command: ResponsesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ResponsesCommand {
    /// List responses, optionally for one ticket
    List {
        #[arg(long)]
        ticket: Option<String>,
    },
    /// Responses waiting for approval
    Pending,
    /// Approved responses that were never delivered
    Undelivered,
    /// Approve a response and deliver it (also retries a failed delivery)
    Approve { id: String },
    /// Reject a response
    Reject { id: String },
}

pub async fn run(args: ResponsesArgs) -> Result<()> {
    let context = Context::load().await?;
    match args.command {
        ResponsesCommand::List { ticket } => {
            let ticket_id = ticket
                .as_deref()
                .map(|raw| parse_id::<TicketId>(raw, "ticket"))
                .transpose()?;
            print_responses(&context.store.list_responses(ticket_id).await?);
        }
        ResponsesCommand::Pending => {
            let pending = context
                .store
                .list_responses_by_status(ResponseStatus::Pending)
                .await?;
            print_responses(&pending);
        }
        ResponsesCommand::Undelivered => {
            print_responses(&context.store.list_undelivered_responses().await?);
        }
        ResponsesCommand::Approve { id } => {
            let id: ResponseId = parse_id(&id, "response")?;
            match context.lifecycle()?.approve(id).await? {
                Delivery::Sent { response } => {
                    println!(
                        "Sent {} (message {}).",
                        response.id,
                        response.message_id.as_deref().unwrap_or("-")
                    );
                }
                Delivery::Failed { response, reason } => {
                    println!("Approved {} but delivery failed: {reason}", response.id);
                    println!("Retry with: deskbot responses approve {}", response.id);
                }
            }
        }
        ResponsesCommand::Reject { id } => {
            let id: ResponseId = parse_id(&id, "response")?;
            let response = context.lifecycle()?.reject(id).await?;
            println!("Rejected {}.", response.id);
        }
    }
    Ok(())
}

fn print_responses(responses: &[BotResponse]) {
    if responses.is_empty() {
        println!("No responses.");
        return;
    }

    let mut table = table(&["ID", "Ticket", "Status", "Created", "Content"]);
    for response in responses {
        table.add_row(vec![
            Cell::new(response.id),
            Cell::new(response.ticket_id),
            Cell::new(response.status).fg(status_color(response.status)),
            Cell::new(response.created_at.format("%Y-%m-%d %H:%M")),
            Cell::new(excerpt(&response.content, 60)),
        ]);
    }
    println!("{table}");
}

fn status_color(status: ResponseStatus) -> Color {
    match status {
        ResponseStatus::Pending => Color::Yellow,
        ResponseStatus::Approved => Color::Blue,
        ResponseStatus::Sent => Color::Green,
        ResponseStatus::Rejected => Color::Red,
    }
}
