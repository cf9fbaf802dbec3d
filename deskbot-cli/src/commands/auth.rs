//! API credential management
//!
//! Keys live in the system keyring; the matching environment variable is
//! used when the keyring has none.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color};
use deskbot_models::auth::{CredentialSource, known_providers};
use dialoguer::{Password, theme::ColorfulTheme};

use super::table;
use crate::context::credentials;

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Show which credentials are configured and where they come from
    Status,
    /// Store a credential in the keyring (prompts for the key)
    Set { provider: String },
    /// Remove a credential from the keyring
    Delete { provider: String },
}

pub fn run(args: AuthArgs) -> Result<()> {
    match args.command {
        AuthCommand::Status => status(),
        AuthCommand::Set { provider } => set(&provider),
        AuthCommand::Delete { provider } => delete(&provider),
    }
}

fn status() -> Result<()> {
    let store = credentials();
    let mut table = table(&["Credential", "Source"]);
    for provider in known_providers() {
        let source = match store.credential_source(provider) {
            Some(source @ CredentialSource::Keyring) => Cell::new(source).fg(Color::Green),
            Some(source @ CredentialSource::Environment) => Cell::new(source).fg(Color::Yellow),
            None => Cell::new("not configured").fg(Color::DarkGrey),
        };
        table.add_row(vec![Cell::new(provider), source]);
    }
    println!("{table}");
    Ok(())
}

fn set(provider: &str) -> Result<()> {
    ensure_known(provider)?;

    let key = Password::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("API key for {provider}"))
        .interact()?;
    if key.trim().is_empty() {
        bail!("API key cannot be empty");
    }

    credentials().set(provider, key.trim())?;
    println!("Credentials for '{provider}' saved to keyring.");
    Ok(())
}

fn delete(provider: &str) -> Result<()> {
    ensure_known(provider)?;

    match credentials().delete(provider) {
        Ok(()) => println!("Credentials for '{provider}' deleted."),
        Err(deskbot_models::Error::CredentialsNotFound(_)) => {
            println!("No credentials found for '{provider}'.")
        }
        Err(e) => bail!("Failed to delete credentials: {e}"),
    }
    Ok(())
}

fn ensure_known(provider: &str) -> Result<()> {
    if known_providers().any(|known| known == provider) {
        return Ok(());
    }
    let names: Vec<_> = known_providers().collect();
    bail!("unknown credential '{provider}'; expected one of: {}", names.join(", "))
}
