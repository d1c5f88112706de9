//! keywheel: manage rotating API credential pools from the terminal.
//!
//! The binary is thin glue over `keywheel-core`: every command constructs
//! the pool service (legacy import included) and delegates.

mod commands;
mod interactive;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use keywheel_core::{CredentialPool, KeyringStore, Provider, set_verbose};

#[derive(Parser)]
#[command(
    name = "keywheel",
    version,
    about = "Rotating API credential pools for transcription providers"
)]
struct Cli {
    /// Print verbose diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a credential to a provider's pool (prompts for the key)
    Add { provider: Provider },
    /// List a provider's credentials, masked, with their positions
    List { provider: Provider },
    /// Remove the credential at a position reported by `list`
    Remove { provider: Provider, position: usize },
    /// Remove every credential for a provider
    Clear { provider: Provider },
    /// Print the next credential in rotation (for scripts)
    Next { provider: Provider },
    /// Mark a credential as rate limited (reads the value from stdin)
    Report { provider: Provider },
    /// Show pool sizes and quarantine state
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    set_verbose(cli.verbose);

    let pool = CredentialPool::open(Arc::new(KeyringStore::new()));

    match cli.command {
        Command::Add { provider } => commands::keys::add(&pool, &provider),
        Command::List { provider } => commands::keys::list(&pool, &provider),
        Command::Remove { provider, position } => commands::keys::remove(&pool, &provider, position),
        Command::Clear { provider } => commands::keys::clear(&pool, &provider),
        Command::Next { provider } => commands::rotate::next(&pool, &provider),
        Command::Report { provider } => commands::rotate::report(&pool, &provider),
        Command::Status => commands::rotate::status(&pool),
    }
}
