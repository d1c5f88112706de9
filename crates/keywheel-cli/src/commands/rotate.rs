//! Rotation commands: next, report, status.

use std::io::Read;

use anyhow::{Context, Result, bail};
use keywheel_core::{CredentialPool, Provider};

use crate::interactive;

/// Print the next credential in rotation to stdout.
///
/// An empty pool is a configuration error for the caller, not something to
/// retry: exit nonzero with a pointer to `add`.
pub fn next(pool: &CredentialPool, provider: &Provider) -> Result<()> {
    match pool.next_credential(provider) {
        Some(value) => {
            println!("{}", value);
            Ok(())
        }
        None => {
            eprintln!("Error: no {} credentials configured.", provider);
            eprintln!("\nAdd one with:");
            eprintln!("  keywheel add {}\n", provider);
            std::process::exit(1);
        }
    }
}

/// Mark a credential as failed. The value arrives on stdin so it never shows
/// up in shell history or process listings.
pub fn report(pool: &CredentialPool, provider: &Provider) -> Result<()> {
    let mut value = String::new();
    std::io::stdin()
        .read_to_string(&mut value)
        .context("Failed to read key from stdin")?;
    let value = value.trim();
    if value.is_empty() {
        bail!("No key on stdin");
    }

    pool.report_failure(provider, value);
    interactive::success(&format!("Reported failure for a {} credential", provider));
    Ok(())
}

pub fn status(pool: &CredentialPool) -> Result<()> {
    let providers = pool.providers();
    if providers.is_empty() {
        interactive::info("No credential pools configured");
        return Ok(());
    }

    println!("Credential pools:");
    for provider in providers {
        let total = pool.count(&provider);
        let quarantined = pool.quarantined_count(&provider);
        let quarantine_note = if quarantined > 0 {
            format!(", {} quarantined", quarantined)
        } else {
            String::new()
        };
        println!("  {:<12} {} key(s){}", provider, total, quarantine_note);
    }
    Ok(())
}
