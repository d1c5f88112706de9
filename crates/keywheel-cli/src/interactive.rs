//! Interactive prompt helpers using dialoguer
//!
//! Provides themed, consistent prompts and status lines.

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, Password, theme::ColorfulTheme};

/// Get the shared theme for all prompts
pub fn theme() -> ColorfulTheme {
    ColorfulTheme::default()
}

/// Confirm yes/no with default
pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    let theme = theme();
    Ok(Confirm::with_theme(&theme)
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}

/// Get password/secret input (hidden)
pub fn password(prompt: &str) -> Result<String> {
    let theme = theme();
    Ok(Password::with_theme(&theme).with_prompt(prompt).interact()?)
}

/// Print a success message
pub fn success(text: &str) {
    println!("{} {}", style("✓").green().bold(), text);
}

/// Print an info message
pub fn info(text: &str) {
    println!("{} {}", style("ℹ").blue(), text);
}
