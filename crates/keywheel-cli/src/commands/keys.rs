//! Pool membership commands: add, list, remove, clear.

use anyhow::{Result, bail};
use keywheel_core::{CredentialPool, PoolError, Provider};

use crate::interactive;

pub fn add(pool: &CredentialPool, provider: &Provider) -> Result<()> {
    let value = interactive::password(&format!("{} API key", provider))?;
    let value = value.trim();
    if value.is_empty() {
        bail!("No key entered");
    }
    validate_format(provider, value)?;

    match pool.add_credential(provider, value) {
        Ok(_) => {
            interactive::success(&format!(
                "Added key for {} ({} in pool)",
                provider,
                pool.count(provider)
            ));
            Ok(())
        }
        Err(PoolError::Duplicate(_)) => {
            bail!("That key is already in the {} pool", provider)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn list(pool: &CredentialPool, provider: &Provider) -> Result<()> {
    let values = pool.list_credentials(provider);
    if values.is_empty() {
        interactive::info(&format!("No credentials for {}", provider));
        return Ok(());
    }

    println!("{} credentials:", provider);
    for (position, value) in values.iter().enumerate() {
        println!("  {}  {}", position, mask(value));
    }
    Ok(())
}

pub fn remove(pool: &CredentialPool, provider: &Provider, position: usize) -> Result<()> {
    pool.remove_credential(provider, position)?;
    interactive::success(&format!(
        "Removed key {} for {} ({} left)",
        position,
        provider,
        pool.count(provider)
    ));
    Ok(())
}

pub fn clear(pool: &CredentialPool, provider: &Provider) -> Result<()> {
    let count = pool.count(provider);
    if count == 0 {
        interactive::info(&format!("No credentials for {}", provider));
        return Ok(());
    }

    if !interactive::confirm(
        &format!("Remove all {} key(s) for {}?", count, provider),
        false,
    )? {
        return Ok(());
    }

    pool.remove_all(provider)?;
    interactive::success(&format!("Cleared {} credentials", provider));
    Ok(())
}

/// Validate key format for providers with well-known prefixes
fn validate_format(provider: &Provider, key: &str) -> Result<()> {
    match provider.as_str() {
        "openai" if !key.starts_with("sk-") => {
            bail!("Invalid OpenAI key format. Keys start with 'sk-'")
        }
        "groq" if !key.starts_with("gsk_") => {
            bail!("Invalid Groq key format. Keys start with 'gsk_'")
        }
        _ => Ok(()),
    }
}

/// Mask a secret for display: first and last four characters only
fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    } else {
        "*".repeat(chars.len().max(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_never_reveals_short_keys() {
        assert_eq!(mask("abc"), "****");
        assert_eq!(mask("123456789012"), "************");
    }

    #[test]
    fn test_mask_shows_edges_of_long_keys() {
        assert_eq!(mask("sk-abcdefghijklmnop"), "sk-a…mnop");
    }

    #[test]
    fn test_format_validation() {
        assert!(validate_format(&Provider::new("openai"), "sk-abc").is_ok());
        assert!(validate_format(&Provider::new("openai"), "abc").is_err());
        assert!(validate_format(&Provider::new("groq"), "gsk_abc").is_ok());
        assert!(validate_format(&Provider::new("custom"), "anything").is_ok());
    }
}
