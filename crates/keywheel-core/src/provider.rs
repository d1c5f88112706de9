//! Provider identity for credential pools.
//!
//! A provider is an external service the surrounding app sends requests to
//! (a transcription API vendor, typically). Pool lookups are case-insensitive;
//! names are normalized to lowercase on construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Well-known transcription providers. Any name is accepted; these exist for
/// display lists and tab completion in frontends.
pub const KNOWN_PROVIDERS: &[&str] = &["openai", "mistral", "groq", "deepgram", "elevenlabs"];

/// Lowercased provider key under which a credential pool is scoped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Provider(String);

impl Provider {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    /// Get the normalized string identifier for this provider
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() honors width/alignment flags from callers formatting tables
        f.pad(&self.0)
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err("provider name must not be empty".to_string());
        }
        Ok(Provider::new(s))
    }
}

impl From<&str> for Provider {
    fn from(name: &str) -> Self {
        Provider::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_keys() {
        assert_eq!(Provider::new("OpenAI"), Provider::new("openai"));
        assert_eq!(Provider::new("  Groq "), Provider::new("groq"));
    }

    #[test]
    fn test_display_honors_width_flags() {
        let provider = Provider::new("groq");
        assert_eq!(format!("{}", provider), "groq");
        assert_eq!(format!("{:<8}", provider), "groq    ");
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!("   ".parse::<Provider>().is_err());
        assert!("ElevenLabs".parse::<Provider>().is_ok());
    }
}
