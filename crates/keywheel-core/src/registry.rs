//! Durable pool metadata: provider name -> ordered credential handles.
//!
//! Only handles are persisted here; the secret values behind them live in the
//! [`SecretStore`](crate::store::SecretStore). A handle with no corresponding
//! stored value is treated as absent, so a partial write on one side never
//! corrupts the other.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::provider::Provider;

/// Current pool metadata format version
pub const POOL_FILE_VERSION: u32 = 1;

/// Opaque identifier referencing a secret value in the secret store.
///
/// Unique within a provider's pool and never reused after deletion, so stale
/// references (cursors, health records) can never remap onto a different
/// credential.
pub type CredentialHandle = String;

/// On-disk pool metadata.
///
/// `cursors` holds the last-used rotation position per provider so round
/// robin continues across process restarts (a scripted `next` per invocation
/// still rotates). Cursors are cleared on membership changes and are advisory:
/// a stale or out-of-bounds entry is treated as absent by the rotator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolFile {
    pub version: u32,
    #[serde(default)]
    pub pools: BTreeMap<String, Vec<CredentialHandle>>,
    #[serde(default)]
    pub cursors: BTreeMap<String, usize>,
}

impl Default for PoolFile {
    fn default() -> Self {
        Self {
            version: POOL_FILE_VERSION,
            pools: BTreeMap::new(),
            cursors: BTreeMap::new(),
        }
    }
}

/// Default location for pool metadata
pub fn default_pool_path() -> PathBuf {
    config_dir().join("pools.json")
}

/// Configuration directory holding pool metadata and legacy key files
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keywheel")
}

/// Allocate a fresh handle for a provider's pool
pub fn new_handle(provider: &Provider) -> CredentialHandle {
    format!("{}-{}", provider, Uuid::new_v4().simple())
}

/// Load pool metadata. An absent file means an empty registry; an unreadable
/// or future-versioned file is tolerated as empty rather than failing startup.
pub fn load_pool_file(path: &Path) -> PoolFile {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return PoolFile::default(),
    };

    match serde_json::from_str::<PoolFile>(&content) {
        Ok(file) if file.version == POOL_FILE_VERSION => file,
        Ok(file) => {
            crate::verbose!(
                "pool file {} has unsupported version {}, starting empty",
                path.display(),
                file.version
            );
            PoolFile::default()
        }
        Err(e) => {
            crate::verbose!("failed to parse pool file {}: {}", path.display(), e);
            PoolFile::default()
        }
    }
}

/// Save pool metadata atomically (temp file + rename on the same filesystem).
///
/// Providers with empty handle lists are dropped before serialization: an
/// empty pool is equivalent to an absent pool entry.
pub fn save_pool_file(path: &Path, file: &PoolFile) -> Result<()> {
    let mut trimmed = file.clone();
    trimmed.pools.retain(|_, handles| !handles.is_empty());
    trimmed
        .cursors
        .retain(|provider, _| trimmed.pools.contains_key(provider));

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let content =
        serde_json::to_string_pretty(&trimmed).context("Failed to serialize pool metadata")?;

    let temp_path = path.with_extension("json.tmp");
    if let Err(e) = fs::write(&temp_path, content) {
        let _ = fs::remove_file(&temp_path);
        return Err(e).context("Failed to write temp pool file");
    }

    fs::rename(&temp_path, path)
        .map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            e
        })
        .context("Failed to replace pool file")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_file_is_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let file = load_pool_file(&dir.path().join("pools.json"));
        assert!(file.pools.is_empty());
        assert_eq!(file.version, POOL_FILE_VERSION);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pools.json");

        let mut file = PoolFile::default();
        file.pools
            .insert("openai".to_string(), vec!["h1".to_string(), "h2".to_string()]);
        save_pool_file(&path, &file).unwrap();

        let loaded = load_pool_file(&path);
        assert_eq!(loaded.pools["openai"], vec!["h1", "h2"]);
    }

    #[test]
    fn test_empty_pools_dropped_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pools.json");

        let mut file = PoolFile::default();
        file.pools.insert("mistral".to_string(), vec![]);
        file.pools
            .insert("groq".to_string(), vec!["h1".to_string()]);
        save_pool_file(&path, &file).unwrap();

        let loaded = load_pool_file(&path);
        assert!(!loaded.pools.contains_key("mistral"));
        assert!(loaded.pools.contains_key("groq"));
    }

    #[test]
    fn test_cursor_round_trips_with_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pools.json");

        let mut file = PoolFile::default();
        file.pools
            .insert("openai".to_string(), vec!["h1".to_string(), "h2".to_string()]);
        file.cursors.insert("openai".to_string(), 1);
        save_pool_file(&path, &file).unwrap();

        let loaded = load_pool_file(&path);
        assert_eq!(loaded.cursors.get("openai"), Some(&1));
    }

    #[test]
    fn test_cursor_dropped_with_its_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pools.json");

        let mut file = PoolFile::default();
        file.pools
            .insert("groq".to_string(), vec!["h1".to_string()]);
        file.cursors.insert("groq".to_string(), 0);
        file.cursors.insert("mistral".to_string(), 2);
        save_pool_file(&path, &file).unwrap();

        let loaded = load_pool_file(&path);
        assert_eq!(loaded.cursors.get("groq"), Some(&0));
        assert!(!loaded.cursors.contains_key("mistral"));
    }

    #[test]
    fn test_pre_cursor_files_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pools.json");
        fs::write(&path, r#"{"version": 1, "pools": {"openai": ["h1"]}}"#).unwrap();

        let loaded = load_pool_file(&path);
        assert_eq!(loaded.pools["openai"], vec!["h1"]);
        assert!(loaded.cursors.is_empty());
    }

    #[test]
    fn test_future_version_tolerated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pools.json");
        fs::write(&path, r#"{"version": 99, "pools": {"openai": ["h1"]}}"#).unwrap();

        let loaded = load_pool_file(&path);
        assert!(loaded.pools.is_empty());
    }

    #[test]
    fn test_handles_are_unique() {
        let provider = Provider::new("openai");
        let a = new_handle(&provider);
        let b = new_handle(&provider);
        assert_ne!(a, b);
        assert!(a.starts_with("openai-"));
    }
}
