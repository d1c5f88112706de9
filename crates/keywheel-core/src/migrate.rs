//! One-time absorption of legacy key stores into the pool registry.
//!
//! Three storage generations precede the pool registry:
//!
//! 1. `api_key.json` — one "primary" key per provider.
//! 2. `credentials.json` — a two-tier store distinguishing primary from
//!    additional keys. The tier distinction is discarded; all entries become
//!    equal pool members.
//! 3. `plain_keys.json` — keys stored on disk in the clear, pre-keychain.
//!    Values move into the secret store and the file is deleted so plaintext
//!    is never left behind once consumed.
//!
//! Each importer is idempotent: duplicate values are skipped, and a source
//! file is deleted only after every value in it has been durably absorbed.
//! A partial failure leaves the source intact so a later run can finish the
//! job. Importers are also order-independent in effect, since each one only
//! appends values not already present.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::PoolError;
use crate::pool::CredentialPool;
use crate::provider::Provider;
use crate::registry;

/// Locations of the legacy key files.
#[derive(Debug, Clone)]
pub struct LegacySources {
    pub primary: PathBuf,
    pub tiered: PathBuf,
    pub plaintext: PathBuf,
}

impl LegacySources {
    /// Standard locations in the keywheel config directory
    pub fn default_locations() -> Self {
        Self::in_dir(&registry::config_dir())
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self {
            primary: dir.join("api_key.json"),
            tiered: dir.join("credentials.json"),
            plaintext: dir.join("plain_keys.json"),
        }
    }
}

/// Outcome counters for a migration run.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportStats {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ImportStats {
    fn merge(&mut self, other: ImportStats) {
        self.imported += other.imported;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// One legacy storage generation. A fourth generation is a new impl in the
/// chain inside [`run_importers`].
trait LegacyImporter {
    fn name(&self) -> &'static str;
    fn source(&self) -> &Path;
    fn import(&self, pool: &CredentialPool) -> Result<ImportStats>;
}

/// Run every importer in order. Non-fatal by design: a failing source is
/// logged and left in place for a later retry, and the pool stays usable
/// with whatever succeeded.
pub fn run_importers(pool: &CredentialPool, sources: &LegacySources) -> ImportStats {
    let importers: Vec<Box<dyn LegacyImporter>> = vec![
        Box::new(PrimaryKeyImporter {
            path: sources.primary.clone(),
        }),
        Box::new(TieredImporter {
            path: sources.tiered.clone(),
        }),
        Box::new(PlaintextImporter {
            path: sources.plaintext.clone(),
        }),
    ];

    let mut total = ImportStats::default();
    for importer in importers {
        if !importer.source().exists() {
            continue;
        }
        match importer.import(pool) {
            Ok(stats) => {
                crate::verbose!(
                    "{}: imported {}, skipped {}, failed {}",
                    importer.name(),
                    stats.imported,
                    stats.skipped,
                    stats.failed
                );
                // Delete the source only once fully absorbed
                if stats.failed == 0 {
                    if let Err(e) = fs::remove_file(importer.source()) {
                        crate::verbose!(
                            "could not remove consumed legacy file {}: {}",
                            importer.source().display(),
                            e
                        );
                    }
                }
                total.merge(stats);
            }
            Err(e) => {
                crate::verbose!("{} import failed: {:#}", importer.name(), e);
                total.failed += 1;
            }
        }
    }
    total
}

/// Absorb one value, counting duplicates as skips rather than errors.
fn absorb(pool: &CredentialPool, provider: &Provider, value: &str, stats: &mut ImportStats) {
    match pool.add_credential(provider, value) {
        Ok(_) => stats.imported += 1,
        Err(PoolError::Duplicate(_)) => stats.skipped += 1,
        Err(e) => {
            crate::verbose!("failed to absorb a key for {}: {}", provider, e);
            stats.failed += 1;
        }
    }
}

/// Generation 1: a single primary key per provider.
struct PrimaryKeyImporter {
    path: PathBuf,
}

impl LegacyImporter for PrimaryKeyImporter {
    fn name(&self) -> &'static str {
        "primary key import"
    }

    fn source(&self) -> &Path {
        &self.path
    }

    fn import(&self, pool: &CredentialPool) -> Result<ImportStats> {
        let content =
            fs::read_to_string(&self.path).context("Failed to read legacy primary key file")?;
        let keys: BTreeMap<String, String> =
            serde_json::from_str(&content).context("Failed to parse legacy primary key file")?;

        let mut stats = ImportStats::default();
        for (provider, value) in &keys {
            absorb(pool, &Provider::new(provider), value, &mut stats);
        }
        Ok(stats)
    }
}

/// Generation 2: primary vs additional tiers, flattened to equal members.
#[derive(Debug, Deserialize)]
struct TieredFile {
    #[serde(default)]
    primary: BTreeMap<String, String>,
    #[serde(default)]
    additional: BTreeMap<String, Vec<String>>,
}

struct TieredImporter {
    path: PathBuf,
}

impl LegacyImporter for TieredImporter {
    fn name(&self) -> &'static str {
        "tiered credentials import"
    }

    fn source(&self) -> &Path {
        &self.path
    }

    fn import(&self, pool: &CredentialPool) -> Result<ImportStats> {
        let content =
            fs::read_to_string(&self.path).context("Failed to read legacy credentials file")?;
        let file: TieredFile =
            serde_json::from_str(&content).context("Failed to parse legacy credentials file")?;

        let mut stats = ImportStats::default();
        for (provider, value) in &file.primary {
            absorb(pool, &Provider::new(provider), value, &mut stats);
        }
        for (provider, values) in &file.additional {
            let provider = Provider::new(provider);
            for value in values {
                absorb(pool, &provider, value, &mut stats);
            }
        }
        Ok(stats)
    }
}

/// Generation 3: plaintext keys on disk.
struct PlaintextImporter {
    path: PathBuf,
}

impl LegacyImporter for PlaintextImporter {
    fn name(&self) -> &'static str {
        "plaintext key import"
    }

    fn source(&self) -> &Path {
        &self.path
    }

    fn import(&self, pool: &CredentialPool) -> Result<ImportStats> {
        let content =
            fs::read_to_string(&self.path).context("Failed to read legacy plaintext key file")?;
        let keys: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&content).context("Failed to parse legacy plaintext key file")?;

        let mut stats = ImportStats::default();
        for (provider, values) in &keys {
            let provider = Provider::new(provider);
            for value in values {
                absorb(pool, &provider, value, &mut stats);
            }
        }
        Ok(stats)
    }
}
