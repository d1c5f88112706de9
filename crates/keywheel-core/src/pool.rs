//! The credential pool service: registry, rotation and health behind one lock.
//!
//! One `CredentialPool` instance is constructed at startup (legacy import
//! included) and injected wherever outbound calls need a credential. All
//! read-modify-write sequences are serialized on a single mutex over the
//! registry state; secret-store reads on the selection path happen after the
//! lock is released so store latency never serializes unrelated selections.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::PoolError;
use crate::health::{COOLDOWN, HealthTracker};
use crate::migrate::{self, LegacySources};
use crate::provider::Provider;
use crate::registry::{self, CredentialHandle, PoolFile};
use crate::rotation::{self, Selection};
use crate::store::SecretStore;

struct PoolState {
    // Cursors live inside `file` so rotation order survives process restarts
    file: PoolFile,
    health: HashMap<Provider, HealthTracker>,
}

/// Multi-credential rotation and failover for external providers.
pub struct CredentialPool {
    store: Arc<dyn SecretStore>,
    path: PathBuf,
    cooldown: Duration,
    state: Mutex<PoolState>,
}

impl CredentialPool {
    /// Open the pool at the default location and absorb any legacy key
    /// stores. Import failures are reported but never abort construction;
    /// whatever migrated successfully is usable immediately.
    pub fn open(store: Arc<dyn SecretStore>) -> Self {
        let pool = Self::with_path(store, registry::default_pool_path());
        let stats = migrate::run_importers(&pool, &LegacySources::default_locations());
        if stats.imported > 0 || stats.failed > 0 {
            crate::verbose!(
                "legacy import: {} imported, {} skipped, {} failed",
                stats.imported,
                stats.skipped,
                stats.failed
            );
        }
        pool
    }

    /// Open against an explicit metadata path, without legacy import.
    pub fn with_path(store: Arc<dyn SecretStore>, path: PathBuf) -> Self {
        let file = registry::load_pool_file(&path);
        Self {
            store,
            path,
            cooldown: COOLDOWN,
            state: Mutex::new(PoolState {
                file,
                health: HashMap::new(),
            }),
        }
    }

    /// Override the quarantine cooldown (tests use short windows)
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Add a credential to a provider's pool.
    ///
    /// Rejects values already present in the resolved pool. The duplicate
    /// check and the secret write run outside the lock so keychain latency
    /// never blocks selections for other providers; the handle list is
    /// re-validated under the lock before appending, so two concurrent adds
    /// of the same value still admit exactly one. If the metadata flush fails
    /// both sides are backed out and the call fails, so registry and store
    /// never diverge beyond the tolerated missing-value case.
    pub fn add_credential(
        &self,
        provider: &Provider,
        value: &str,
    ) -> Result<CredentialHandle, PoolError> {
        let snapshot = self.snapshot(provider);
        if self.resolve_values(&snapshot).iter().any(|v| v == value) {
            return Err(PoolError::Duplicate(provider.clone()));
        }

        let handle = registry::new_handle(provider);
        self.store.save(&handle, value)?;

        let mut state = self.state.lock();

        // The pool may have changed while the dup-check ran unlocked
        let current = state
            .file
            .pools
            .get(provider.as_str())
            .cloned()
            .unwrap_or_default();
        if current != snapshot && self.resolve_values(&current).iter().any(|v| v == value) {
            let _ = self.store.delete(&handle);
            return Err(PoolError::Duplicate(provider.clone()));
        }

        state
            .file
            .pools
            .entry(provider.as_str().to_string())
            .or_default()
            .push(handle.clone());
        // Membership changed: the rotation cursor may reference a stale position
        let prev_cursor = state.file.cursors.remove(provider.as_str());

        if let Err(e) = registry::save_pool_file(&self.path, &state.file) {
            if let Some(handles) = state.file.pools.get_mut(provider.as_str()) {
                handles.retain(|h| h != &handle);
                if handles.is_empty() {
                    state.file.pools.remove(provider.as_str());
                }
            }
            if let Some(cursor) = prev_cursor {
                state
                    .file
                    .cursors
                    .insert(provider.as_str().to_string(), cursor);
            }
            let _ = self.store.delete(&handle);
            return Err(PoolError::Persistence(format!("{e:#}")));
        }

        crate::verbose!("added credential {} for {}", handle, provider);
        Ok(handle)
    }

    /// Remove the credential at `position` in the provider's pool.
    pub fn remove_credential(&self, provider: &Provider, position: usize) -> Result<(), PoolError> {
        let mut state = self.state.lock();

        let Some(handles) = state.file.pools.get_mut(provider.as_str()) else {
            return Err(PoolError::NotFound {
                provider: provider.clone(),
                position,
            });
        };
        if position >= handles.len() {
            return Err(PoolError::NotFound {
                provider: provider.clone(),
                position,
            });
        }

        let handle = handles.remove(position);
        if handles.is_empty() {
            state.file.pools.remove(provider.as_str());
        }
        let prev_cursor = state.file.cursors.remove(provider.as_str());

        if let Err(e) = registry::save_pool_file(&self.path, &state.file) {
            state
                .file
                .pools
                .entry(provider.as_str().to_string())
                .or_default()
                .insert(position, handle);
            if let Some(cursor) = prev_cursor {
                state
                    .file
                    .cursors
                    .insert(provider.as_str().to_string(), cursor);
            }
            return Err(PoolError::Persistence(format!("{e:#}")));
        }

        if let Err(e) = self.store.delete(&handle) {
            // Pool state is already consistent; the orphaned value is
            // unreachable because handles are never reused.
            crate::verbose!("failed to delete secret for removed {}: {}", handle, e);
        }

        if let Some(health) = state.health.get_mut(provider) {
            health.forget(&handle);
        }
        crate::verbose!("removed credential {} for {}", handle, provider);
        Ok(())
    }

    /// Delete every credential and all rotation state for a provider.
    pub fn remove_all(&self, provider: &Provider) -> Result<(), PoolError> {
        let mut state = self.state.lock();

        let Some(handles) = state.file.pools.remove(provider.as_str()) else {
            return Ok(());
        };
        let prev_cursor = state.file.cursors.remove(provider.as_str());

        if let Err(e) = registry::save_pool_file(&self.path, &state.file) {
            state
                .file
                .pools
                .insert(provider.as_str().to_string(), handles);
            if let Some(cursor) = prev_cursor {
                state
                    .file
                    .cursors
                    .insert(provider.as_str().to_string(), cursor);
            }
            return Err(PoolError::Persistence(format!("{e:#}")));
        }

        for handle in &handles {
            if let Err(e) = self.store.delete(handle) {
                crate::verbose!("failed to delete secret for {}: {}", handle, e);
            }
        }
        state.health.remove(provider);
        Ok(())
    }

    /// Resolve the provider's pool to secret values, in ring order.
    ///
    /// Handles whose value is missing from the store are skipped, and
    /// identical values are de-duplicated.
    pub fn list_credentials(&self, provider: &Provider) -> Vec<String> {
        let handles = self.snapshot(provider);
        self.resolve_values(&handles)
    }

    /// Number of credentials in the provider's pool
    pub fn count(&self, provider: &Provider) -> usize {
        self.snapshot(provider).len()
    }

    pub fn has_any(&self, provider: &Provider) -> bool {
        self.count(provider) > 0
    }

    pub fn has_multiple(&self, provider: &Provider) -> bool {
        self.count(provider) > 1
    }

    /// Providers that currently have at least one credential
    pub fn providers(&self) -> Vec<Provider> {
        let state = self.state.lock();
        state
            .file
            .pools
            .keys()
            .map(|name| Provider::new(name))
            .collect()
    }

    /// How many of the provider's credentials are currently quarantined
    pub fn quarantined_count(&self, provider: &Provider) -> usize {
        let state = self.state.lock();
        state
            .health
            .get(provider)
            .map(HealthTracker::quarantined_count)
            .unwrap_or(0)
    }

    /// Select the next credential in rotation for this provider.
    ///
    /// Returns `None` only when the pool is empty (or no stored value could
    /// be resolved): a non-empty pool always yields a value, even if every
    /// member is quarantined. In that case all quarantine state is reset and
    /// the first credential served, trading cooldown adherence for
    /// availability.
    pub fn next_credential(&self, provider: &Provider) -> Option<String> {
        let attempts = self.count(provider).max(1);

        for _ in 0..attempts {
            let (handle, singleton) = {
                let mut state = self.state.lock();
                let pool = state
                    .file
                    .pools
                    .get(provider.as_str())
                    .cloned()
                    .unwrap_or_default();
                let cursor = state.file.cursors.get(provider.as_str()).copied();
                let cooldown = self.cooldown;
                let health = state
                    .health
                    .entry(provider.clone())
                    .or_insert_with(|| HealthTracker::with_cooldown(cooldown));

                match rotation::select_next(&pool, cursor, health) {
                    Selection::Empty => return None,
                    Selection::Single => (pool[0].clone(), true),
                    Selection::Next {
                        position,
                        quarantine_reset,
                    } => {
                        if quarantine_reset {
                            crate::verbose!(
                                "all {} credentials quarantined, resetting and serving first",
                                provider
                            );
                        }
                        state
                            .file
                            .cursors
                            .insert(provider.as_str().to_string(), position);
                        // The new cursor is flushed so rotation continues
                        // across restarts; a flush failure degrades to a
                        // repeated selection rather than failing the call.
                        if let Err(e) = registry::save_pool_file(&self.path, &state.file) {
                            crate::verbose!("failed to persist rotation cursor: {e:#}");
                        }
                        (pool[position].clone(), false)
                    }
                }
            };

            // Store read happens outside the lock
            match self.store.read(&handle) {
                Ok(Some(value)) => return Some(value),
                Ok(None) => {
                    crate::verbose!("handle {} has no stored value, skipping", handle);
                    if singleton {
                        return None;
                    }
                }
                Err(e) => {
                    crate::verbose!("secret store read failed for {}: {}", handle, e);
                    if singleton {
                        return None;
                    }
                }
            }
        }
        None
    }

    /// Report a failed credential (rate limited, typically).
    ///
    /// The value is resolved back to its handle; unknown values are ignored,
    /// since the credential may have been removed or belong to another
    /// provider.
    pub fn report_failure(&self, provider: &Provider, value: &str) {
        let handles = self.snapshot(provider);
        let Some(handle) = handles
            .iter()
            .find(|handle| matches!(self.store.read(handle.as_str()), Ok(Some(v)) if v == value))
        else {
            return;
        };

        let mut state = self.state.lock();
        let cooldown = self.cooldown;
        state
            .health
            .entry(provider.clone())
            .or_insert_with(|| HealthTracker::with_cooldown(cooldown))
            .mark_failed(handle);
        crate::verbose!("quarantined credential {} for {}", handle, provider);
    }

    fn snapshot(&self, provider: &Provider) -> Vec<CredentialHandle> {
        self.state
            .lock()
            .file
            .pools
            .get(provider.as_str())
            .cloned()
            .unwrap_or_default()
    }

    fn resolve_values(&self, handles: &[CredentialHandle]) -> Vec<String> {
        let mut values = Vec::new();
        for handle in handles {
            match self.store.read(handle) {
                Ok(Some(value)) => {
                    if !values.contains(&value) {
                        values.push(value);
                    }
                }
                Ok(None) => {
                    crate::verbose!("handle {} has no stored value, skipping", handle);
                }
                Err(e) => {
                    crate::verbose!("secret store read failed for {}: {}", handle, e);
                }
            }
        }
        values
    }
}
