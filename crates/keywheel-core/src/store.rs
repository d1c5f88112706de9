//! Secret storage boundary.
//!
//! Secret values never live in pool metadata; they are written to a
//! [`SecretStore`] under an opaque handle and read back just-in-time.
//!
//! Production: OS keychain via the `keyring` crate (`KeyringStore`).
//! Testing and embedding: in-memory map (`MemoryStore`).

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::StoreError;

/// Durable, access-controlled storage for secret values, addressed by handle.
///
/// Handles are meaningless without store access, so they are safe to persist
/// as plain metadata. `delete` is idempotent: removing an absent entry is Ok.
pub trait SecretStore: Send + Sync {
    fn save(&self, handle: &str, value: &str) -> Result<(), StoreError>;
    fn read(&self, handle: &str) -> Result<Option<String>, StoreError>;
    fn delete(&self, handle: &str) -> Result<(), StoreError>;
}

/// Secret store backed by the OS keychain.
///
/// Entries are scoped under one keychain service name so they can be audited
/// and cleared together.
#[cfg(feature = "os-keyring")]
pub struct KeyringStore {
    service: String,
}

#[cfg(feature = "os-keyring")]
impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service("keywheel")
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, handle: &str) -> Result<keyring::Entry, StoreError> {
        keyring::Entry::new(&self.service, handle)
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

#[cfg(feature = "os-keyring")]
impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "os-keyring")]
impl SecretStore for KeyringStore {
    fn save(&self, handle: &str, value: &str) -> Result<(), StoreError> {
        self.entry(handle)?
            .set_password(value)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn read(&self, handle: &str) -> Result<Option<String>, StoreError> {
        match self.entry(handle)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    fn delete(&self, handle: &str) -> Result<(), StoreError> {
        match self.entry(handle)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }
}

/// In-memory secret store for tests and for embedders that bring their own
/// durability.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl SecretStore for MemoryStore {
    fn save(&self, handle: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .insert(handle.to_string(), value.to_string());
        Ok(())
    }

    fn read(&self, handle: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(handle).cloned())
    }

    fn delete(&self, handle: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        store.save("h1", "sk-secret").unwrap();
        assert_eq!(store.read("h1").unwrap().as_deref(), Some("sk-secret"));

        store.delete("h1").unwrap();
        assert_eq!(store.read("h1").unwrap(), None);
    }

    #[test]
    fn test_delete_absent_is_ok() {
        let store = MemoryStore::new();
        assert!(store.delete("never-existed").is_ok());
    }
}
