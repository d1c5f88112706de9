//! Error types for the credential pool.
//!
//! Nothing here is fatal: the worst caller-visible outcome of this subsystem
//! is "no credential available", which the caller maps to a configuration
//! error message.

use thiserror::Error;

use crate::provider::Provider;

/// Errors from a [`SecretStore`](crate::store::SecretStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached (keychain locked, no session bus, ...)
    #[error("secret store unavailable: {0}")]
    Unavailable(String),
    /// The backend reported a failure for this operation
    #[error("secret store operation failed: {0}")]
    Backend(String),
}

/// Errors from pool mutations and queries.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The submitted value is already in the provider's pool. A no-op, not fatal.
    #[error("credential is already in the pool for provider '{0}'")]
    Duplicate(Provider),

    /// No credential exists at the given position for this provider.
    #[error("no credential at position {position} for provider '{provider}'")]
    NotFound {
        provider: Provider,
        position: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Pool metadata could not be flushed to disk. The mutation is rolled back
    /// so in-memory state never diverges from what was persisted.
    #[error("failed to persist pool metadata: {0}")]
    Persistence(String),
}
