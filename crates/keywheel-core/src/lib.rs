pub mod error;
pub mod health;
pub mod migrate;
pub mod pool;
pub mod provider;
pub mod registry;
pub mod rotation;
pub mod store;
pub mod verbose;

pub use error::{PoolError, StoreError};
pub use health::{COOLDOWN, HealthTracker};
pub use migrate::{ImportStats, LegacySources, run_importers};
pub use pool::CredentialPool;
pub use provider::Provider;
pub use registry::CredentialHandle;
#[cfg(feature = "os-keyring")]
pub use store::KeyringStore;
pub use store::{MemoryStore, SecretStore};
pub use verbose::set_verbose;
