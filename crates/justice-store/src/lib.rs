//! Storage layer: a durable key-value slot and the incident vault mirrored into it.

mod error;
pub use error::StoreError;

mod kv;
pub use kv::{FileStore, KeyValueStore, MemoryStore};

mod vault;
pub use vault::{VAULT_BACKUP_SLOT, VAULT_SLOT, Vault, load_entries, save_entries};
