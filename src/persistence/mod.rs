//! The `persistence` module provides the shared key-value store behind the
//! subscription registry.
//!
//! The registry only needs set membership and per-key field storage, so the
//! store is expressed as the `KeyValueStore` capability. `sled` backs it as
//! an embedded database.

pub mod sled_store;

use std::collections::{BTreeSet, HashMap};

use crate::utils::error::StoreError;

pub use sled_store::SledStore;

/// Set and hash primitives over a shared store. No transactions.
pub trait KeyValueStore: Send + Sync {
    fn add_member(&self, set: &str, member: &str) -> Result<(), StoreError>;

    fn list_members(&self, set: &str) -> Result<BTreeSet<String>, StoreError>;

    /// Deletes everything stored under `key`, whether set or hash.
    fn remove_all(&self, key: &str) -> Result<(), StoreError>;

    fn set_fields(&self, key: &str, fields: &HashMap<String, String>) -> Result<(), StoreError>;

    /// Returns an empty string when the key or field is absent.
    fn get_field(&self, key: &str, field: &str) -> Result<String, StoreError>;
}
