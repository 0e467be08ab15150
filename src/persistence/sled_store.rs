//! Key-value store backed by `sled`
//!
//! Two trees emulate the set and hash structures the registry needs:
//! - `sets`: `{set}\0{member}` -> empty
//! - `hashes`: `{key}\0{field}` -> value
//!
//! A missing field reads as an empty string, never as an error. Nothing here
//! is transactional across keys.

use std::collections::{BTreeSet, HashMap};

use sled::{Batch, Db, Tree};

use crate::persistence::KeyValueStore;
use crate::utils::error::StoreError;

const SEPARATOR: u8 = 0;

#[derive(Clone)]
pub struct SledStore {
    db: Db,
    sets: Tree,
    hashes: Tree,
}

impl SledStore {
    /// Open or create a sled database at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A throwaway database that is removed when dropped.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, StoreError> {
        let sets = db.open_tree("sets")?;
        let hashes = db.open_tree("hashes")?;
        Ok(Self { db, sets, hashes })
    }

    /// Flushes pending writes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

fn prefix(key: &str) -> Vec<u8> {
    let mut p = Vec::with_capacity(key.len() + 1);
    p.extend_from_slice(key.as_bytes());
    p.push(SEPARATOR);
    p
}

fn compound(key: &str, item: &str) -> Vec<u8> {
    let mut k = prefix(key);
    k.extend_from_slice(item.as_bytes());
    k
}

fn clear_prefix(tree: &Tree, key: &str) -> Result<(), StoreError> {
    let mut batch = Batch::default();
    for entry in tree.scan_prefix(prefix(key)) {
        let (k, _) = entry?;
        batch.remove(k);
    }
    tree.apply_batch(batch)?;
    Ok(())
}

impl KeyValueStore for SledStore {
    fn add_member(&self, set: &str, member: &str) -> Result<(), StoreError> {
        self.sets.insert(compound(set, member), Vec::<u8>::new())?;
        Ok(())
    }

    fn list_members(&self, set: &str) -> Result<BTreeSet<String>, StoreError> {
        let p = prefix(set);
        let mut members = BTreeSet::new();
        for entry in self.sets.scan_prefix(&p) {
            let (k, _) = entry?;
            let member = std::str::from_utf8(&k[p.len()..]).map_err(|_| {
                StoreError::InvalidUtf8 {
                    key: set.to_string(),
                }
            })?;
            members.insert(member.to_string());
        }
        Ok(members)
    }

    fn remove_all(&self, key: &str) -> Result<(), StoreError> {
        clear_prefix(&self.sets, key)?;
        clear_prefix(&self.hashes, key)
    }

    fn set_fields(&self, key: &str, fields: &HashMap<String, String>) -> Result<(), StoreError> {
        let mut batch = Batch::default();
        for (field, value) in fields {
            batch.insert(compound(key, field), value.as_bytes());
        }
        self.hashes.apply_batch(batch)?;
        Ok(())
    }

    fn get_field(&self, key: &str, field: &str) -> Result<String, StoreError> {
        match self.hashes.get(compound(key, field))? {
            Some(value) => String::from_utf8(value.to_vec()).map_err(|_| StoreError::InvalidUtf8 {
                key: key.to_string(),
            }),
            None => Ok(String::new()),
        }
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("db", &"sled::Db")
            .finish()
    }
}
