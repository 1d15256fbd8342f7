// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-identity sealed key persistence.
//!
//! Stores hold one opaque blob per identity. They never see a passphrase or
//! a plaintext key; see [`crate::crypto::custody`] for the blob format.
//!
//! ## Table Layout (redb)
//!
//! - `sealed_keys`: identity → sealed key blob

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::error::{CoreError, CoreResult};
use crate::models::Identity;

const SEALED_KEYS: TableDefinition<&str, &[u8]> = TableDefinition::new("sealed_keys");

/// Keyed blob store for sealed identity keys.
pub trait KeyStore: Send + Sync {
    /// Persist a blob for a new identity. Refuses to overwrite.
    fn store(&self, identity: &Identity, blob: &[u8]) -> CoreResult<()>;

    fn load(&self, identity: &Identity) -> CoreResult<Option<Vec<u8>>>;

    /// Persist a blob, replacing any existing one.
    fn restore(&self, identity: &Identity, blob: &[u8]) -> CoreResult<()>;
}

impl<T: KeyStore + ?Sized> KeyStore for Arc<T> {
    fn store(&self, identity: &Identity, blob: &[u8]) -> CoreResult<()> {
        (**self).store(identity, blob)
    }

    fn load(&self, identity: &Identity) -> CoreResult<Option<Vec<u8>>> {
        (**self).load(identity)
    }

    fn restore(&self, identity: &Identity, blob: &[u8]) -> CoreResult<()> {
        (**self).restore(identity, blob)
    }
}

fn already_enrolled(identity: &Identity) -> CoreError {
    CoreError::InvalidInput(format!("identity {identity} already holds a sealed key"))
}

// =============================================================================
// In-memory
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    blobs: RwLock<HashMap<Identity, Vec<u8>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn store(&self, identity: &Identity, blob: &[u8]) -> CoreResult<()> {
        let mut blobs = self.blobs.write().unwrap_or_else(|e| e.into_inner());
        if blobs.contains_key(identity) {
            return Err(already_enrolled(identity));
        }
        blobs.insert(identity.clone(), blob.to_vec());
        Ok(())
    }

    fn load(&self, identity: &Identity) -> CoreResult<Option<Vec<u8>>> {
        Ok(self
            .blobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(identity)
            .cloned())
    }

    fn restore(&self, identity: &Identity, blob: &[u8]) -> CoreResult<()> {
        self.blobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(identity.clone(), blob.to_vec());
        Ok(())
    }
}

// =============================================================================
// redb
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum KeyDbError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<KeyDbError> for CoreError {
    fn from(err: KeyDbError) -> Self {
        CoreError::StorageFailure(err.to_string())
    }
}

/// Embedded ACID key store.
pub struct RedbKeyStore {
    db: Database,
}

impl RedbKeyStore {
    /// Open (or create) the store at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, KeyDbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SEALED_KEYS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn put(&self, identity: &Identity, blob: &[u8], overwrite: bool) -> CoreResult<()> {
        let write_txn = self.db.begin_write().map_err(KeyDbError::from)?;
        {
            let mut table = write_txn.open_table(SEALED_KEYS).map_err(KeyDbError::from)?;
            let exists = table
                .get(identity.as_str())
                .map_err(KeyDbError::from)?
                .is_some();
            if exists && !overwrite {
                return Err(already_enrolled(identity));
            }
            table
                .insert(identity.as_str(), blob)
                .map_err(KeyDbError::from)?;
        }
        write_txn.commit().map_err(KeyDbError::from)?;
        Ok(())
    }
}

impl KeyStore for RedbKeyStore {
    fn store(&self, identity: &Identity, blob: &[u8]) -> CoreResult<()> {
        self.put(identity, blob, false)
    }

    fn load(&self, identity: &Identity) -> CoreResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read().map_err(KeyDbError::from)?;
        let table = read_txn.open_table(SEALED_KEYS).map_err(KeyDbError::from)?;
        let value = table.get(identity.as_str()).map_err(KeyDbError::from)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn restore(&self, identity: &Identity, blob: &[u8]) -> CoreResult<()> {
        self.put(identity, blob, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KeyStore) {
        let alice = Identity::new("0xA11CE");

        assert_eq!(store.load(&alice).unwrap(), None);
        store.store(&alice, b"v1").unwrap();
        assert_eq!(store.load(&alice).unwrap().as_deref(), Some(&b"v1"[..]));

        assert!(matches!(
            store.store(&alice, b"v2"),
            Err(CoreError::InvalidInput(_))
        ));
        assert_eq!(store.load(&alice).unwrap().as_deref(), Some(&b"v1"[..]));

        store.restore(&alice, b"v3").unwrap();
        assert_eq!(
            store.load(&Identity::new("0xa11ce")).unwrap().as_deref(),
            Some(&b"v3"[..])
        );

        // restore also works for identities with nothing stored yet
        let bob = Identity::new("0xb0b");
        store.restore(&bob, b"b").unwrap();
        assert_eq!(store.load(&bob).unwrap().as_deref(), Some(&b"b"[..]));
    }

    #[test]
    fn memory_store_semantics() {
        exercise(&MemoryKeyStore::new());
    }

    #[test]
    fn redb_store_semantics() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbKeyStore::open(&dir.path().join("keys.redb")).unwrap();
        exercise(&store);
    }

    #[test]
    fn redb_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("keys.redb");
        let alice = Identity::new("0xa11ce");

        {
            let store = RedbKeyStore::open(&path).unwrap();
            store.store(&alice, b"sealed").unwrap();
        }

        let store = RedbKeyStore::open(&path).unwrap();
        assert_eq!(store.load(&alice).unwrap().as_deref(), Some(&b"sealed"[..]));
    }
}
