// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Content-addressed blob storage.
//!
//! Sealed document packages are pushed here and referenced from the
//! registry by address. The production transport (a pinning service) lives
//! outside this crate; [`MemoryContentStore`] backs tests and local runs.

use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;

use sha2::{Digest, Sha256};

use crate::error::{CoreError, CoreResult};

/// Opaque blob storage keyed by content address.
///
/// Failures are reported as [`CoreError::StorageFailure`].
pub trait ContentStore: Send + Sync {
    fn put(&self, bytes: Vec<u8>) -> impl Future<Output = CoreResult<String>> + Send;

    fn get(&self, address: &str) -> impl Future<Output = CoreResult<Vec<u8>>> + Send;
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn content_address(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// In-memory store addressing blobs by SHA-256.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn corrupt(&self, address: &str) {
        let mut blobs = self.blobs.write().unwrap_or_else(|e| e.into_inner());
        if let Some(blob) = blobs.get_mut(address) {
            blob.push(0);
        }
    }
}

impl ContentStore for MemoryContentStore {
    async fn put(&self, bytes: Vec<u8>) -> CoreResult<String> {
        let address = content_address(&bytes);
        self.blobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address.clone(), bytes);
        Ok(address)
    }

    async fn get(&self, address: &str) -> CoreResult<Vec<u8>> {
        let blob = self
            .blobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(address)
            .cloned()
            .ok_or_else(|| CoreError::StorageFailure(format!("content not found: {address}")))?;

        if content_address(&blob) != address {
            return Err(CoreError::StorageFailure(format!(
                "content hash mismatch for {address}"
            )));
        }
        Ok(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip() {
        let store = MemoryContentStore::new();
        let address = store.put(b"sealed".to_vec()).await.unwrap();

        assert_eq!(address.len(), 64);
        assert_eq!(address, content_address(b"sealed"));
        assert_eq!(store.get(&address).await.unwrap(), b"sealed");
    }

    #[tokio::test]
    async fn identical_content_shares_an_address() {
        let store = MemoryContentStore::new();
        let a = store.put(b"same".to_vec()).await.unwrap();
        let b = store.put(b"same".to_vec()).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_not_found() {
        let store = MemoryContentStore::new();
        assert!(matches!(
            store.get("deadbeef").await,
            Err(CoreError::StorageFailure(_))
        ));
    }

    #[tokio::test]
    async fn corrupted_blob_is_detected() {
        let store = MemoryContentStore::new();
        let address = store.put(b"sealed".to_vec()).await.unwrap();
        store.corrupt(&address);
        assert!(matches!(
            store.get(&address).await,
            Err(CoreError::StorageFailure(_))
        ));
    }
}
