// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::Config;
use crate::crypto::KeyCustody;
use crate::indexer::DocumentIndex;
use crate::ledger::LocalLedger;
use crate::registry::{DocumentRegistry, RegistryConfig};
use crate::service::DocumentService;
use crate::storage::{KeyStore, LruViewCache, MemoryContentStore, MemoryKeyStore};

/// Key custody over whichever store the process was started with.
pub type SharedCustody = KeyCustody<Arc<dyn KeyStore>>;

/// Write path over the same registry and index the query routes read.
pub type SharedService = DocumentService<MemoryContentStore, LocalLedger>;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<DocumentRegistry>,
    pub index: Arc<DocumentIndex>,
    pub service: Arc<SharedService>,
    pub custody: Arc<SharedCustody>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build a registry, an LRU-cached index and in-memory key custody.
    pub fn new(config: Config) -> Self {
        Self::with_key_store(config, Arc::new(MemoryKeyStore::new()))
    }

    pub fn with_key_store(config: Config, key_store: Arc<dyn KeyStore>) -> Self {
        let registry = Arc::new(DocumentRegistry::new(RegistryConfig {
            signer_policy: config.signer_policy,
        }));
        let index = Arc::new(DocumentIndex::new(
            registry.clone(),
            Arc::new(LruViewCache::new(config.cache_capacity, config.cache_ttl)),
        ));
        let service = Arc::new(DocumentService::new(
            registry.clone(),
            index.clone(),
            MemoryContentStore::new(),
            LocalLedger::new(registry.clone()),
        ));
        Self {
            registry,
            index,
            service,
            custody: Arc::new(KeyCustody::new(key_store)),
            config: Arc::new(config),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
