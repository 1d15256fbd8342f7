// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-identity cache of projected document views.
//!
//! Entries expire after a fixed TTL and are evicted LRU beyond capacity.
//! [`ViewCache::invalidate_all`] drops every entry at once; the index calls
//! it after each accepted mutation.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::indexer::DocumentView;
use crate::models::Identity;

pub trait ViewCache: Send + Sync {
    /// Cached views for `identity`, if present and not expired.
    fn get(&self, identity: &Identity) -> Option<Vec<DocumentView>>;

    fn put(&self, identity: &Identity, views: Vec<DocumentView>);

    fn invalidate_all(&self);
}

struct CacheEntry {
    views: Vec<DocumentView>,
    inserted_at: Instant,
}

/// In-process LRU cache with a per-entry TTL.
pub struct LruViewCache {
    cache: Mutex<LruCache<Identity, CacheEntry>>,
    ttl: Duration,
}

impl LruViewCache {
    /// - `capacity`: max number of identities cached (at least one).
    /// - `ttl`: lifetime of each entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ViewCache for LruViewCache {
    fn get(&self, identity: &Identity) -> Option<Vec<DocumentView>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = cache.get(identity) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.views.clone());
            }
            cache.pop(identity);
        }
        None
    }

    fn put(&self, identity: &Identity, views: Vec<DocumentView>) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).put(
            identity.clone(),
            CacheEntry {
                views,
                inserted_at: Instant::now(),
            },
        );
    }

    fn invalidate_all(&self) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// Cache that never holds anything. Every lookup scans.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopViewCache;

impl ViewCache for NoopViewCache {
    fn get(&self, _identity: &Identity) -> Option<Vec<DocumentView>> {
        None
    }

    fn put(&self, _identity: &Identity, _views: Vec<DocumentView>) {}

    fn invalidate_all(&self) {}
}
