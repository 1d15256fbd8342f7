// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Document Index
//!
//! Per-identity projection of the registry: the documents a user created or
//! must sign, and aggregate counts over them.
//!
//! ## Strategy
//!
//! 1. **Scan**: walk document ids `1..=document_count`, keeping documents
//!    where the identity is creator or listed signer, that are not revoked
//!    and have a content address. Results are ordered by id.
//! 2. **Cache**: results are memoized per identity in a [`ViewCache`] for a
//!    bounded TTL. [`DocumentIndex::clear_cache`] drops every entry.
//! 3. **Single flight**: at most one scan per identity runs at a time.
//!    Concurrent callers queue behind it and pick up its cached result.
//!
//! A scan that started before `clear_cache` may still populate the cache
//! when it finishes. Freshness after invalidation is best effort.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Identity;
use crate::registry::{Document, RegistryRead};
use crate::storage::ViewCache;

/// A signature on a document view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SignatureView {
    pub signer: Identity,
    pub signed_at: DateTime<Utc>,
}

/// User-facing projection of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DocumentView {
    pub id: u64,
    pub content_address: String,
    pub creator: Identity,
    pub signers: Vec<Identity>,
    /// Signatures in signer-list order.
    pub signatures: Vec<SignatureView>,
    pub signature_count: usize,
    pub fully_signed: bool,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
    pub expiry: Option<DateTime<Utc>>,
    pub amended_at: Option<DateTime<Utc>>,
    pub revision: u32,
}

impl DocumentView {
    pub fn has_signed(&self, identity: &Identity) -> bool {
        self.signatures.iter().any(|s| &s.signer == identity)
    }

    pub fn is_signer(&self, identity: &Identity) -> bool {
        self.signers.contains(identity)
    }
}

impl From<&Document> for DocumentView {
    fn from(document: &Document) -> Self {
        let signatures = document
            .signers
            .iter()
            .filter_map(|signer| {
                document.signed_by.get(signer).map(|signed_at| SignatureView {
                    signer: signer.clone(),
                    signed_at: *signed_at,
                })
            })
            .collect();

        Self {
            id: document.id,
            content_address: document.content_address.clone(),
            creator: document.creator.clone(),
            signers: document.signers.clone(),
            signatures,
            signature_count: document.signature_count,
            fully_signed: document.fully_signed,
            is_revoked: document.is_revoked,
            created_at: document.created_at,
            expiry: document.expiry,
            amended_at: document.amended_at,
            revision: document.revision,
        }
    }
}

/// Aggregate counts for one identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DocumentStats {
    /// Documents visible to the identity.
    pub total: usize,
    /// Awaiting this identity's signature.
    pub pending: usize,
    /// Fully signed.
    pub signed: usize,
    /// Created by this identity.
    pub created: usize,
}

impl DocumentStats {
    pub fn from_views(identity: &Identity, views: &[DocumentView]) -> Self {
        let mut stats = DocumentStats {
            total: views.len(),
            ..Default::default()
        };
        for view in views {
            if view.fully_signed {
                stats.signed += 1;
            } else if view.is_signer(identity) && !view.has_signed(identity) {
                stats.pending += 1;
            }
            if &view.creator == identity {
                stats.created += 1;
            }
        }
        stats
    }
}

/// Caching projector over the registry.
pub struct DocumentIndex {
    registry: Arc<dyn RegistryRead>,
    cache: Arc<dyn ViewCache>,
    inflight: Mutex<HashMap<Identity, Arc<tokio::sync::Mutex<()>>>>,
    scans: AtomicU64,
}

impl DocumentIndex {
    pub fn new(registry: Arc<dyn RegistryRead>, cache: Arc<dyn ViewCache>) -> Self {
        Self {
            registry,
            cache,
            inflight: Mutex::new(HashMap::new()),
            scans: AtomicU64::new(0),
        }
    }

    /// Documents `identity` created or must sign, ascending by id.
    pub async fn documents_for(&self, identity: &Identity) -> Vec<DocumentView> {
        if let Some(views) = self.cache.get(identity) {
            tracing::debug!(%identity, "Index cache hit");
            return views;
        }

        let gate = self.gate(identity);
        let views = {
            let _scan = gate.lock().await;
            match self.cache.get(identity) {
                Some(views) => views,
                None => {
                    let views = self.scan(identity);
                    self.cache.put(identity, views.clone());
                    views
                }
            }
        };
        self.release(identity, gate);
        views
    }

    pub async fn stats_for(&self, identity: &Identity) -> DocumentStats {
        let views = self.documents_for(identity).await;
        DocumentStats::from_views(identity, &views)
    }

    /// Drop every cached projection. The next lookup per identity rescans.
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
        tracing::debug!("Index cache cleared");
    }

    /// Number of full registry scans performed so far.
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    fn scan(&self, identity: &Identity) -> Vec<DocumentView> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        let count = self.registry.document_count();

        let views: Vec<DocumentView> = (1..=count)
            .filter_map(|id| self.registry.document(id))
            .filter(|document| {
                !document.is_revoked
                    && !document.content_address.is_empty()
                    && (&document.creator == identity || document.is_signer(identity))
            })
            .map(|document| DocumentView::from(&document))
            .collect();

        tracing::debug!(%identity, scanned = count, matched = views.len(), "Index scan complete");
        views
    }

    fn gate(&self, identity: &Identity) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        inflight
            .entry(identity.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn release(&self, identity: &Identity, gate: Arc<tokio::sync::Mutex<()>>) {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map and this caller hold the gate: nobody is queued.
        if Arc::strong_count(&gate) == 2 {
            inflight.remove(identity);
        }
    }
}
