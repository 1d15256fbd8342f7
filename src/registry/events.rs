// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Append-only lifecycle event log.
//!
//! Every accepted registry mutation appends one event. The log is the
//! registry's equivalent of emitted ledger events: it records who did what
//! and when, including the free-text revocation reason, and gives an
//! incremental projector a sequence to resume from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Identity;

/// Types of lifecycle events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentEventType {
    DocumentCreated,
    DocumentSigned,
    DocumentAmended,
    DocumentRevoked,
    UserRegistered,
}

/// A lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentEvent {
    /// Position in the log, starting at 1.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event_type: DocumentEventType,
    /// Identity that submitted the mutation.
    pub actor: Identity,
    /// Affected document, absent for registrations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<u64>,
    /// Additional details as JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl DocumentEvent {
    /// Create an event; the sequence number is assigned on append.
    pub fn new(event_type: DocumentEventType, actor: &Identity, timestamp: DateTime<Utc>) -> Self {
        Self {
            sequence: 0,
            timestamp,
            event_type,
            actor: actor.clone(),
            document_id: None,
            details: None,
        }
    }

    pub fn with_document(mut self, document_id: u64) -> Self {
        self.document_id = Some(document_id);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// In-memory append-only log.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<DocumentEvent>,
}

impl EventLog {
    pub fn append(&mut self, mut event: DocumentEvent) -> u64 {
        let sequence = self.events.len() as u64 + 1;
        event.sequence = sequence;
        self.events.push(event);
        sequence
    }

    /// Events for one document, oldest first.
    pub fn for_document(&self, document_id: u64) -> Vec<DocumentEvent> {
        self.events
            .iter()
            .filter(|e| e.document_id == Some(document_id))
            .cloned()
            .collect()
    }

    /// Events with a sequence number strictly greater than `after`.
    pub fn since(&self, after: u64) -> Vec<DocumentEvent> {
        let start = usize::try_from(after).unwrap_or(usize::MAX).min(self.events.len());
        self.events[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
