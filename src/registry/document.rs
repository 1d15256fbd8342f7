// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Document record held by the registry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{DocumentRole, Identity};

/// Authoritative document state.
///
/// `signature_count` and `fully_signed` are stored alongside `signed_by` so
/// reads never recompute them; every mutation goes through the methods
/// below, which keep the three consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Document {
    pub id: u64,
    pub content_address: String,
    pub creator: Identity,
    pub signers: Vec<Identity>,
    pub signature_count: usize,
    /// Signer → time of signature.
    pub signed_by: BTreeMap<Identity, DateTime<Utc>>,
    pub fully_signed: bool,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
    pub expiry: Option<DateTime<Utc>>,
    /// Number of amendments applied.
    pub revision: u32,
    pub amended_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revocation_reason: Option<String>,
}

impl Document {
    pub(crate) fn new(
        id: u64,
        content_address: String,
        creator: Identity,
        signers: Vec<Identity>,
        expiry: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            content_address,
            creator,
            signers,
            signature_count: 0,
            signed_by: BTreeMap::new(),
            fully_signed: false,
            is_revoked: false,
            created_at,
            expiry,
            revision: 0,
            amended_at: None,
            revoked_at: None,
            revocation_reason: None,
        }
    }

    pub fn is_signer(&self, identity: &Identity) -> bool {
        self.signers.contains(identity)
    }

    pub fn has_signed(&self, identity: &Identity) -> bool {
        self.signed_by.contains_key(identity)
    }

    pub fn role_of(&self, identity: &Identity) -> DocumentRole {
        if &self.creator == identity {
            DocumentRole::Creator
        } else if self.is_signer(identity) {
            DocumentRole::Signer
        } else {
            DocumentRole::None
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }

    pub(crate) fn record_signature(&mut self, signer: Identity, at: DateTime<Utc>) {
        self.signed_by.insert(signer, at);
        self.signature_count = self.signed_by.len();
        self.fully_signed = self.signature_count == self.signers.len();
    }

    pub(crate) fn amend(
        &mut self,
        content_address: String,
        expiry: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) {
        self.content_address = content_address;
        self.expiry = expiry;
        self.signed_by.clear();
        self.signature_count = 0;
        self.fully_signed = false;
        self.revision += 1;
        self.amended_at = Some(at);
    }

    pub(crate) fn revoke(&mut self, reason: String, at: DateTime<Utc>) {
        self.is_revoked = true;
        self.revoked_at = Some(at);
        self.revocation_reason = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn doc() -> Document {
        Document::new(
            1,
            "addr-1".into(),
            Identity::new("0xc"),
            vec![Identity::new("0xa"), Identity::new("0xb")],
            None,
            Utc::now(),
        )
    }

    #[test]
    fn signatures_drive_count_and_fully_signed() {
        let mut d = doc();
        d.record_signature(Identity::new("0xa"), Utc::now());
        assert_eq!(d.signature_count, 1);
        assert!(!d.fully_signed);

        d.record_signature(Identity::new("0xb"), Utc::now());
        assert_eq!(d.signature_count, 2);
        assert!(d.fully_signed);
    }

    #[test]
    fn amend_resets_signature_state() {
        let mut d = doc();
        d.record_signature(Identity::new("0xa"), Utc::now());
        d.record_signature(Identity::new("0xb"), Utc::now());

        d.amend("addr-2".into(), None, Utc::now());
        assert_eq!(d.signature_count, 0);
        assert!(d.signed_by.is_empty());
        assert!(!d.fully_signed);
        assert_eq!(d.revision, 1);
        assert_eq!(d.creator, Identity::new("0xc"));
    }

    #[test]
    fn roles() {
        let d = doc();
        assert_eq!(d.role_of(&Identity::new("0xc")), DocumentRole::Creator);
        assert_eq!(d.role_of(&Identity::new("0xa")), DocumentRole::Signer);
        assert_eq!(d.role_of(&Identity::new("0xz")), DocumentRole::None);
    }

    #[test]
    fn expiry_is_inclusive_of_the_instant() {
        let now = Utc::now();
        let mut d = doc();
        assert!(!d.is_expired_at(now));
        d.expiry = Some(now);
        assert!(d.is_expired_at(now));
        assert!(!d.is_expired_at(now - Duration::seconds(1)));
    }
}
