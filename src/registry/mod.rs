// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Document Registry
//!
//! Authoritative lifecycle state for documents and the user directory.
//!
//! ## States
//!
//! ```text
//! Active{signed: 0..N} ──sign──▶ Active{signed+1} ──(signed == N)──▶ FullySigned
//!        ▲      │                                                     │
//!        └amend─┘ (resets signed to 0)                                │
//!        │                                                            │
//!        └────────────────────revoke────────────────▶ Revoked ◀───────┘
//! ```
//!
//! `Revoked` is terminal: no mutation is accepted afterwards.
//!
//! ## Concurrency
//!
//! Each document sits behind its own mutex, so every mutation checks its
//! preconditions and applies its effect under one lock. Mutations on
//! different documents never contend; reads clone a snapshot.

pub mod clock;
pub mod document;
pub mod events;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::config::SignerPolicy;
use crate::crypto::envelope::KeyDirectory;
use crate::crypto::proof;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    is_plausible_email, normalize_email, DocumentRole, Identity, NewUserProfile, UserProfile,
};

pub use clock::{Clock, ManualClock, SystemClock};
pub use document::Document;
pub use events::{DocumentEvent, DocumentEventType, EventLog};

/// Registry behaviour switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryConfig {
    pub signer_policy: SignerPolicy,
}

/// Read-only view of the registry used by projections.
pub trait RegistryRead: Send + Sync {
    /// Highest allocated document id. Ids are dense starting at 1.
    fn document_count(&self) -> u64;

    fn document(&self, id: u64) -> Option<Document>;
}

/// Check a signer list against the creator and the active policy.
pub fn validate_signers(
    creator: &Identity,
    signers: &[Identity],
    policy: SignerPolicy,
) -> CoreResult<()> {
    if creator.is_null() {
        return Err(CoreError::InvalidInput("creator must not be the null identity".into()));
    }
    if signers.is_empty() {
        return Err(CoreError::InvalidInput("at least one signer is required".into()));
    }

    let mut seen = HashSet::with_capacity(signers.len());
    for signer in signers {
        if signer.is_null() {
            return Err(CoreError::InvalidInput("signer must not be the null identity".into()));
        }
        if !seen.insert(signer) {
            return Err(CoreError::InvalidInput(format!("duplicate signer {signer}")));
        }
        if signer == creator && policy == SignerPolicy::ExcludeCreator {
            return Err(CoreError::InvalidInput("creator cannot be listed as a signer".into()));
        }
    }
    Ok(())
}

fn validate_content_address(content_address: &str) -> CoreResult<String> {
    let trimmed = content_address.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidInput("content address must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

fn validate_expiry(expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> CoreResult<()> {
    match expiry {
        Some(expiry) if expiry <= now => Err(CoreError::InvalidInput(
            "expiry must be in the future".into(),
        )),
        _ => Ok(()),
    }
}

#[derive(Default)]
struct Directory {
    profiles: HashMap<Identity, UserProfile>,
    /// Normalized email → owning identity.
    emails: HashMap<String, Identity>,
}

pub struct DocumentRegistry {
    /// Index `i` holds document `i + 1`.
    documents: RwLock<Vec<Arc<Mutex<Document>>>>,
    directory: RwLock<Directory>,
    events: Mutex<EventLog>,
    clock: Arc<dyn Clock>,
    config: RegistryConfig,
}

impl DocumentRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            directory: RwLock::new(Directory::default()),
            events: Mutex::new(EventLog::default()),
            clock,
            config,
        }
    }

    pub fn signer_policy(&self) -> SignerPolicy {
        self.config.signer_policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn slot(&self, id: u64) -> CoreResult<Arc<Mutex<Document>>> {
        let documents = self.documents.read().unwrap_or_else(|e| e.into_inner());
        id.checked_sub(1)
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| documents.get(index))
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("document {id}")))
    }

    fn record(&self, event: DocumentEvent) -> u64 {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .append(event)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Register a new document and return its id.
    pub fn create_document(
        &self,
        creator: &Identity,
        content_address: &str,
        signers: Vec<Identity>,
        expiry: Option<DateTime<Utc>>,
    ) -> CoreResult<u64> {
        let content_address = validate_content_address(content_address)?;
        validate_signers(creator, &signers, self.config.signer_policy)?;
        let now = self.clock.now();
        validate_expiry(expiry, now)?;

        let signer_count = signers.len();
        let details = json!({
            "content_address": &content_address,
            "signers": &signers,
            "expiry": expiry,
        });

        let id = {
            let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
            let id = documents.len() as u64 + 1;
            documents.push(Arc::new(Mutex::new(Document::new(
                id,
                content_address,
                creator.clone(),
                signers,
                expiry,
                now,
            ))));
            self.record(
                DocumentEvent::new(DocumentEventType::DocumentCreated, creator, now)
                    .with_document(id)
                    .with_details(details),
            );
            id
        };

        tracing::info!(document_id = id, %creator, signers = signer_count, "Document created");
        Ok(id)
    }

    /// Record `caller`'s signature.
    ///
    /// When the caller has a registered public key the proof must verify
    /// against the document's current content address; otherwise it only
    /// has to be non-empty.
    pub fn sign_document(&self, id: u64, caller: &Identity, signature_proof: &[u8]) -> CoreResult<()> {
        let slot = self.slot(id)?;
        let public_key = self.public_key_of(caller);
        let now = self.clock.now();

        let mut document = slot.lock().unwrap_or_else(|e| e.into_inner());
        if document.is_revoked {
            return Err(CoreError::AlreadyRevoked);
        }
        if document.is_expired_at(now) {
            return Err(CoreError::Expired);
        }
        if !document.is_signer(caller) {
            return Err(CoreError::Unauthorized);
        }
        if document.has_signed(caller) {
            return Err(CoreError::AlreadySigned);
        }
        if signature_proof.is_empty() {
            return Err(CoreError::InvalidSignature);
        }
        if let Some(public_key) = public_key {
            proof::verify_proof(&public_key, id, &document.content_address, caller, signature_proof)?;
        }

        document.record_signature(caller.clone(), now);
        let (count, fully_signed) = (document.signature_count, document.fully_signed);
        self.record(
            DocumentEvent::new(DocumentEventType::DocumentSigned, caller, now)
                .with_document(id)
                .with_details(json!({
                    "signature_count": count,
                    "fully_signed": fully_signed,
                })),
        );
        drop(document);

        tracing::info!(document_id = id, signer = %caller, count, fully_signed, "Document signed");
        Ok(())
    }

    /// Replace content and expiry, clearing all signatures. Creator only.
    pub fn amend_document(
        &self,
        id: u64,
        caller: &Identity,
        new_content_address: &str,
        new_expiry: Option<DateTime<Utc>>,
    ) -> CoreResult<()> {
        let slot = self.slot(id)?;
        let now = self.clock.now();

        let mut document = slot.lock().unwrap_or_else(|e| e.into_inner());
        if &document.creator != caller {
            return Err(CoreError::Forbidden);
        }
        if document.is_revoked {
            return Err(CoreError::AlreadyRevoked);
        }
        let content_address = validate_content_address(new_content_address)?;
        validate_expiry(new_expiry, now)?;

        let cleared = document.signature_count;
        document.amend(content_address, new_expiry, now);
        let revision = document.revision;
        self.record(
            DocumentEvent::new(DocumentEventType::DocumentAmended, caller, now)
                .with_document(id)
                .with_details(json!({
                    "content_address": &document.content_address,
                    "expiry": new_expiry,
                    "revision": revision,
                    "signatures_cleared": cleared,
                })),
        );
        drop(document);

        tracing::info!(document_id = id, revision, cleared, "Document amended");
        Ok(())
    }

    /// Permanently revoke a document. Creator only.
    pub fn revoke_document(&self, id: u64, caller: &Identity, reason: &str) -> CoreResult<()> {
        let slot = self.slot(id)?;
        let now = self.clock.now();

        let mut document = slot.lock().unwrap_or_else(|e| e.into_inner());
        if &document.creator != caller {
            return Err(CoreError::Forbidden);
        }
        if document.is_revoked {
            return Err(CoreError::AlreadyRevoked);
        }

        let reason = reason.trim().to_string();
        document.revoke(reason.clone(), now);
        self.record(
            DocumentEvent::new(DocumentEventType::DocumentRevoked, caller, now)
                .with_document(id)
                .with_details(json!({ "reason": reason })),
        );
        drop(document);

        tracing::info!(document_id = id, "Document revoked");
        Ok(())
    }

    /// Register a profile for `identity`. Profiles are write-once.
    pub fn register_user(&self, identity: &Identity, request: NewUserProfile) -> CoreResult<UserProfile> {
        if identity.is_null() {
            return Err(CoreError::InvalidInput("identity must not be null".into()));
        }
        let first_name = request.first_name.trim().to_string();
        let last_name = request.last_name.trim().to_string();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(CoreError::InvalidInput("first and last name are required".into()));
        }
        let email = normalize_email(&request.email);
        if !is_plausible_email(&email) {
            return Err(CoreError::InvalidInput("email address is not valid".into()));
        }
        let now = self.clock.now();
        if request.date_of_birth >= now.date_naive() {
            return Err(CoreError::InvalidInput("date of birth must be in the past".into()));
        }
        proof::parse_public_key(&request.public_key)?;

        let profile = UserProfile {
            identity: identity.clone(),
            first_name,
            last_name,
            email: email.clone(),
            date_of_birth: request.date_of_birth,
            public_key: request.public_key,
            registered: true,
        };

        {
            let mut directory = self.directory.write().unwrap_or_else(|e| e.into_inner());
            if directory.profiles.contains_key(identity) {
                return Err(CoreError::InvalidInput(format!("{identity} is already registered")));
            }
            if directory.emails.contains_key(&email) {
                return Err(CoreError::InvalidInput("email address is already registered".into()));
            }
            directory.emails.insert(email, identity.clone());
            directory.profiles.insert(identity.clone(), profile.clone());
            self.record(DocumentEvent::new(DocumentEventType::UserRegistered, identity, now));
        }

        tracing::info!(%identity, "User registered");
        Ok(profile)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_document(&self, id: u64) -> CoreResult<Document> {
        let slot = self.slot(id)?;
        let document = slot.lock().unwrap_or_else(|e| e.into_inner());
        Ok(document.clone())
    }

    pub fn has_signed(&self, id: u64, identity: &Identity) -> CoreResult<bool> {
        let slot = self.slot(id)?;
        let document = slot.lock().unwrap_or_else(|e| e.into_inner());
        Ok(document.has_signed(identity))
    }

    pub fn role_of(&self, id: u64, identity: &Identity) -> CoreResult<DocumentRole> {
        let slot = self.slot(id)?;
        let document = slot.lock().unwrap_or_else(|e| e.into_inner());
        Ok(document.role_of(identity))
    }

    pub fn profile(&self, identity: &Identity) -> CoreResult<UserProfile> {
        self.directory
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .profiles
            .get(identity)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("profile {identity}")))
    }

    pub fn is_registered(&self, identity: &Identity) -> bool {
        self.directory
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .profiles
            .contains_key(identity)
    }

    /// Lifecycle events for one document, oldest first.
    pub fn events_for(&self, id: u64) -> CoreResult<Vec<DocumentEvent>> {
        self.slot(id)?;
        Ok(self
            .events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .for_document(id))
    }

    /// All events with a sequence number greater than `after`.
    pub fn events_since(&self, after: u64) -> Vec<DocumentEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .since(after)
    }
}

impl RegistryRead for DocumentRegistry {
    fn document_count(&self) -> u64 {
        self.documents.read().unwrap_or_else(|e| e.into_inner()).len() as u64
    }

    fn document(&self, id: u64) -> Option<Document> {
        self.get_document(id).ok()
    }
}

impl KeyDirectory for DocumentRegistry {
    fn public_key_of(&self, identity: &Identity) -> Option<Vec<u8>> {
        self.directory
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .profiles
            .get(identity)
            .map(|profile| profile.public_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::IdentityKey;
    use chrono::{Duration, NaiveDate, TimeZone};
    use proptest::prelude::*;

    const PROOF: &[u8] = b"unverified-proof";

    fn id(name: &str) -> Identity {
        Identity::new(name)
    }

    fn fixed_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()))
    }

    fn registry() -> (DocumentRegistry, Arc<ManualClock>) {
        let clock = fixed_clock();
        let registry = DocumentRegistry::with_clock(RegistryConfig::default(), clock.clone());
        (registry, clock)
    }

    fn new_profile(email: &str, public_key: Vec<u8>) -> NewUserProfile {
        NewUserProfile {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
            public_key,
        }
    }

    #[test]
    fn created_document_starts_unsigned() {
        let (registry, clock) = registry();
        let expiry = clock.now() + Duration::days(7);
        let doc_id = registry
            .create_document(&id("0xc"), "bafy-1", vec![id("0xa"), id("0xb")], Some(expiry))
            .unwrap();

        assert_eq!(doc_id, 1);
        let document = registry.get_document(doc_id).unwrap();
        assert_eq!(document.signature_count, 0);
        assert!(!document.fully_signed);
        assert!(!document.is_revoked);
        assert_eq!(document.expiry, Some(expiry));
        assert_eq!(document.created_at, clock.now());
        assert_eq!(registry.document_count(), 1);
    }

    #[test]
    fn ids_are_monotonic() {
        let (registry, _) = registry();
        for expected in 1..=3 {
            let got = registry
                .create_document(&id("0xc"), "bafy", vec![id("0xa")], None)
                .unwrap();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn create_rejects_invalid_input() {
        let (registry, clock) = registry();
        let c = id("0xc");
        let invalid = |result: CoreResult<u64>| assert!(matches!(result, Err(CoreError::InvalidInput(_))));

        invalid(registry.create_document(&c, "  ", vec![id("0xa")], None));
        invalid(registry.create_document(&c, "bafy", vec![], None));
        invalid(registry.create_document(&c, "bafy", vec![id("0xa"), id("0xA")], None));
        invalid(registry.create_document(&c, "bafy", vec![id("0x0000")], None));
        invalid(registry.create_document(&c, "bafy", vec![id("")], None));
        invalid(registry.create_document(&c, "bafy", vec![id("0xa"), c.clone()], None));
        invalid(registry.create_document(&c, "bafy", vec![id("0xa")], Some(clock.now())));
        invalid(registry.create_document(&id("0x0"), "bafy", vec![id("0xa")], None));

        assert_eq!(registry.document_count(), 0);
    }

    #[test]
    fn allow_creator_policy_lets_creator_sign() {
        let registry = DocumentRegistry::with_clock(
            RegistryConfig {
                signer_policy: SignerPolicy::AllowCreator,
            },
            fixed_clock(),
        );
        let c = id("0xc");
        let doc_id = registry
            .create_document(&c, "bafy", vec![c.clone(), id("0xa")], None)
            .unwrap();

        registry.sign_document(doc_id, &c, PROOF).unwrap();
        assert!(registry.has_signed(doc_id, &c).unwrap());
        assert_eq!(registry.role_of(doc_id, &c).unwrap(), DocumentRole::Creator);
    }

    #[test]
    fn lifecycle_scenario() {
        let (registry, _) = registry();
        let (c, a, b) = (id("0xc"), id("0xa"), id("0xb"));
        let doc_id = registry
            .create_document(&c, "bafy-1", vec![a.clone(), b.clone()], None)
            .unwrap();

        registry.sign_document(doc_id, &a, PROOF).unwrap();
        let document = registry.get_document(doc_id).unwrap();
        assert_eq!((document.signature_count, document.fully_signed), (1, false));

        registry.sign_document(doc_id, &b, PROOF).unwrap();
        let document = registry.get_document(doc_id).unwrap();
        assert_eq!((document.signature_count, document.fully_signed), (2, true));

        registry.amend_document(doc_id, &c, "bafy-2", None).unwrap();
        let document = registry.get_document(doc_id).unwrap();
        assert_eq!((document.signature_count, document.fully_signed), (0, false));
        assert_eq!(document.content_address, "bafy-2");
        assert_eq!(document.creator, c);
        assert!(!registry.has_signed(doc_id, &a).unwrap());

        registry.revoke_document(doc_id, &c, "superseded").unwrap();
        assert_eq!(
            registry.sign_document(doc_id, &a, PROOF),
            Err(CoreError::AlreadyRevoked)
        );
        assert_eq!(
            registry.sign_document(doc_id, &b, PROOF),
            Err(CoreError::AlreadyRevoked)
        );

        let kinds: Vec<_> = registry
            .events_for(doc_id)
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(
            kinds,
            vec![
                DocumentEventType::DocumentCreated,
                DocumentEventType::DocumentSigned,
                DocumentEventType::DocumentSigned,
                DocumentEventType::DocumentAmended,
                DocumentEventType::DocumentRevoked,
            ]
        );
    }

    #[test]
    fn double_sign_fails_regardless_of_interleaving() {
        let (registry, _) = registry();
        let signers = vec![id("0xa"), id("0xb"), id("0xd")];
        let doc_id = registry
            .create_document(&id("0xc"), "bafy", signers.clone(), None)
            .unwrap();

        registry.sign_document(doc_id, &signers[0], PROOF).unwrap();
        registry.sign_document(doc_id, &signers[1], PROOF).unwrap();
        assert_eq!(
            registry.sign_document(doc_id, &signers[0], PROOF),
            Err(CoreError::AlreadySigned)
        );
        assert_eq!(registry.get_document(doc_id).unwrap().signature_count, 2);
    }

    #[test]
    fn sign_precondition_errors() {
        let (registry, clock) = registry();
        let a = id("0xa");
        assert!(matches!(
            registry.sign_document(42, &a, PROOF),
            Err(CoreError::NotFound(_))
        ));

        let doc_id = registry
            .create_document(&id("0xc"), "bafy", vec![a.clone()], Some(clock.now() + Duration::hours(1)))
            .unwrap();
        assert_eq!(
            registry.sign_document(doc_id, &id("0xe"), PROOF),
            Err(CoreError::Unauthorized)
        );
        assert_eq!(
            registry.sign_document(doc_id, &id("0xc"), PROOF),
            Err(CoreError::Unauthorized)
        );
        assert_eq!(
            registry.sign_document(doc_id, &a, b""),
            Err(CoreError::InvalidSignature)
        );

        clock.advance(Duration::hours(1));
        assert_eq!(
            registry.sign_document(doc_id, &a, PROOF),
            Err(CoreError::Expired)
        );
    }

    #[test]
    fn expired_document_can_still_be_amended_and_revoked() {
        let (registry, clock) = registry();
        let c = id("0xc");
        let doc_id = registry
            .create_document(&c, "bafy", vec![id("0xa")], Some(clock.now() + Duration::minutes(5)))
            .unwrap();
        clock.advance(Duration::hours(1));

        registry
            .amend_document(doc_id, &c, "bafy-2", Some(clock.now() + Duration::days(1)))
            .unwrap();
        registry.sign_document(doc_id, &id("0xa"), PROOF).unwrap();

        clock.advance(Duration::days(2));
        registry.revoke_document(doc_id, &c, "lapsed").unwrap();
    }

    #[test]
    fn amend_and_revoke_are_owner_only() {
        let (registry, _) = registry();
        let (c, a) = (id("0xc"), id("0xa"));
        let doc_id = registry.create_document(&c, "bafy", vec![a.clone()], None).unwrap();

        assert_eq!(
            registry.amend_document(doc_id, &a, "bafy-2", None),
            Err(CoreError::Forbidden)
        );
        assert_eq!(
            registry.revoke_document(doc_id, &a, "mine now"),
            Err(CoreError::Forbidden)
        );
        assert!(matches!(
            registry.amend_document(doc_id, &c, "", None),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            registry.amend_document(99, &c, "bafy-2", None),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn revocation_is_terminal() {
        let (registry, _) = registry();
        let (c, a) = (id("0xc"), id("0xa"));
        let doc_id = registry.create_document(&c, "bafy", vec![a.clone()], None).unwrap();

        registry.revoke_document(doc_id, &c, " withdrawn ").unwrap();
        assert_eq!(
            registry.revoke_document(doc_id, &c, "again"),
            Err(CoreError::AlreadyRevoked)
        );
        assert_eq!(
            registry.amend_document(doc_id, &c, "bafy-2", None),
            Err(CoreError::AlreadyRevoked)
        );
        assert_eq!(
            registry.sign_document(doc_id, &a, PROOF),
            Err(CoreError::AlreadyRevoked)
        );

        let document = registry.get_document(doc_id).unwrap();
        assert!(document.is_revoked);
        assert_eq!(document.revocation_reason.as_deref(), Some("withdrawn"));
    }

    #[test]
    fn registered_signer_needs_a_valid_proof() {
        let (registry, _) = registry();
        let a = id("0xa");
        let key = IdentityKey::generate();
        registry
            .register_user(&a, new_profile("ada@example.com", key.public_key()))
            .unwrap();

        let doc_id = registry
            .create_document(&id("0xc"), "bafy-1", vec![a.clone()], None)
            .unwrap();

        assert_eq!(
            registry.sign_document(doc_id, &a, PROOF),
            Err(CoreError::InvalidSignature)
        );
        let stale = proof::sign_proof(&key, doc_id, "bafy-0", &a);
        assert_eq!(
            registry.sign_document(doc_id, &a, &stale),
            Err(CoreError::InvalidSignature)
        );

        let good = proof::sign_proof(&key, doc_id, "bafy-1", &a);
        registry.sign_document(doc_id, &a, &good).unwrap();
        assert!(registry.get_document(doc_id).unwrap().fully_signed);
    }

    #[test]
    fn registration_rules() {
        let (registry, _) = registry();
        let key = IdentityKey::generate().public_key();

        let profile = registry
            .register_user(&id("0xA"), new_profile("  Ada@Example.COM ", key.clone()))
            .unwrap();
        assert_eq!(profile.email, "ada@example.com");
        assert!(profile.registered);
        assert!(registry.is_registered(&id("0xa")));
        assert_eq!(registry.public_key_of(&id("0xa")), Some(key.clone()));

        let invalid = |result: CoreResult<UserProfile>| {
            assert!(matches!(result, Err(CoreError::InvalidInput(_))))
        };
        // same identity, same email (different case), fullwidth email variant
        invalid(registry.register_user(&id("0xa"), new_profile("other@example.com", key.clone())));
        invalid(registry.register_user(&id("0xb"), new_profile("ADA@example.com", key.clone())));
        invalid(registry.register_user(&id("0xb"), new_profile("ａｄａ@example.com", key.clone())));
        invalid(registry.register_user(&id("0x0"), new_profile("z@example.com", key.clone())));
        invalid(registry.register_user(&id("0xb"), new_profile("not-an-email", key.clone())));
        invalid(registry.register_user(&id("0xb"), new_profile("b@example.com", vec![1, 2, 3])));

        let mut future_birth = new_profile("b@example.com", key.clone());
        future_birth.date_of_birth = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        invalid(registry.register_user(&id("0xb"), future_birth));

        let mut nameless = new_profile("b@example.com", key);
        nameless.first_name = "  ".into();
        invalid(registry.register_user(&id("0xb"), nameless));

        assert!(matches!(registry.profile(&id("0xb")), Err(CoreError::NotFound(_))));
        assert_eq!(registry.public_key_of(&id("0xb")), None);
    }

    #[test]
    fn events_since_tracks_all_mutations() {
        let (registry, _) = registry();
        let key = IdentityKey::generate().public_key();
        registry
            .register_user(&id("0xa"), new_profile("a@example.com", key))
            .unwrap();
        registry
            .create_document(&id("0xc"), "bafy", vec![id("0xb")], None)
            .unwrap();

        let all = registry.events_since(0);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].event_type, DocumentEventType::UserRegistered);
        assert_eq!(registry.events_since(1).len(), 1);
        assert!(matches!(registry.events_for(5), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn concurrent_signers_do_not_lose_updates() {
        let (registry, _) = registry();
        let signers: Vec<Identity> = (0..32).map(|i| id(&format!("0x{:x}", i + 1))).collect();
        let doc_id = registry
            .create_document(&id("0xc0ffee"), "bafy", signers.clone(), None)
            .unwrap();

        std::thread::scope(|scope| {
            for signer in &signers {
                let registry = &registry;
                scope.spawn(move || {
                    registry.sign_document(doc_id, signer, PROOF).unwrap();
                    // A second attempt from the same signer always loses.
                    assert_eq!(
                        registry.sign_document(doc_id, signer, PROOF),
                        Err(CoreError::AlreadySigned)
                    );
                });
            }
        });

        let document = registry.get_document(doc_id).unwrap();
        assert_eq!(document.signature_count, signers.len());
        assert!(document.fully_signed);
    }

    proptest! {
        #[test]
        fn signing_order_does_not_matter(
            order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let signers: Vec<Identity> = (0..6).map(|i| id(&format!("0xs{i}"))).collect();

            let (in_order, _) = registry();
            let (shuffled, _) = registry();
            for registry in [&in_order, &shuffled] {
                registry.create_document(&id("0xc"), "bafy", signers.clone(), None).unwrap();
            }

            for signer in &signers {
                in_order.sign_document(1, signer, PROOF).unwrap();
            }
            for &i in &order {
                shuffled.sign_document(1, &signers[i], PROOF).unwrap();
            }

            prop_assert_eq!(in_order.get_document(1).unwrap(), shuffled.get_document(1).unwrap());
            prop_assert!(shuffled.get_document(1).unwrap().fully_signed);
        }
    }
}
