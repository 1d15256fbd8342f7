// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Document workflows across the core components.
//!
//! ```text
//! create:  validate ─▶ encrypt for creator + signers ─▶ put package ─▶ submit ─▶ clear index
//! open:    role check ─▶ get package ─▶ unwrap own key ─▶ decrypt
//! sign:    open ─▶ proof over (id, content address, signer) ─▶ submit ─▶ clear index
//! amend:   owner check ─▶ re-encrypt ─▶ put package ─▶ submit ─▶ clear index
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::crypto::envelope::{self, WrapFailure};
use crate::crypto::{proof, IdentityKey, SealedDocument};
use crate::error::{CoreError, CoreResult};
use crate::indexer::DocumentIndex;
use crate::ledger::{Ledger, LedgerOperation, Receipt};
use crate::models::{DocumentRole, Identity, NewUserProfile};
use crate::registry::{validate_signers, DocumentRegistry};
use crate::storage::ContentStore;

/// Outcome of sealing and recording a document revision.
#[derive(Debug, Clone, PartialEq)]
pub struct SealedRevision {
    pub document_id: u64,
    pub content_address: String,
    /// Recipients that could not be granted access.
    pub failures: Vec<WrapFailure>,
    pub receipt: Receipt,
}

/// Per-recipient failure summary suitable for reporting to the creator.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub recipient: Identity,
    pub error_code: &'static str,
    pub message: String,
}

impl SealedRevision {
    pub fn failure_report(&self) -> Vec<FailureReport> {
        self.failures
            .iter()
            .map(|f| FailureReport {
                recipient: f.recipient.clone(),
                error_code: f.error.error_code(),
                message: f.error.to_string(),
            })
            .collect()
    }
}

pub struct DocumentService<S, L> {
    registry: Arc<DocumentRegistry>,
    index: Arc<DocumentIndex>,
    content: S,
    ledger: L,
}

impl<S: ContentStore, L: Ledger> DocumentService<S, L> {
    pub fn new(registry: Arc<DocumentRegistry>, index: Arc<DocumentIndex>, content: S, ledger: L) -> Self {
        Self {
            registry,
            index,
            content,
            ledger,
        }
    }

    pub fn registry(&self) -> &Arc<DocumentRegistry> {
        &self.registry
    }

    pub fn index(&self) -> &Arc<DocumentIndex> {
        &self.index
    }

    pub fn content_store(&self) -> &S {
        &self.content
    }

    fn check_expiry(&self, expiry: Option<DateTime<Utc>>) -> CoreResult<()> {
        if expiry.is_some_and(|expiry| expiry <= self.registry.now()) {
            return Err(CoreError::InvalidInput("expiry must be in the future".into()));
        }
        Ok(())
    }

    /// Encrypt for the creator and every signer, then store the package.
    ///
    /// The creator must be able to read their own document, so a failed
    /// creator wrap aborts the operation.
    async fn seal(
        &self,
        creator: &Identity,
        signers: &[Identity],
        content: &[u8],
    ) -> CoreResult<(String, Vec<WrapFailure>)> {
        let mut recipients = Vec::with_capacity(signers.len() + 1);
        recipients.push(creator.clone());
        recipients.extend(signers.iter().cloned());

        let sealed = envelope::encrypt(content, &recipients, self.registry.as_ref())?;
        if sealed.wrapped_key_for(creator).is_none() {
            return Err(CoreError::KeyUnavailable(creator.clone()));
        }

        let package = SealedDocument::from_envelope(&sealed).to_bytes()?;
        let address = self.content.put(package).await?;
        Ok((address, sealed.failures))
    }

    /// Store a package sealed by the client.
    ///
    /// The bytes must decode as a [`SealedDocument`] with at least one
    /// recipient, so nothing unreadable is ever given an address.
    pub async fn publish(&self, package: Vec<u8>) -> CoreResult<String> {
        let sealed = SealedDocument::from_bytes(&package)
            .map_err(|_| CoreError::InvalidInput("body is not a sealed document".into()))?;
        if sealed.recipients().next().is_none() {
            return Err(CoreError::InvalidInput("sealed document has no recipients".into()));
        }
        let address = self.content.put(package).await?;
        tracing::debug!(%address, recipients = sealed.recipients().count(), "Package published");
        Ok(address)
    }

    pub async fn fetch(&self, content_address: &str) -> CoreResult<Vec<u8>> {
        self.content.get(content_address).await
    }

    /// Submit an operation prepared by the client (sealed and proven locally).
    pub async fn submit(&self, caller: &Identity, operation: LedgerOperation) -> CoreResult<Receipt> {
        let name = operation.name();
        let receipt = self.ledger.submit(caller, operation).await?;
        self.index.clear_cache();
        tracing::info!(operation = name, %caller, sequence = receipt.sequence, "Transaction recorded");
        Ok(receipt)
    }

    pub async fn create_document(
        &self,
        creator: &Identity,
        content: &[u8],
        signers: Vec<Identity>,
        expiry: Option<DateTime<Utc>>,
    ) -> CoreResult<SealedRevision> {
        validate_signers(creator, &signers, self.registry.signer_policy())?;
        self.check_expiry(expiry)?;

        let (content_address, failures) = self.seal(creator, &signers, content).await?;
        let receipt = self
            .ledger
            .submit(
                creator,
                LedgerOperation::CreateDocument {
                    content_address: content_address.clone(),
                    signers,
                    expiry,
                },
            )
            .await?;
        let document_id = receipt
            .document_id
            .ok_or_else(|| CoreError::LedgerFailure("receipt carries no document id".into()))?;
        self.index.clear_cache();

        tracing::info!(
            document_id,
            %creator,
            unreachable = failures.len(),
            "Document sealed and recorded"
        );
        Ok(SealedRevision {
            document_id,
            content_address,
            failures,
            receipt,
        })
    }

    /// Fetch and decrypt a document as `caller`.
    pub async fn open_document(&self, id: u64, caller: &Identity, key: &IdentityKey) -> CoreResult<Vec<u8>> {
        let document = self.registry.get_document(id)?;
        if document.role_of(caller) == DocumentRole::None {
            return Err(CoreError::Forbidden);
        }

        let bytes = self.content.get(&document.content_address).await?;
        SealedDocument::from_bytes(&bytes)?.open(caller, key)
    }

    /// Read, prove and record `signer`'s signature.
    pub async fn sign_document(&self, id: u64, signer: &Identity, key: &IdentityKey) -> CoreResult<Receipt> {
        let document = self.registry.get_document(id)?;
        if !document.is_signer(signer) {
            return Err(CoreError::Unauthorized);
        }
        // Signing requires having been able to read what is being signed.
        self.open_document(id, signer, key).await?;

        let signature_proof = proof::sign_proof(key, id, &document.content_address, signer);
        let receipt = self
            .ledger
            .submit(
                signer,
                LedgerOperation::SignDocument {
                    document_id: id,
                    signature_proof,
                },
            )
            .await?;
        self.index.clear_cache();
        Ok(receipt)
    }

    /// Replace a document's content, re-encrypting for the same signers.
    pub async fn amend_document(
        &self,
        id: u64,
        caller: &Identity,
        content: &[u8],
        expiry: Option<DateTime<Utc>>,
    ) -> CoreResult<SealedRevision> {
        let document = self.registry.get_document(id)?;
        if &document.creator != caller {
            return Err(CoreError::Forbidden);
        }
        if document.is_revoked {
            return Err(CoreError::AlreadyRevoked);
        }
        self.check_expiry(expiry)?;

        let (content_address, failures) = self.seal(caller, &document.signers, content).await?;
        let receipt = self
            .ledger
            .submit(
                caller,
                LedgerOperation::AmendDocument {
                    document_id: id,
                    content_address: content_address.clone(),
                    expiry,
                },
            )
            .await?;
        self.index.clear_cache();

        tracing::info!(document_id = id, unreachable = failures.len(), "Document amendment recorded");
        Ok(SealedRevision {
            document_id: id,
            content_address,
            failures,
            receipt,
        })
    }

    pub async fn revoke_document(&self, id: u64, caller: &Identity, reason: &str) -> CoreResult<Receipt> {
        let receipt = self
            .ledger
            .submit(
                caller,
                LedgerOperation::RevokeDocument {
                    document_id: id,
                    reason: reason.to_string(),
                },
            )
            .await?;
        self.index.clear_cache();
        Ok(receipt)
    }

    pub async fn register_user(&self, identity: &Identity, profile: NewUserProfile) -> CoreResult<Receipt> {
        let receipt = self
            .ledger
            .submit(identity, LedgerOperation::RegisterUser { profile })
            .await?;
        self.index.clear_cache();
        Ok(receipt)
    }
}
