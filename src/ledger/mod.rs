// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger transaction interface.
//!
//! The ledger persists registry state and serializes conflicting
//! mutations. Each submission is atomic: it either applies and yields a
//! [`Receipt`], or reverts with a reason string of the form `code` or
//! `code: detail` (see [`CoreError::revert_reason`]).
//!
//! [`LocalLedger`] executes operations against an in-process
//! [`DocumentRegistry`]. A chain-backed implementation plugs in behind the
//! same trait; retry and fee policy belong to that implementation.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{base64_bytes, Identity, NewUserProfile};
use crate::registry::DocumentRegistry;

/// A state-changing registry operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum LedgerOperation {
    CreateDocument {
        content_address: String,
        signers: Vec<Identity>,
        expiry: Option<DateTime<Utc>>,
    },
    SignDocument {
        document_id: u64,
        #[serde(with = "base64_bytes")]
        signature_proof: Vec<u8>,
    },
    AmendDocument {
        document_id: u64,
        content_address: String,
        expiry: Option<DateTime<Utc>>,
    },
    RevokeDocument {
        document_id: u64,
        reason: String,
    },
    RegisterUser {
        profile: NewUserProfile,
    },
}

impl LedgerOperation {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerOperation::CreateDocument { .. } => "create_document",
            LedgerOperation::SignDocument { .. } => "sign_document",
            LedgerOperation::AmendDocument { .. } => "amend_document",
            LedgerOperation::RevokeDocument { .. } => "revoke_document",
            LedgerOperation::RegisterUser { .. } => "register_user",
        }
    }
}

/// Proof of an applied operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Receipt {
    pub tx_id: Uuid,
    /// Position of this transaction in the ledger, starting at 1.
    pub sequence: u64,
    /// Document created or touched by the operation.
    pub document_id: Option<u64>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The operation was rejected; the reason encodes a [`CoreError`].
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// The submission never reached a final outcome.
    #[error("ledger transport error: {0}")]
    Transport(String),
}

impl From<LedgerError> for CoreError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Reverted(reason) => CoreError::from_revert_reason(&reason),
            LedgerError::Transport(detail) => CoreError::LedgerFailure(detail),
        }
    }
}

pub trait Ledger: Send + Sync {
    fn submit(
        &self,
        caller: &Identity,
        operation: LedgerOperation,
    ) -> impl Future<Output = Result<Receipt, LedgerError>> + Send;
}

/// In-process ledger over a shared registry.
pub struct LocalLedger {
    registry: Arc<DocumentRegistry>,
    sequence: AtomicU64,
}

impl LocalLedger {
    pub fn new(registry: Arc<DocumentRegistry>) -> Self {
        Self {
            registry,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<DocumentRegistry> {
        &self.registry
    }

    fn execute(&self, caller: &Identity, operation: LedgerOperation) -> Result<Option<u64>, CoreError> {
        match operation {
            LedgerOperation::CreateDocument {
                content_address,
                signers,
                expiry,
            } => self
                .registry
                .create_document(caller, &content_address, signers, expiry)
                .map(Some),
            LedgerOperation::SignDocument {
                document_id,
                signature_proof,
            } => self
                .registry
                .sign_document(document_id, caller, &signature_proof)
                .map(|()| Some(document_id)),
            LedgerOperation::AmendDocument {
                document_id,
                content_address,
                expiry,
            } => self
                .registry
                .amend_document(document_id, caller, &content_address, expiry)
                .map(|()| Some(document_id)),
            LedgerOperation::RevokeDocument {
                document_id,
                reason,
            } => self
                .registry
                .revoke_document(document_id, caller, &reason)
                .map(|()| Some(document_id)),
            LedgerOperation::RegisterUser { profile } => {
                self.registry.register_user(caller, profile).map(|_| None)
            }
        }
    }
}

impl Ledger for LocalLedger {
    async fn submit(&self, caller: &Identity, operation: LedgerOperation) -> Result<Receipt, LedgerError> {
        let name = operation.name();
        match self.execute(caller, operation) {
            Ok(document_id) => {
                let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!(operation = name, sequence, ?document_id, "Transaction applied");
                Ok(Receipt {
                    tx_id: Uuid::new_v4(),
                    sequence,
                    document_id,
                    submitted_at: self.registry.now(),
                })
            }
            Err(err) => {
                tracing::debug!(operation = name, %caller, reason = %err.revert_reason(), "Transaction reverted");
                Err(LedgerError::Reverted(err.revert_reason()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryConfig;

    fn ledger() -> LocalLedger {
        LocalLedger::new(Arc::new(DocumentRegistry::new(RegistryConfig::default())))
    }

    #[tokio::test]
    async fn applied_operations_get_receipts() {
        let ledger = ledger();
        let creator = Identity::new("0xc");

        let receipt = ledger
            .submit(
                &creator,
                LedgerOperation::CreateDocument {
                    content_address: "bafy".into(),
                    signers: vec![Identity::new("0xa")],
                    expiry: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.sequence, 1);
        assert_eq!(receipt.document_id, Some(1));

        let receipt = ledger
            .submit(
                &Identity::new("0xa"),
                LedgerOperation::SignDocument {
                    document_id: 1,
                    signature_proof: b"proof".to_vec(),
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.sequence, 2);
        assert!(ledger.registry().get_document(1).unwrap().fully_signed);
    }

    #[tokio::test]
    async fn rejections_round_trip_to_core_errors() {
        let ledger = ledger();
        let err = ledger
            .submit(
                &Identity::new("0xa"),
                LedgerOperation::RevokeDocument {
                    document_id: 7,
                    reason: "x".into(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::Reverted("not_found: document 7".into()));
        assert_eq!(CoreError::from(err), CoreError::NotFound("document 7".into()));

        // Reverted transactions do not consume a sequence number.
        let receipt = ledger
            .submit(
                &Identity::new("0xc"),
                LedgerOperation::CreateDocument {
                    content_address: "bafy".into(),
                    signers: vec![Identity::new("0xa")],
                    expiry: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.sequence, 1);
    }

    #[test]
    fn transport_errors_are_ledger_failures() {
        let err = CoreError::from(LedgerError::Transport("timeout".into()));
        assert_eq!(err, CoreError::LedgerFailure("timeout".into()));
    }

    #[test]
    fn operations_serialize_tagged() {
        let op = LedgerOperation::SignDocument {
            document_id: 3,
            signature_proof: vec![0xde, 0xad],
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["operation"], "sign_document");
        assert_eq!(json["signature_proof"], "3q0=");
    }
}
