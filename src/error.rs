// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy shared by every component.
//!
//! [`CoreError`] is the single error type surfaced by the registry, the
//! envelope cipher, key custody and the document service. Each variant has a
//! stable machine code used both in HTTP error bodies and as the ledger
//! revert reason, so a rejection raised by the state machine survives the
//! round trip through the ledger transaction interface unchanged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::models::Identity;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("caller is not the document owner")]
    Forbidden,

    #[error("caller is not an authorized signer")]
    Unauthorized,

    #[error("caller has already signed this document")]
    AlreadySigned,

    #[error("document has been revoked")]
    AlreadyRevoked,

    #[error("document has expired")]
    Expired,

    #[error("signature proof is invalid")]
    InvalidSignature,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("wrong passphrase")]
    WrongPassphrase,

    #[error("sealed key blob is malformed")]
    CorruptBlob,

    #[error("no public key available for {0}")]
    KeyUnavailable(Identity),

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("ledger failure: {0}")]
    LedgerFailure(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidInput(_) => "invalid_input",
            CoreError::NotFound(_) => "not_found",
            CoreError::Forbidden => "forbidden",
            CoreError::Unauthorized => "unauthorized",
            CoreError::AlreadySigned => "already_signed",
            CoreError::AlreadyRevoked => "already_revoked",
            CoreError::Expired => "expired",
            CoreError::InvalidSignature => "invalid_signature",
            CoreError::DecryptionFailed => "decryption_failed",
            CoreError::WrongPassphrase => "wrong_passphrase",
            CoreError::CorruptBlob => "corrupt_blob",
            CoreError::KeyUnavailable(_) => "key_unavailable",
            CoreError::StorageFailure(_) => "storage_failure",
            CoreError::LedgerFailure(_) => "ledger_failure",
        }
    }

    /// Encode as a ledger revert reason: `code` or `code: detail`.
    pub fn revert_reason(&self) -> String {
        match self {
            CoreError::InvalidInput(detail)
            | CoreError::NotFound(detail)
            | CoreError::StorageFailure(detail)
            | CoreError::LedgerFailure(detail) => format!("{}: {detail}", self.error_code()),
            CoreError::KeyUnavailable(identity) => format!("{}: {identity}", self.error_code()),
            _ => self.error_code().to_string(),
        }
    }

    /// Decode a ledger revert reason.
    ///
    /// Reasons that do not carry a known code are reported verbatim as
    /// [`CoreError::LedgerFailure`].
    pub fn from_revert_reason(reason: &str) -> Self {
        let (code, detail) = match reason.split_once(": ") {
            Some((code, detail)) => (code, detail.to_string()),
            None => (reason, String::new()),
        };
        match code {
            "invalid_input" => CoreError::InvalidInput(detail),
            "not_found" => CoreError::NotFound(detail),
            "forbidden" => CoreError::Forbidden,
            "unauthorized" => CoreError::Unauthorized,
            "already_signed" => CoreError::AlreadySigned,
            "already_revoked" => CoreError::AlreadyRevoked,
            "expired" => CoreError::Expired,
            "invalid_signature" => CoreError::InvalidSignature,
            "decryption_failed" => CoreError::DecryptionFailed,
            "wrong_passphrase" => CoreError::WrongPassphrase,
            "corrupt_blob" => CoreError::CorruptBlob,
            "key_unavailable" => CoreError::KeyUnavailable(Identity::new(detail)),
            "storage_failure" => CoreError::StorageFailure(detail),
            "ledger_failure" => CoreError::LedgerFailure(detail),
            _ => CoreError::LedgerFailure(reason.to_string()),
        }
    }

    /// HTTP status used when this error reaches the query surface.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::InvalidInput(_) | CoreError::CorruptBlob => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Forbidden | CoreError::Unauthorized => StatusCode::FORBIDDEN,
            CoreError::AlreadySigned | CoreError::AlreadyRevoked | CoreError::Expired => {
                StatusCode::CONFLICT
            }
            CoreError::InvalidSignature
            | CoreError::DecryptionFailed
            | CoreError::WrongPassphrase
            | CoreError::KeyUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::StorageFailure(_) | CoreError::LedgerFailure(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

// =============================================================================
// HTTP error
// =============================================================================

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code.to_string(),
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn revert_reason_round_trips_every_kind() {
        let errors = vec![
            CoreError::InvalidInput("signers must not be empty".into()),
            CoreError::NotFound("document 7".into()),
            CoreError::Forbidden,
            CoreError::Unauthorized,
            CoreError::AlreadySigned,
            CoreError::AlreadyRevoked,
            CoreError::Expired,
            CoreError::InvalidSignature,
            CoreError::DecryptionFailed,
            CoreError::WrongPassphrase,
            CoreError::CorruptBlob,
            CoreError::KeyUnavailable(Identity::new("0xabc")),
            CoreError::StorageFailure("pin service down".into()),
            CoreError::LedgerFailure("nonce too low".into()),
        ];
        for err in errors {
            assert_eq!(CoreError::from_revert_reason(&err.revert_reason()), err);
        }
    }

    #[test]
    fn unknown_revert_reason_is_ledger_failure() {
        assert_eq!(
            CoreError::from_revert_reason("out of gas"),
            CoreError::LedgerFailure("out of gas".into())
        );
    }

    #[test]
    fn status_mapping() {
        assert_eq!(CoreError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(CoreError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(CoreError::AlreadySigned.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            CoreError::StorageFailure("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::from(CoreError::AlreadyRevoked).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "already_revoked");
        assert_eq!(body["error"], "document has been revoked");
    }
}
