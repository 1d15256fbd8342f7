// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Write path for client-prepared documents.
//!
//! Clients seal documents and produce signature proofs locally, so no
//! plaintext or private key reaches the server. They publish the sealed
//! package, then submit the ledger operation that references it. The
//! caller identity is taken as asserted by the authenticating gateway.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    ledger::{LedgerOperation, Receipt},
    models::Identity,
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

/// A sealed package accepted into content storage.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublishResponse {
    /// Lowercase hex SHA-256 of the stored package
    pub content_address: String,
}

/// A ledger operation submitted on behalf of `caller`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitTransactionRequest {
    pub caller: Identity,
    /// Tagged by `operation`: `create_document`, `sign_document`,
    /// `amend_document`, `revoke_document` or `register_user`
    #[schema(value_type = Object)]
    pub transaction: LedgerOperation,
}

// =============================================================================
// Handlers
// =============================================================================

#[utoipa::path(
    post,
    path = "/v1/content",
    tag = "Transactions",
    request_body(content = String, content_type = "application/json", description = "Sealed document package"),
    responses(
        (status = 201, description = "Package stored", body = PublishResponse),
        (status = 400, description = "Body is not a sealed document with recipients")
    )
)]
pub async fn publish_content(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<PublishResponse>), ApiError> {
    let content_address = state.service.publish(body.to_vec()).await?;
    Ok((StatusCode::CREATED, Json(PublishResponse { content_address })))
}

#[utoipa::path(
    get,
    path = "/v1/content/{content_address}",
    params(("content_address" = String, Path, description = "Address returned on publish")),
    tag = "Transactions",
    responses(
        (status = 200, description = "Sealed document package"),
        (status = 502, description = "Content missing or corrupted")
    )
)]
pub async fn fetch_content(
    Path(content_address): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let package = state.service.fetch(&content_address).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], package))
}

#[utoipa::path(
    post,
    path = "/v1/transactions",
    tag = "Transactions",
    request_body = SubmitTransactionRequest,
    responses(
        (status = 200, description = "Transaction applied", body = Receipt),
        (status = 400, description = "Invalid operation"),
        (status = 403, description = "Caller may not perform this operation"),
        (status = 404, description = "Unknown document"),
        (status = 409, description = "Conflicts with the document's state"),
        (status = 422, description = "Signature proof rejected")
    )
)]
pub async fn submit_transaction(
    State(state): State<AppState>,
    Json(request): Json<SubmitTransactionRequest>,
) -> Result<Json<Receipt>, ApiError> {
    if request.caller.is_null() {
        return Err(ApiError::bad_request("caller must not be empty"));
    }
    let receipt = state.service.submit(&request.caller, request.transaction).await?;
    Ok(Json(receipt))
}
