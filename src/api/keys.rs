// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sealed key escrow.
//!
//! The server only ever sees passphrase-sealed blobs in their PEM armor.
//! Unsealing happens on the client. A deposit must carry an escrow proof
//! signed by the identity's registered key, so nobody can claim another
//! identity's slot ahead of its owner.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    models::{base64_bytes, Identity},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct KeyBackup {
    /// PEM armored sealed key.
    pub backup: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct KeyDeposit {
    /// PEM armored sealed key.
    pub backup: String,
    /// Base64 ECDSA signature over the escrow digest of the sealed blob.
    #[serde(with = "base64_bytes")]
    #[schema(value_type = String)]
    pub proof: Vec<u8>,
}

#[utoipa::path(
    get,
    path = "/v1/keys/{identity}",
    params(("identity" = String, Path, description = "Key owner")),
    tag = "Keys",
    responses(
        (status = 200, body = KeyBackup),
        (status = 404, description = "No sealed key escrowed for this identity")
    )
)]
pub async fn get_key_backup(
    Path(identity): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<KeyBackup>, ApiError> {
    let backup = state.custody.export_backup(&Identity::new(identity))?;
    Ok(Json(KeyBackup { backup }))
}

#[utoipa::path(
    put,
    path = "/v1/keys/{identity}",
    params(("identity" = String, Path, description = "Key owner")),
    request_body = KeyDeposit,
    tag = "Keys",
    responses(
        (status = 204, description = "Backup escrowed"),
        (status = 400, description = "Malformed backup or identity already holds a key"),
        (status = 403, description = "Identity is not registered"),
        (status = 422, description = "Escrow proof does not match the registered key")
    )
)]
pub async fn put_key_backup(
    Path(identity): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<KeyDeposit>,
) -> Result<StatusCode, ApiError> {
    let identity = Identity::new(identity);
    if identity.is_null() {
        return Err(ApiError::bad_request("identity must not be empty"));
    }
    state
        .custody
        .deposit_backup(&identity, &body.backup, &body.proof, state.registry.as_ref())?;
    Ok(StatusCode::NO_CONTENT)
}
