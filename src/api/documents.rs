// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    models::{DocumentRole, Identity},
    registry::{Document, DocumentEvent},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct SignedResponse {
    pub document_id: u64,
    pub identity: Identity,
    pub signed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleResponse {
    pub document_id: u64,
    pub identity: Identity,
    pub role: DocumentRole,
}

#[utoipa::path(
    get,
    path = "/v1/documents/{document_id}",
    params(("document_id" = u64, Path, description = "Document id")),
    tag = "Documents",
    responses(
        (status = 200, body = Document),
        (status = 404, description = "Unknown document")
    )
)]
pub async fn get_document(
    Path(document_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(state.registry.get_document(document_id)?))
}

#[utoipa::path(
    get,
    path = "/v1/documents/{document_id}/events",
    params(("document_id" = u64, Path, description = "Document id")),
    tag = "Documents",
    responses((status = 200, body = [DocumentEvent]))
)]
pub async fn document_events(
    Path(document_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentEvent>>, ApiError> {
    Ok(Json(state.registry.events_for(document_id)?))
}

#[utoipa::path(
    get,
    path = "/v1/documents/{document_id}/signed/{identity}",
    params(
        ("document_id" = u64, Path, description = "Document id"),
        ("identity" = String, Path, description = "Signer identity")
    ),
    tag = "Documents",
    responses((status = 200, body = SignedResponse))
)]
pub async fn has_signed(
    Path((document_id, identity)): Path<(u64, String)>,
    State(state): State<AppState>,
) -> Result<Json<SignedResponse>, ApiError> {
    let identity = Identity::new(identity);
    let signed = state.registry.has_signed(document_id, &identity)?;
    Ok(Json(SignedResponse {
        document_id,
        identity,
        signed,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/documents/{document_id}/role/{identity}",
    params(
        ("document_id" = u64, Path, description = "Document id"),
        ("identity" = String, Path, description = "Identity to classify")
    ),
    tag = "Documents",
    responses((status = 200, body = RoleResponse))
)]
pub async fn role_of(
    Path((document_id, identity)): Path<(u64, String)>,
    State(state): State<AppState>,
) -> Result<Json<RoleResponse>, ApiError> {
    let identity = Identity::new(identity);
    let role = state.registry.role_of(document_id, &identity)?;
    Ok(Json(RoleResponse {
        document_id,
        identity,
        role,
    }))
}

/// Drop every cached per-user projection.
#[utoipa::path(
    post,
    path = "/v1/index/invalidate",
    tag = "Index",
    responses((status = 204))
)]
pub async fn invalidate_index(State(state): State<AppState>) -> StatusCode {
    state.index.clear_cache();
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> AppState {
        let state = AppState::default();
        state
            .registry
            .create_document(&Identity::new("0xc"), "bafy", vec![Identity::new("0xa")], None)
            .unwrap();
        state
    }

    #[tokio::test]
    async fn get_document_found_and_missing() {
        let state = seeded();
        let Json(document) = get_document(Path(1), State(state.clone())).await.unwrap();
        assert_eq!(document.content_address, "bafy");

        let err = get_document(Path(2), State(state)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn role_and_signed_normalize_identity() {
        let state = seeded();
        let Json(role) = role_of(Path((1, "0XC".into())), State(state.clone())).await.unwrap();
        assert_eq!(role.role, DocumentRole::Creator);

        state
            .registry
            .sign_document(1, &Identity::new("0xa"), b"proof")
            .unwrap();
        let Json(signed) = has_signed(Path((1, " 0xA ".into())), State(state)).await.unwrap();
        assert!(signed.signed);
        assert_eq!(signed.identity, Identity::new("0xa"));
    }
}
