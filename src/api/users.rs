// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::ApiError,
    indexer::{DocumentStats, DocumentView},
    models::{Identity, UserProfile},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/v1/users/{identity}/documents",
    params(("identity" = String, Path, description = "Creator or signer identity")),
    tag = "Users",
    responses((status = 200, body = [DocumentView]))
)]
pub async fn list_documents(
    Path(identity): Path<String>,
    State(state): State<AppState>,
) -> Json<Vec<DocumentView>> {
    let identity = Identity::new(identity);
    Json(state.index.documents_for(&identity).await)
}

#[utoipa::path(
    get,
    path = "/v1/users/{identity}/stats",
    params(("identity" = String, Path, description = "Creator or signer identity")),
    tag = "Users",
    responses((status = 200, body = DocumentStats))
)]
pub async fn document_stats(
    Path(identity): Path<String>,
    State(state): State<AppState>,
) -> Json<DocumentStats> {
    let identity = Identity::new(identity);
    Json(state.index.stats_for(&identity).await)
}

#[utoipa::path(
    get,
    path = "/v1/users/{identity}/profile",
    params(("identity" = String, Path, description = "Registered identity")),
    tag = "Users",
    responses(
        (status = 200, body = UserProfile),
        (status = 404, description = "Identity is not registered")
    )
)]
pub async fn get_profile(
    Path(identity): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.registry.profile(&Identity::new(identity))?))
}
