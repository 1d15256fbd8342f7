// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    indexer::{DocumentStats, DocumentView, SignatureView},
    ledger::Receipt,
    models::{DocumentRole, Identity, NewUserProfile, UserProfile},
    registry::{Document, DocumentEvent, DocumentEventType},
    state::AppState,
};

pub mod documents;
pub mod health;
pub mod keys;
pub mod transactions;
pub mod users;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/documents/{document_id}", get(documents::get_document))
        .route(
            "/documents/{document_id}/events",
            get(documents::document_events),
        )
        .route(
            "/documents/{document_id}/signed/{identity}",
            get(documents::has_signed),
        )
        .route(
            "/documents/{document_id}/role/{identity}",
            get(documents::role_of),
        )
        .route("/users/{identity}/documents", get(users::list_documents))
        .route("/users/{identity}/stats", get(users::document_stats))
        .route("/users/{identity}/profile", get(users::get_profile))
        .route(
            "/keys/{identity}",
            get(keys::get_key_backup).put(keys::put_key_backup),
        )
        .route("/content", post(transactions::publish_content))
        .route("/content/{content_address}", get(transactions::fetch_content))
        .route("/transactions", post(transactions::submit_transaction))
        .route("/index/invalidate", post(documents::invalidate_index));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        documents::get_document,
        documents::document_events,
        documents::has_signed,
        documents::role_of,
        documents::invalidate_index,
        users::list_documents,
        users::document_stats,
        users::get_profile,
        keys::get_key_backup,
        keys::put_key_backup,
        transactions::publish_content,
        transactions::fetch_content,
        transactions::submit_transaction
    ),
    components(
        schemas(
            Identity,
            Document,
            DocumentRole,
            DocumentEvent,
            DocumentEventType,
            DocumentView,
            SignatureView,
            DocumentStats,
            UserProfile,
            documents::SignedResponse,
            documents::RoleResponse,
            keys::KeyBackup,
            keys::KeyDeposit,
            transactions::PublishResponse,
            transactions::SubmitTransactionRequest,
            Receipt,
            NewUserProfile,
            health::HealthResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Documents", description = "Document lifecycle state"),
        (name = "Users", description = "Per-user document projections and profiles"),
        (name = "Transactions", description = "Publishing sealed packages and submitting ledger operations"),
        (name = "Keys", description = "Sealed key escrow"),
        (name = "Index", description = "Projection cache control")
    )
)]
pub struct ApiDoc;
