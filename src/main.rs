// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use relational_docsign::api::router;
use relational_docsign::config::{Config, LogFormat};
use relational_docsign::state::AppState;
use relational_docsign::storage::RedbKeyStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("Invalid configuration");
    init_tracing(config.log_format);

    // Open the sealed key store up front so a bad DATA_DIR fails at startup.
    let key_store_path = config.key_store_path();
    let key_store = RedbKeyStore::open(&key_store_path).expect("Failed to open key store");
    tracing::info!(path = %key_store_path.display(), "Key store ready");

    let addr = config.bind_addr();
    tracing::info!(
        signer_policy = ?config.signer_policy,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        "Configuration loaded"
    );

    let app = router(AppState::with_key_store(config, Arc::new(key_store)));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");
    tracing::info!(%addr, "Relational Docsign listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");
}
