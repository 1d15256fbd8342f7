// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Docsign - Confidential Multi-Party Document Signing
//!
//! Documents are encrypted once, their content key is wrapped for the
//! creator and every required signer, and the sealed package is referenced
//! from a ledger-backed registry that tracks who has signed.
//!
//! ## Modules
//!
//! - `registry` - Document lifecycle state machine and user directory
//! - `crypto` - Envelope encryption, key custody and signature proofs
//! - `indexer` - Cached per-user document projections
//! - `ledger` - Transaction interface driving the registry
//! - `service` - Create/open/sign/amend/revoke workflows
//! - `storage` - Content, key and view cache stores
//! - `api` - HTTP query, publish/submit and key escrow routes (Axum)

pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod indexer;
pub mod ledger;
pub mod models;
pub mod registry;
pub mod service;
pub mod state;
pub mod storage;
