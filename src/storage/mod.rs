// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Narrow storage seams used by the core.
//!
//! | Trait | Holds | Implementations |
//! |-------|-------|-----------------|
//! | [`ContentStore`] | sealed document packages, by content address | [`MemoryContentStore`] |
//! | [`KeyStore`] | one passphrase-sealed key blob per identity | [`MemoryKeyStore`], [`RedbKeyStore`] |
//! | [`ViewCache`] | per-identity document projections | [`LruViewCache`], [`NoopViewCache`] |
//!
//! ## Important Notes
//!
//! - Nothing in this module ever holds a plaintext document or private key
//! - Content addresses are lowercase hex SHA-256 of the stored bytes

pub mod content;
pub mod key_store;
pub mod view_cache;

pub use content::{content_address, ContentStore, MemoryContentStore};
pub use key_store::{KeyDbError, KeyStore, MemoryKeyStore, RedbKeyStore};
pub use view_cache::{LruViewCache, NoopViewCache, ViewCache};
