// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cryptographic building blocks.
//!
//! - [`envelope`]: encrypt once, wrap the content key per recipient
//! - [`custody`]: identity keys sealed at rest under a passphrase
//! - [`proof`]: signature proofs binding a signer to a document revision
//! - [`package`]: the sealed document blob placed in content storage

pub mod custody;
pub mod envelope;
pub mod package;
pub mod proof;

pub use custody::{generate_identity, IdentityKey, KdfParams, KeyCustody};
pub use envelope::{Envelope, KeyDirectory, WrapFailure};
pub use package::SealedDocument;
