// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signature proofs.
//!
//! A proof is a fixed-size (64 byte) ECDSA/secp256k1 signature made with the
//! signer's identity key over a SHA-256 digest that binds the document id,
//! its current content address and the signer's identity. Amending a
//! document changes its content address, so proofs never carry over between
//! revisions.
//!
//! Escrow proofs use the same key and encoding over a separate domain. They
//! bind a sealed key blob to the identity depositing it.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

use super::custody::IdentityKey;
use crate::error::{CoreError, CoreResult};
use crate::models::Identity;

const SIGNING_DOMAIN: &[u8] = b"relational-docsign/v1/sign";
const ESCROW_DOMAIN: &[u8] = b"relational-docsign/v1/escrow";

/// Length of an encoded proof.
pub const PROOF_LEN: usize = 64;

/// Digest a signer commits to.
///
/// The content address is length-prefixed so that no two distinct
/// (address, signer) pairs produce the same preimage.
pub fn signing_digest(document_id: u64, content_address: &str, signer: &Identity) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(SIGNING_DOMAIN);
    hasher.update(document_id.to_be_bytes());
    hasher.update((content_address.len() as u64).to_be_bytes());
    hasher.update(content_address.as_bytes());
    hasher.update(signer.as_str().as_bytes());
    hasher.finalize().into()
}

/// Produce a proof for `signer` over the document's current content address.
pub fn sign_proof(
    key: &IdentityKey,
    document_id: u64,
    content_address: &str,
    signer: &Identity,
) -> Vec<u8> {
    sign_digest(key, &signing_digest(document_id, content_address, signer))
}

/// Digest an identity commits to when escrowing its sealed key.
pub fn escrow_digest(identity: &Identity, sealed_blob: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(ESCROW_DOMAIN);
    hasher.update((identity.as_str().len() as u64).to_be_bytes());
    hasher.update(identity.as_str().as_bytes());
    hasher.update(sealed_blob);
    hasher.finalize().into()
}

/// Prove that the holder of `key` is depositing `sealed_blob` for `identity`.
pub fn sign_escrow(key: &IdentityKey, identity: &Identity, sealed_blob: &[u8]) -> Vec<u8> {
    sign_digest(key, &escrow_digest(identity, sealed_blob))
}

fn sign_digest(key: &IdentityKey, digest: &[u8; 32]) -> Vec<u8> {
    let signing_key = SigningKey::from(key.secret());
    let signature: Signature = signing_key.sign(digest);
    signature.to_bytes().to_vec()
}

/// Parse a SEC1 encoded secp256k1 public key.
pub fn parse_public_key(public_key: &[u8]) -> CoreResult<VerifyingKey> {
    VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|_| CoreError::InvalidInput("public key is not a valid secp256k1 point".into()))
}

/// Verify a proof against the signer's published public key.
pub fn verify_proof(
    public_key: &[u8],
    document_id: u64,
    content_address: &str,
    signer: &Identity,
    proof: &[u8],
) -> CoreResult<()> {
    verify_digest(public_key, &signing_digest(document_id, content_address, signer), proof)
}

/// Verify an escrow proof against the identity's registered public key.
pub fn verify_escrow(
    public_key: &[u8],
    identity: &Identity,
    sealed_blob: &[u8],
    proof: &[u8],
) -> CoreResult<()> {
    verify_digest(public_key, &escrow_digest(identity, sealed_blob), proof)
}

fn verify_digest(public_key: &[u8], digest: &[u8; 32], proof: &[u8]) -> CoreResult<()> {
    let verifying_key = parse_public_key(public_key).map_err(|_| CoreError::InvalidSignature)?;
    let signature = Signature::from_slice(proof).map_err(|_| CoreError::InvalidSignature)?;

    verifying_key
        .verify(digest, &signature)
        .map_err(|_| CoreError::InvalidSignature)
}
