// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity key custody.
//!
//! # Algorithms
//!
//! - **Identity keys**: secp256k1 (ECDH for envelope key wrapping, ECDSA for
//!   signature proofs)
//! - **Key derivation**: Argon2id over the user's passphrase
//! - **Encryption at rest**: ChaCha20-Poly1305 over the PKCS#8 DER encoding
//!
//! # Sealed key layout
//!
//! ```text
//! "DSK1" | m_cost u32 BE | t_cost u32 BE | p_cost u32 BE | salt[16] | nonce[12] | ciphertext
//! ```
//!
//! The whole header is bound as associated data, so altering the stored KDF
//! parameters makes the blob fail authentication.
//!
//! Losing the passphrase loses the key. There is no recovery path.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, Payload},
    ChaCha20Poly1305, Key, KeyInit, Nonce,
};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use k256::SecretKey;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use super::envelope::KeyDirectory;
use super::proof;
use crate::error::{CoreError, CoreResult};
use crate::models::Identity;
use crate::storage::KeyStore;

// =============================================================================
// Constants
// =============================================================================

pub const SEALED_KEY_MAGIC: &[u8; 4] = b"DSK1";

/// Salt length for key derivation (16 bytes)
pub const SALT_LEN: usize = 16;

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_LEN: usize = 12;

/// ChaCha20-Poly1305 auth tag length (16 bytes)
pub const AUTH_TAG_LEN: usize = 16;

pub const HEADER_LEN: usize = 4 + 12 + SALT_LEN + NONCE_LEN;

/// PEM tag for exported backups.
pub const BACKUP_PEM_TAG: &str = "DOCSIGN SEALED KEY";

const MAX_MEMORY_KIB: u32 = 1 << 20;
const MAX_ITERATIONS: u32 = 64;
const MAX_PARALLELISM: u32 = 16;

// =============================================================================
// Identity keys
// =============================================================================

/// A participant's asymmetric identity key.
///
/// The public half is published in the user's profile; the private half
/// only ever leaves memory sealed under a passphrase.
#[derive(Clone)]
pub struct IdentityKey {
    secret: SecretKey,
}

impl std::fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKey")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl IdentityKey {
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::random(&mut OsRng),
        }
    }

    /// Compressed SEC1 public key (33 bytes).
    pub fn public_key(&self) -> Vec<u8> {
        self.secret
            .public_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    pub fn from_pkcs8_der(der: &[u8]) -> CoreResult<Self> {
        let secret = SecretKey::from_pkcs8_der(der).map_err(|_| CoreError::CorruptBlob)?;
        Ok(Self { secret })
    }

    pub fn to_pkcs8_der(&self) -> CoreResult<Zeroizing<Vec<u8>>> {
        let document = self
            .secret
            .to_pkcs8_der()
            .map_err(|e| CoreError::InvalidInput(format!("key encoding failed: {e}")))?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }
}

/// Generate a fresh identity keypair, returning the key and its public half.
pub fn generate_identity() -> (IdentityKey, Vec<u8>) {
    let key = IdentityKey::generate();
    let public_key = key.public_key();
    (key, public_key)
}

// =============================================================================
// Key derivation
// =============================================================================

/// Argon2id cost parameters, recorded in every sealed blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// 64 MB, 3 passes, 4 lanes.
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    fn within_bounds(&self) -> bool {
        (1..=MAX_MEMORY_KIB).contains(&self.memory_kib)
            && (1..=MAX_ITERATIONS).contains(&self.iterations)
            && (1..=MAX_PARALLELISM).contains(&self.parallelism)
    }
}

fn derive_key_encryption_key(
    passphrase: &[u8],
    salt: &[u8],
    params: KdfParams,
) -> Result<Zeroizing<[u8; 32]>, argon2::Error> {
    let params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(32),
    )?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2.hash_password_into(passphrase, salt, key.as_mut_slice())?;
    Ok(key)
}

// =============================================================================
// Seal / unseal
// =============================================================================

struct SealedHeader {
    params: KdfParams,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
}

impl SealedHeader {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        out.extend_from_slice(SEALED_KEY_MAGIC);
        out.extend_from_slice(&self.params.memory_kib.to_be_bytes());
        out.extend_from_slice(&self.params.iterations.to_be_bytes());
        out.extend_from_slice(&self.params.parallelism.to_be_bytes());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out
    }

    fn parse(blob: &[u8]) -> CoreResult<Self> {
        if blob.len() < HEADER_LEN + AUTH_TAG_LEN || &blob[..4] != SEALED_KEY_MAGIC {
            return Err(CoreError::CorruptBlob);
        }
        let word = |at: usize| u32::from_be_bytes([blob[at], blob[at + 1], blob[at + 2], blob[at + 3]]);
        let params = KdfParams {
            memory_kib: word(4),
            iterations: word(8),
            parallelism: word(12),
        };
        if !params.within_bounds() {
            return Err(CoreError::CorruptBlob);
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&blob[16..16 + SALT_LEN]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&blob[16 + SALT_LEN..HEADER_LEN]);

        Ok(Self {
            params,
            salt,
            nonce,
        })
    }
}

/// Encrypt an identity key under a passphrase.
pub fn seal_at_rest(key: &IdentityKey, passphrase: &str, params: KdfParams) -> CoreResult<Vec<u8>> {
    if passphrase.is_empty() {
        return Err(CoreError::InvalidInput("passphrase must not be empty".into()));
    }
    if !params.within_bounds() {
        return Err(CoreError::InvalidInput("KDF parameters out of range".into()));
    }

    let mut header = SealedHeader {
        params,
        salt: [0u8; SALT_LEN],
        nonce: [0u8; NONCE_LEN],
    };
    OsRng.fill_bytes(&mut header.salt);
    OsRng.fill_bytes(&mut header.nonce);

    let kek = derive_key_encryption_key(passphrase.as_bytes(), &header.salt, params)
        .map_err(|e| CoreError::InvalidInput(format!("key derivation failed: {e}")))?;
    let plaintext = key.to_pkcs8_der()?;

    let mut blob = header.encode();
    let cipher = ChaCha20Poly1305::new(Key::from_slice(kek.as_slice()));
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&header.nonce),
            Payload {
                msg: plaintext.as_slice(),
                aad: &blob,
            },
        )
        .map_err(|_| CoreError::InvalidInput("sealing failed".into()))?;
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Recover an identity key from a sealed blob.
///
/// A malformed blob reports [`CoreError::CorruptBlob`]. Every other failure,
/// including a tampered ciphertext, reports [`CoreError::WrongPassphrase`].
pub fn unseal(blob: &[u8], passphrase: &str) -> CoreResult<IdentityKey> {
    let header = SealedHeader::parse(blob)?;
    let kek = derive_key_encryption_key(passphrase.as_bytes(), &header.salt, header.params)
        .map_err(|_| CoreError::CorruptBlob)?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(kek.as_slice()));
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&header.nonce),
            Payload {
                msg: &blob[HEADER_LEN..],
                aad: &blob[..HEADER_LEN],
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| CoreError::WrongPassphrase)?;

    IdentityKey::from_pkcs8_der(&plaintext)
}

/// Check a blob's framing without a passphrase.
pub fn validate_sealed(blob: &[u8]) -> CoreResult<()> {
    SealedHeader::parse(blob).map(|_| ())
}

// =============================================================================
// Custody over a key store
// =============================================================================

/// Passphrase-sealed key custody backed by a [`KeyStore`].
pub struct KeyCustody<S> {
    store: S,
    params: KdfParams,
}

impl<S: KeyStore> KeyCustody<S> {
    pub fn new(store: S) -> Self {
        Self::with_params(store, KdfParams::default())
    }

    pub fn with_params(store: S, params: KdfParams) -> Self {
        Self { store, params }
    }

    /// Generate a key for `identity`, seal it and persist the blob.
    ///
    /// Fails if the identity already holds a sealed key.
    pub fn enroll(&self, identity: &Identity, passphrase: &str) -> CoreResult<IdentityKey> {
        let key = IdentityKey::generate();
        let blob = seal_at_rest(&key, passphrase, self.params)?;
        self.store.store(identity, &blob)?;
        tracing::info!(%identity, "Identity key enrolled");
        Ok(key)
    }

    /// Load and unseal the key for `identity`.
    pub fn unlock(&self, identity: &Identity, passphrase: &str) -> CoreResult<IdentityKey> {
        let blob = self
            .store
            .load(identity)?
            .ok_or_else(|| CoreError::NotFound(format!("sealed key for {identity}")))?;
        unseal(&blob, passphrase)
    }

    pub fn store(&self, identity: &Identity, blob: &[u8]) -> CoreResult<()> {
        validate_sealed(blob)?;
        self.store.store(identity, blob)
    }

    pub fn load(&self, identity: &Identity) -> CoreResult<Option<Vec<u8>>> {
        self.store.load(identity)
    }

    /// Replace whatever is stored for `identity` (last write wins).
    pub fn restore(&self, identity: &Identity, blob: &[u8]) -> CoreResult<()> {
        validate_sealed(blob)?;
        self.store.restore(identity, blob)?;
        tracing::info!(%identity, "Sealed key restored");
        Ok(())
    }

    /// Re-seal the stored key under a new passphrase.
    pub fn change_passphrase(&self, identity: &Identity, old: &str, new: &str) -> CoreResult<()> {
        let key = self.unlock(identity, old)?;
        let blob = seal_at_rest(&key, new, self.params)?;
        self.store.restore(identity, &blob)
    }

    /// Export the sealed blob as a PEM armored backup.
    pub fn export_backup(&self, identity: &Identity) -> CoreResult<String> {
        let blob = self
            .store
            .load(identity)?
            .ok_or_else(|| CoreError::NotFound(format!("sealed key for {identity}")))?;
        Ok(pem::encode(&pem::Pem::new(BACKUP_PEM_TAG, blob)))
    }

    /// Restore from a PEM armored backup produced by [`Self::export_backup`],
    /// replacing any stored key.
    pub fn import_backup(&self, identity: &Identity, armored: &str) -> CoreResult<()> {
        self.restore(identity, &parse_backup(armored)?)
    }

    /// Store a PEM armored backup for an identity that holds no key yet.
    ///
    /// `escrow_proof` must verify against the identity's public key in
    /// `directory` (see [`proof::sign_escrow`]), so only the key holder can
    /// claim the slot. Unregistered identities are refused.
    pub fn deposit_backup<D>(
        &self,
        identity: &Identity,
        armored: &str,
        escrow_proof: &[u8],
        directory: &D,
    ) -> CoreResult<()>
    where
        D: KeyDirectory + ?Sized,
    {
        let public_key = directory.public_key_of(identity).ok_or(CoreError::Forbidden)?;
        let blob = parse_backup(armored)?;
        proof::verify_escrow(&public_key, identity, &blob, escrow_proof)?;
        self.store(identity, &blob)?;
        tracing::info!(%identity, "Sealed key backup deposited");
        Ok(())
    }
}

fn parse_backup(armored: &str) -> CoreResult<Vec<u8>> {
    let parsed = pem::parse(armored).map_err(|_| CoreError::CorruptBlob)?;
    if parsed.tag() != BACKUP_PEM_TAG {
        return Err(CoreError::CorruptBlob);
    }
    Ok(parsed.into_contents())
}
