// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Multi-recipient envelope encryption.
//!
//! Content is encrypted once under a fresh AES-256-GCM key. That key is then
//! wrapped separately for each recipient with ECIES:
//!
//! ```text
//! wrapped = ephemeral_pub[33] | nonce[12] | AES-256-GCM(kek, content_key)[48]
//! kek     = HKDF-SHA256(salt = ephemeral_pub, ikm = ECDH(ephemeral, recipient), info = WRAP_INFO)
//! ```
//!
//! A recipient whose public key cannot be resolved fails on its own; the
//! remaining recipients are still wrapped and the failure is reported in
//! [`Envelope::failures`].

use std::collections::BTreeMap;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use hkdf::Hkdf;
use k256::ecdh::EphemeralSecret;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::custody::IdentityKey;
use crate::error::{CoreError, CoreResult};
use crate::models::Identity;

pub const CONTENT_KEY_LEN: usize = 32;
pub const IV_LEN: usize = 12;

const COMPRESSED_POINT_LEN: usize = 33;
const GCM_TAG_LEN: usize = 16;
const WRAPPED_KEY_LEN: usize = COMPRESSED_POINT_LEN + IV_LEN + CONTENT_KEY_LEN + GCM_TAG_LEN;
const WRAP_INFO: &[u8] = b"relational-docsign/v1/wrap";

/// Public key lookup for recipients.
///
/// Returning `None` is an expected outcome for unregistered identities.
pub trait KeyDirectory: Send + Sync {
    fn public_key_of(&self, identity: &Identity) -> Option<Vec<u8>>;
}

impl KeyDirectory for BTreeMap<Identity, Vec<u8>> {
    fn public_key_of(&self, identity: &Identity) -> Option<Vec<u8>> {
        self.get(identity).cloned()
    }
}

/// A recipient that could not be granted access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapFailure {
    pub recipient: Identity,
    pub error: CoreError,
}

/// Result of [`encrypt`].
#[derive(Debug, Clone)]
pub struct Envelope {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; IV_LEN],
    pub wrapped_keys: BTreeMap<Identity, Vec<u8>>,
    pub failures: Vec<WrapFailure>,
}

impl Envelope {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn wrapped_key_for(&self, recipient: &Identity) -> Option<&[u8]> {
        self.wrapped_keys.get(recipient).map(Vec::as_slice)
    }
}

/// Encrypt `content` once and wrap the content key for every recipient.
///
/// Duplicate recipients are wrapped once. Fails outright only when the
/// recipient list is empty or the content cipher itself fails.
pub fn encrypt<D>(content: &[u8], recipients: &[Identity], directory: &D) -> CoreResult<Envelope>
where
    D: KeyDirectory + ?Sized,
{
    if recipients.is_empty() {
        return Err(CoreError::InvalidInput("at least one recipient is required".into()));
    }

    let mut content_key = Zeroizing::new([0u8; CONTENT_KEY_LEN]);
    OsRng.fill_bytes(content_key.as_mut_slice());
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(content_key.as_slice()));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), content)
        .map_err(|_| CoreError::InvalidInput("content encryption failed".into()))?;

    let mut wrapped_keys = BTreeMap::new();
    let mut failures = Vec::new();

    for recipient in recipients {
        if wrapped_keys.contains_key(recipient) || failures.iter().any(|f: &WrapFailure| &f.recipient == recipient) {
            continue;
        }

        let wrapped = directory
            .public_key_of(recipient)
            .ok_or_else(|| CoreError::KeyUnavailable(recipient.clone()))
            .and_then(|public_key| {
                wrap_key(&content_key, &public_key)
                    .map_err(|_| CoreError::KeyUnavailable(recipient.clone()))
            });

        match wrapped {
            Ok(wrapped) => {
                wrapped_keys.insert(recipient.clone(), wrapped);
            }
            Err(error) => {
                tracing::warn!(%recipient, error = %error, "Skipping recipient");
                failures.push(WrapFailure {
                    recipient: recipient.clone(),
                    error,
                });
            }
        }
    }

    tracing::debug!(
        recipients = wrapped_keys.len(),
        failures = failures.len(),
        bytes = content.len(),
        "Content sealed"
    );

    Ok(Envelope {
        ciphertext,
        iv,
        wrapped_keys,
        failures,
    })
}

/// Unwrap the caller's copy of the content key and decrypt.
///
/// Every failure is reported as [`CoreError::DecryptionFailed`].
pub fn decrypt(
    ciphertext: &[u8],
    iv: &[u8],
    wrapped_key: &[u8],
    private_key: &IdentityKey,
) -> CoreResult<Vec<u8>> {
    if iv.len() != IV_LEN {
        return Err(CoreError::DecryptionFailed);
    }
    let content_key = unwrap_key(wrapped_key, private_key)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(content_key.as_slice()));
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| CoreError::DecryptionFailed)
}

/// ECIES-wrap a content key to a SEC1 encoded recipient public key.
pub fn wrap_key(content_key: &[u8; CONTENT_KEY_LEN], recipient_public_key: &[u8]) -> CoreResult<Vec<u8>> {
    let recipient = PublicKey::from_sec1_bytes(recipient_public_key)
        .map_err(|_| CoreError::InvalidInput("invalid recipient public key".into()))?;

    let ephemeral_secret = EphemeralSecret::random(&mut OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral_secret).to_encoded_point(true);
    let shared_secret = ephemeral_secret.diffie_hellman(&recipient);

    let kek = derive_wrapping_key(ephemeral_public.as_bytes(), shared_secret.raw_secret_bytes())?;
    let mut nonce = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(kek.as_slice()));
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), content_key.as_slice())
        .map_err(|_| CoreError::InvalidInput("key wrapping failed".into()))?;

    let mut out = Vec::with_capacity(WRAPPED_KEY_LEN);
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Recover a content key wrapped by [`wrap_key`].
pub fn unwrap_key(
    wrapped: &[u8],
    private_key: &IdentityKey,
) -> CoreResult<Zeroizing<[u8; CONTENT_KEY_LEN]>> {
    if wrapped.len() != WRAPPED_KEY_LEN {
        return Err(CoreError::DecryptionFailed);
    }
    let (ephemeral_bytes, rest) = wrapped.split_at(COMPRESSED_POINT_LEN);
    let (nonce, sealed) = rest.split_at(IV_LEN);

    let ephemeral = PublicKey::from_sec1_bytes(ephemeral_bytes).map_err(|_| CoreError::DecryptionFailed)?;
    let shared_secret = k256::ecdh::diffie_hellman(
        private_key.secret().to_nonzero_scalar(),
        ephemeral.as_affine(),
    );
    let kek = derive_wrapping_key(ephemeral_bytes, shared_secret.raw_secret_bytes())
        .map_err(|_| CoreError::DecryptionFailed)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(kek.as_slice()));
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CoreError::DecryptionFailed)?,
    );
    if plaintext.len() != CONTENT_KEY_LEN {
        return Err(CoreError::DecryptionFailed);
    }

    let mut content_key = Zeroizing::new([0u8; CONTENT_KEY_LEN]);
    content_key.copy_from_slice(&plaintext);
    Ok(content_key)
}

fn derive_wrapping_key(ephemeral_public: &[u8], shared_secret: &[u8]) -> CoreResult<Zeroizing<[u8; 32]>> {
    let hkdf = Hkdf::<Sha256>::new(Some(ephemeral_public), shared_secret);
    let mut kek = Zeroizing::new([0u8; 32]);
    hkdf.expand(WRAP_INFO, kek.as_mut_slice())
        .map_err(|_| CoreError::InvalidInput("key derivation failed".into()))?;
    Ok(kek)
}
