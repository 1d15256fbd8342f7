// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sealed document package.
//!
//! The JSON blob pushed to content storage. It carries the ciphertext, the
//! IV and every recipient's wrapped key, so a content address names
//! everything a recipient needs to open the document.

use std::collections::BTreeMap;

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};

use super::custody::IdentityKey;
use super::envelope::{self, Envelope};
use crate::error::{CoreError, CoreResult};
use crate::models::{base64_bytes, Identity};

pub const PACKAGE_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedDocument {
    pub version: u8,
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    /// Recipient → base64 wrapped content key.
    pub wrapped_keys: BTreeMap<Identity, String>,
}

impl SealedDocument {
    pub fn from_envelope(envelope: &Envelope) -> Self {
        Self {
            version: PACKAGE_VERSION,
            iv: envelope.iv.to_vec(),
            ciphertext: envelope.ciphertext.clone(),
            wrapped_keys: envelope
                .wrapped_keys
                .iter()
                .map(|(recipient, wrapped)| (recipient.clone(), Base64::encode_string(wrapped)))
                .collect(),
        }
    }

    pub fn recipients(&self) -> impl Iterator<Item = &Identity> {
        self.wrapped_keys.keys()
    }

    pub fn is_recipient(&self, identity: &Identity) -> bool {
        self.wrapped_keys.contains_key(identity)
    }

    pub fn to_bytes(&self) -> CoreResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| CoreError::StorageFailure(format!("package encoding failed: {e}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let package: SealedDocument = serde_json::from_slice(bytes)
            .map_err(|e| CoreError::StorageFailure(format!("malformed sealed document: {e}")))?;
        if package.version != PACKAGE_VERSION {
            return Err(CoreError::StorageFailure(format!(
                "unsupported sealed document version {}",
                package.version
            )));
        }
        Ok(package)
    }

    /// Decrypt the package as `recipient`.
    ///
    /// A recipient without a wrapped key gets [`CoreError::KeyUnavailable`];
    /// anything else that goes wrong is [`CoreError::DecryptionFailed`].
    pub fn open(&self, recipient: &Identity, key: &IdentityKey) -> CoreResult<Vec<u8>> {
        let encoded = self
            .wrapped_keys
            .get(recipient)
            .ok_or_else(|| CoreError::KeyUnavailable(recipient.clone()))?;
        let wrapped = Base64::decode_vec(encoded).map_err(|_| CoreError::DecryptionFailed)?;
        envelope::decrypt(&self.ciphertext, &self.iv, &wrapped, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_survives_storage_encoding() {
        let alice = Identity::new("0xa");
        let key = IdentityKey::generate();
        let directory = BTreeMap::from([(alice.clone(), key.public_key())]);

        let envelope = envelope::encrypt(b"terms", &[alice.clone()], &directory).unwrap();
        let bytes = SealedDocument::from_envelope(&envelope).to_bytes().unwrap();

        let package = SealedDocument::from_bytes(&bytes).unwrap();
        assert!(package.is_recipient(&alice));
        assert_eq!(package.open(&alice, &key).unwrap(), b"terms");
    }

    #[test]
    fn non_recipient_has_no_key() {
        let alice = Identity::new("0xa");
        let key = IdentityKey::generate();
        let directory = BTreeMap::from([(alice.clone(), key.public_key())]);
        let envelope = envelope::encrypt(b"terms", &[alice], &directory).unwrap();
        let package = SealedDocument::from_envelope(&envelope);

        let mallory = Identity::new("0xm");
        assert_eq!(
            package.open(&mallory, &key),
            Err(CoreError::KeyUnavailable(mallory))
        );
    }

    #[test]
    fn rejects_garbage_and_unknown_versions() {
        assert!(matches!(
            SealedDocument::from_bytes(b"{not json"),
            Err(CoreError::StorageFailure(_))
        ));

        let future = serde_json::json!({
            "version": 9,
            "iv": "",
            "ciphertext": "",
            "wrapped_keys": {}
        });
        assert!(matches!(
            SealedDocument::from_bytes(future.to_string().as_bytes()),
            Err(CoreError::StorageFailure(_))
        ));
    }
}
