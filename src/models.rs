// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Shared Data Models
//!
//! Identity and profile types used by the registry, the envelope cipher and
//! the HTTP query surface.
//!
//! ## Identity
//!
//! The [`Identity`] newtype wraps a ledger account identifier (normally a
//! `0x`-prefixed address). Identities are trimmed and lowercased on
//! construction so that comparisons, map keys and cache keys agree.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;

// =============================================================================
// Identity
// =============================================================================

/// Ledger account identity.
///
/// Format is opaque to the core; the only structural rule is that the empty
/// string and the all-zero address are the *null* identity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl AsRef<str>) -> Self {
        Identity(value.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty identity and for `0x000…0`.
    pub fn is_null(&self) -> bool {
        let hex = self.0.strip_prefix("0x").unwrap_or(&self.0);
        hex.is_empty() || (self.0.starts_with("0x") && hex.bytes().all(|b| b == b'0'))
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Identity::new(value)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Identity::new(value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

// =============================================================================
// Roles
// =============================================================================

/// Relationship between an identity and a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentRole {
    /// Neither creator nor listed signer
    None,
    /// Created the document
    Creator,
    /// Listed in the document's signer set
    Signer,
}

// =============================================================================
// User Profiles
// =============================================================================

/// A registered participant.
///
/// Profiles are write-once: there is no update path in the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    /// Ledger identity (primary key).
    pub identity: Identity,
    pub first_name: String,
    pub last_name: String,
    /// Normalized email, unique across profiles.
    pub email: String,
    #[schema(value_type = String, format = Date)]
    pub date_of_birth: NaiveDate,
    /// SEC1-encoded secp256k1 public key used for envelope key wrapping
    /// and signature proof verification.
    #[serde(with = "base64_bytes")]
    #[schema(value_type = String, format = Byte)]
    pub public_key: Vec<u8>,
    pub registered: bool,
}

/// Registration request for a new profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewUserProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[schema(value_type = String, format = Date)]
    pub date_of_birth: NaiveDate,
    #[serde(with = "base64_bytes")]
    #[schema(value_type = String, format = Byte)]
    pub public_key: Vec<u8>,
}

/// Normalize an email address for use as a uniqueness key.
///
/// Applies Unicode NFKC, trims surrounding whitespace and lowercases.
pub fn normalize_email(raw: &str) -> String {
    raw.nfkc().collect::<String>().trim().to_lowercase()
}

/// Minimal structural email check: one `@`, non-empty local part, dotted domain.
pub fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Serde adapter encoding byte vectors as standard base64 strings.
pub mod base64_bytes {
    use base64ct::{Base64, Encoding};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Base64::decode_vec(&encoded).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_normalized() {
        let a = Identity::new("  0xABCdef  ");
        assert_eq!(a.as_str(), "0xabcdef");
        assert_eq!(a, Identity::from("0xabcdef"));
    }

    #[test]
    fn null_identities() {
        assert!(Identity::new("").is_null());
        assert!(Identity::new("0x").is_null());
        assert!(Identity::new("0x0000000000000000000000000000000000000000").is_null());
        assert!(!Identity::new("0x0000000000000000000000000000000000000001").is_null());
        assert!(!Identity::new("alice").is_null());
    }

    #[test]
    fn identity_deserializes_normalized() {
        let id: Identity = serde_json::from_str(r#""0xAB""#).unwrap();
        assert_eq!(id.as_str(), "0xab");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""0xab""#);
    }

    #[test]
    fn email_normalization_folds_case_and_width() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        // Fullwidth letters fold under NFKC.
        assert_eq!(normalize_email("ＢＯＢ@example.com"), "bob@example.com");
    }

    #[test]
    fn email_plausibility() {
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("no-at-sign"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("a@localhost"));
        assert!(!is_plausible_email("a@b@c.com"));
        assert!(!is_plausible_email("a b@c.com"));
    }

    #[test]
    fn profile_public_key_serializes_as_base64() {
        let profile = UserProfile {
            identity: Identity::new("0x01"),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            public_key: vec![1, 2, 3],
            registered: true,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["public_key"], "AQID");
        let back: UserProfile = serde_json::from_value(json).unwrap();
        assert_eq!(back, profile);
    }
}
