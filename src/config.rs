// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! [`Config`] loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the sealed key store | `./data` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `INDEX_CACHE_TTL_SECS` | Lifetime of cached per-identity document views | `30` |
//! | `INDEX_CACHE_CAPACITY` | Maximum identities held in the view cache | `1024` |
//! | `CREATOR_MAY_SIGN` | Allow the creator to appear in a document's signer list | `false` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory.
///
/// The sealed key store (`keys.redb`) lives here. The directory only ever
/// holds passphrase-sealed key blobs, never plaintext keys.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const CACHE_TTL_ENV: &str = "INDEX_CACHE_TTL_SECS";
pub const CACHE_CAPACITY_ENV: &str = "INDEX_CACHE_CAPACITY";

/// Environment variable selecting the creator-as-signer policy.
pub const CREATOR_MAY_SIGN_ENV: &str = "CREATOR_MAY_SIGN";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Whether a document's creator may also be listed as one of its signers.
///
/// Exactly one side is enforced at a time; both the registry and the
/// service pre-check consult the same value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerPolicy {
    /// The creator signs by creating; listing them is rejected.
    #[default]
    ExcludeCreator,
    /// The creator may be listed and then signs like any other signer.
    AllowCreator,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has invalid value `{value}`: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub signer_policy: SignerPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_format: LogFormat::Pretty,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            signer_policy: SignerPolicy::ExcludeCreator,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(raw) = lookup(HOST_ENV) {
            config.host = raw.trim().parse().map_err(|_| invalid(HOST_ENV, &raw, "not an IP address"))?;
        }
        if let Some(raw) = lookup(PORT_ENV) {
            config.port = raw.trim().parse().map_err(|_| invalid(PORT_ENV, &raw, "not a port number"))?;
        }
        if let Some(raw) = lookup(DATA_DIR_ENV) {
            if raw.trim().is_empty() {
                return Err(invalid(DATA_DIR_ENV, &raw, "must not be empty"));
            }
            config.data_dir = PathBuf::from(raw.trim());
        }
        if let Some(raw) = lookup(LOG_FORMAT_ENV) {
            config.log_format = match raw.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "" => LogFormat::Pretty,
                _ => return Err(invalid(LOG_FORMAT_ENV, &raw, "expected `json` or `pretty`")),
            };
        }
        if let Some(raw) = lookup(CACHE_TTL_ENV) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| invalid(CACHE_TTL_ENV, &raw, "not a number of seconds"))?;
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(CACHE_CAPACITY_ENV) {
            config.cache_capacity = match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(invalid(CACHE_CAPACITY_ENV, &raw, "must be a positive integer")),
            };
        }
        if let Some(raw) = lookup(CREATOR_MAY_SIGN_ENV) {
            config.signer_policy = match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => SignerPolicy::AllowCreator,
                "false" | "0" | "no" | "" => SignerPolicy::ExcludeCreator,
                _ => return Err(invalid(CREATOR_MAY_SIGN_ENV, &raw, "expected a boolean")),
            };
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Path of the redb file holding sealed identity keys.
    pub fn key_store_path(&self) -> PathBuf {
        self.data_dir.join("keys.redb")
    }
}

fn invalid(name: &'static str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.cache_ttl, DEFAULT_CACHE_TTL);
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.signer_policy, SignerPolicy::ExcludeCreator);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.key_store_path(), PathBuf::from("./data/keys.redb"));
    }

    #[test]
    fn parses_all_variables() {
        let config = load(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("DATA_DIR", "/var/lib/docsign"),
            ("LOG_FORMAT", "JSON"),
            ("INDEX_CACHE_TTL_SECS", "5"),
            ("INDEX_CACHE_CAPACITY", "16"),
            ("CREATOR_MAY_SIGN", "true"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/docsign"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.cache_ttl, Duration::from_secs(5));
        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.signer_policy, SignerPolicy::AllowCreator);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            load(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        assert!(load(&[("INDEX_CACHE_CAPACITY", "0")]).is_err());
        assert!(load(&[("CREATOR_MAY_SIGN", "maybe")]).is_err());
        assert!(load(&[("LOG_FORMAT", "xml")]).is_err());
    }
}
