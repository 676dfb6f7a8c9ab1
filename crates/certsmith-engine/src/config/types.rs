//! Settings file schema.

use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use certsmith_types::protocol::{DigestAlgorithm, KeyAlgorithm, SubjectAltName};

pub const SUPPORTED_VERSION: &str = "1.0";

/// Top-level settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsConfig {
    pub version: String,
    #[serde(default)]
    pub module: ModuleConfig,
    #[serde(default)]
    pub authority: AuthorityConfig,
    #[serde(default)]
    pub certificate: CertificateConfig,
    /// Output directory, or a path ending in `.zip`.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

// --- Module ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleBackend {
    #[default]
    Native,
    Wasm,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    #[serde(default)]
    pub backend: ModuleBackend,
    /// Compiled module, required for the wasm backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Store memory limit, e.g. `256mb`.
    #[serde(default)]
    pub max_memory: Option<String>,
}

// --- Certificates ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityMode {
    SelfSigned,
    #[default]
    Generate,
    Files,
}

/// Either a length in years or an explicit window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidityConfig {
    #[serde(default)]
    pub years: Option<u32>,
    #[serde(default)]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub not_after: Option<DateTime<Utc>>,
}

impl ValidityConfig {
    #[must_use]
    pub fn years(years: u32) -> Self {
        Self {
            years: Some(years),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorityConfig {
    #[serde(default)]
    pub mode: AuthorityMode,
    /// Subject of a generated authority.
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub key_algorithm: KeyAlgorithm,
    #[serde(default)]
    pub digest: DigestAlgorithm,
    #[serde(default = "default_authority_validity")]
    pub validity: ValidityConfig,
    #[serde(default = "default_authority_key_usage")]
    pub key_usage: Vec<String>,
    #[serde(default)]
    pub ext_key_usage: Vec<String>,
    /// Existing authority certificate (files mode).
    #[serde(default)]
    pub cert: Option<PathBuf>,
    /// Existing authority private key (files mode).
    #[serde(default)]
    pub key: Option<PathBuf>,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            mode: AuthorityMode::default(),
            subject: None,
            key_algorithm: KeyAlgorithm::default(),
            digest: DigestAlgorithm::default(),
            validity: default_authority_validity(),
            key_usage: default_authority_key_usage(),
            ext_key_usage: Vec::new(),
            cert: None,
            key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CertificateConfig {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub is_ca: bool,
    #[serde(default)]
    pub san: Vec<SubjectAltName>,
    #[serde(default)]
    pub key_algorithm: KeyAlgorithm,
    #[serde(default)]
    pub digest: DigestAlgorithm,
    #[serde(default = "default_leaf_validity")]
    pub validity: ValidityConfig,
    #[serde(default = "default_leaf_key_usage")]
    pub key_usage: Vec<String>,
    #[serde(default = "default_leaf_ext_key_usage")]
    pub ext_key_usage: Vec<String>,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            subject: String::new(),
            is_ca: false,
            san: Vec::new(),
            key_algorithm: KeyAlgorithm::default(),
            digest: DigestAlgorithm::default(),
            validity: default_leaf_validity(),
            key_usage: default_leaf_key_usage(),
            ext_key_usage: default_leaf_ext_key_usage(),
        }
    }
}

fn default_authority_validity() -> ValidityConfig {
    ValidityConfig::years(crate::bundle::DEFAULT_AUTHORITY_YEARS)
}

fn default_leaf_validity() -> ValidityConfig {
    ValidityConfig::years(crate::bundle::DEFAULT_LEAF_YEARS)
}

fn default_authority_key_usage() -> Vec<String> {
    vec!["key_cert_sign".to_string()]
}

fn default_leaf_key_usage() -> Vec<String> {
    vec!["digital_signature".to_string()]
}

fn default_leaf_ext_key_usage() -> Vec<String> {
    vec!["server_auth".to_string(), "client_auth".to_string()]
}

/// Parse a human-readable byte size: `512`, `64kb`, `256mb`, `1gb`.
///
/// # Errors
///
/// Returns an error for an empty string, an unknown suffix, or overflow.
pub fn parse_byte_size(input: &str) -> Result<u64> {
    let lower = input.trim().to_ascii_lowercase();
    let split = lower
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lower.len());
    let (digits, suffix) = lower.split_at(split);
    if digits.is_empty() {
        bail!("Invalid byte size '{input}': missing number");
    }

    let multiplier: u64 = match suffix.trim() {
        "" | "b" => 1,
        "kb" | "k" => 1024,
        "mb" | "m" => 1024 * 1024,
        "gb" | "g" => 1024 * 1024 * 1024,
        other => bail!("Invalid byte size '{input}': unknown unit '{other}'"),
    };
    let value: u64 = digits
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid byte size '{input}': {e}"))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| anyhow::anyhow!("Invalid byte size '{input}': too large"))
}
