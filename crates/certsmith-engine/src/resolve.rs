//! Settings resolution: module backend, certificate profiles and the
//! signing authority.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use certsmith_runtime::SandboxConfig;
use certsmith_types::protocol::{ExtKeyUsage, KeyUsage};

use crate::bridge::ModuleBridge;
use crate::bundle::{default_validity, Authority, CertificateProfile, DEFAULT_AUTHORITY_SUBJECT};
use crate::config::types::{
    parse_byte_size, AuthorityConfig, AuthorityMode, CertificateConfig, ModuleBackend,
    ModuleConfig, ValidityConfig,
};

/// Relative settings paths are taken from the settings file's directory.
#[must_use]
pub fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

// --- Module ---

/// Sandbox limits for the wasm backend.
///
/// # Errors
///
/// Returns an error if `max_memory` does not parse.
pub fn resolve_sandbox_config(module: &ModuleConfig) -> Result<SandboxConfig> {
    let max_memory_bytes = module
        .max_memory
        .as_deref()
        .map(parse_byte_size)
        .transpose()
        .context("Invalid module.max_memory")?;
    Ok(SandboxConfig {
        max_memory_bytes,
        ..SandboxConfig::default()
    })
}

/// Build the bridge for the configured backend. The module itself is loaded
/// on first use.
///
/// # Errors
///
/// Returns an error if the wasm backend has no path or invalid limits.
pub fn build_bridge(module: &ModuleConfig, base_dir: &Path) -> Result<ModuleBridge> {
    match module.backend {
        ModuleBackend::Native => {
            tracing::debug!("Using native certificate module");
            Ok(ModuleBridge::native())
        }
        ModuleBackend::Wasm => {
            let path = module
                .path
                .as_deref()
                .ok_or_else(|| anyhow!("module.path is required for the wasm backend"))?;
            let path = resolve_path(base_dir, path);
            let config = resolve_sandbox_config(module)?;
            tracing::debug!(
                path = %path.display(),
                max_memory_bytes = ?config.max_memory_bytes,
                "Using sandboxed certificate module"
            );
            Ok(ModuleBridge::sandbox(path, config))
        }
    }
}

// --- Profiles ---

/// Validity window for a profile. `years` windows start an hour before `now`.
///
/// # Errors
///
/// Returns an error if neither form is complete.
pub fn resolve_validity(
    validity: &ValidityConfig,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    match (validity.years, validity.not_before, validity.not_after) {
        (Some(years), None, None) => Ok(default_validity(now, years)),
        (None, Some(not_before), Some(not_after)) => Ok((not_before, not_after)),
        _ => Err(anyhow!(
            "validity needs 'years' or both 'not_before' and 'not_after'"
        )),
    }
}

/// # Errors
///
/// Returns an error naming the first unknown usage.
pub fn resolve_key_usage(names: &[String]) -> Result<KeyUsage> {
    names.iter().try_fold(KeyUsage::empty(), |acc, name| {
        KeyUsage::from_snake_name(name)
            .map(|flag| acc | flag)
            .ok_or_else(|| anyhow!("unknown key usage '{name}'"))
    })
}

/// # Errors
///
/// Returns an error naming the first unknown usage.
pub fn resolve_ext_key_usage(names: &[String]) -> Result<ExtKeyUsage> {
    names.iter().try_fold(ExtKeyUsage::empty(), |acc, name| {
        ExtKeyUsage::from_snake_name(name)
            .map(|flag| acc | flag)
            .ok_or_else(|| anyhow!("unknown extended key usage '{name}'"))
    })
}

/// Profile for the issued certificate.
///
/// # Errors
///
/// Returns an error for an incomplete validity or an unknown usage.
pub fn resolve_leaf(config: &CertificateConfig, now: DateTime<Utc>) -> Result<CertificateProfile> {
    let (not_before, not_after) =
        resolve_validity(&config.validity, now).context("certificate")?;
    Ok(CertificateProfile {
        subject: config.subject.clone(),
        is_ca: config.is_ca,
        subject_alt_names: config.san.clone(),
        key_algorithm: config.key_algorithm,
        digest_algorithm: config.digest,
        not_before,
        not_after,
        key_usage: resolve_key_usage(&config.key_usage).context("certificate")?,
        ext_key_usage: resolve_ext_key_usage(&config.ext_key_usage).context("certificate")?,
    })
}

/// Profile for a generated authority.
///
/// # Errors
///
/// Same as [`resolve_leaf`].
pub fn resolve_authority_profile(
    config: &AuthorityConfig,
    now: DateTime<Utc>,
) -> Result<CertificateProfile> {
    let (not_before, not_after) = resolve_validity(&config.validity, now).context("authority")?;
    Ok(CertificateProfile {
        subject: config
            .subject
            .clone()
            .unwrap_or_else(|| DEFAULT_AUTHORITY_SUBJECT.to_string()),
        is_ca: true,
        subject_alt_names: Vec::new(),
        key_algorithm: config.key_algorithm,
        digest_algorithm: config.digest,
        not_before,
        not_after,
        key_usage: resolve_key_usage(&config.key_usage).context("authority")?,
        ext_key_usage: resolve_ext_key_usage(&config.ext_key_usage).context("authority")?,
    })
}

/// Resolve the signing authority, reading certificate and key files for
/// `files` mode.
///
/// # Errors
///
/// Returns an error if a file cannot be read or the profile is invalid.
pub async fn resolve_authority(
    config: &AuthorityConfig,
    base_dir: &Path,
    now: DateTime<Utc>,
) -> Result<Authority> {
    match config.mode {
        AuthorityMode::SelfSigned => Ok(Authority::SelfSigned),
        AuthorityMode::Generate => Ok(Authority::Generate(resolve_authority_profile(
            config, now,
        )?)),
        AuthorityMode::Files => {
            let cert = config
                .cert
                .as_deref()
                .ok_or_else(|| anyhow!("authority.cert is required in files mode"))?;
            let key = config
                .key
                .as_deref()
                .ok_or_else(|| anyhow!("authority.key is required in files mode"))?;
            Ok(Authority::Existing {
                cert: read_file(&resolve_path(base_dir, cert)).await?,
                key: read_file(&resolve_path(base_dir, key)).await?,
            })
        }
    }
}

pub(crate) async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
