//! End-to-end flows behind the command line: check, issue and inspect.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use certsmith_types::protocol::CertificateRecord;

use crate::bridge::ModuleBridge;
use crate::bundle::{self, CertificateBundle};
use crate::config::{parse_settings, validate_settings, SettingsConfig};
use crate::errors::BridgeError;
use crate::resolve::{read_file, resolve_authority, resolve_leaf, resolve_path};

/// Parse and validate a settings file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn check_settings(path: &Path) -> Result<SettingsConfig> {
    let config = parse_settings(path)?;
    validate_settings(&config)?;
    tracing::info!(
        path = %path.display(),
        backend = ?config.module.backend,
        authority = ?config.authority.mode,
        "Settings are valid"
    );
    Ok(config)
}

/// Issue the bundle described by `config`.
///
/// `base_dir` anchors relative paths in the settings.
///
/// # Errors
///
/// Returns an error if the settings cannot be resolved or a module call
/// fails. Module failures carry a user-facing message as context.
pub async fn issue_from_config(
    config: &SettingsConfig,
    base_dir: &Path,
    bridge: &ModuleBridge,
    now: DateTime<Utc>,
) -> Result<CertificateBundle> {
    let leaf = resolve_leaf(&config.certificate, now)?;
    let authority = resolve_authority(&config.authority, base_dir, now).await?;

    let started = Instant::now();
    let bundle = bundle::issue(bridge, &leaf, &authority)
        .await
        .map_err(user_facing)?;
    tracing::info!(
        name = %bundle.name,
        with_authority = bundle.authority.is_some(),
        elapsed_ms = started.elapsed().as_millis(),
        "Bundle issued"
    );
    Ok(bundle)
}

/// Where to write the archive: a `.zip` path is used as is, anything else is
/// a directory that receives `<name>.zip`.
#[must_use]
pub fn archive_path(output: Option<&Path>, bundle: &CertificateBundle) -> PathBuf {
    match output {
        Some(path)
            if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("zip")) =>
        {
            path.to_path_buf()
        }
        Some(dir) => dir.join(bundle.archive_file_name()),
        None => PathBuf::from(bundle.archive_file_name()),
    }
}

/// Serialize `bundle` and write it under `output`.
///
/// # Errors
///
/// Returns an error if the archive cannot be built or written.
pub async fn write_bundle(bundle: &CertificateBundle, output: Option<&Path>) -> Result<PathBuf> {
    let path = archive_path(output, bundle);
    let bytes = bundle
        .to_archive()
        .and_then(|archive| archive.finish())
        .context("Failed to build certificate archive")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write archive: {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Archive written");
    Ok(path)
}

/// Resolve the settings output against `base_dir`, unless overridden.
#[must_use]
pub fn output_target(
    config: &SettingsConfig,
    base_dir: &Path,
    override_path: Option<&Path>,
) -> Option<PathBuf> {
    override_path
        .map(Path::to_path_buf)
        .or_else(|| config.output.as_deref().map(|p| resolve_path(base_dir, p)))
}

/// What `inspect_files` found.
#[derive(Debug, Clone)]
pub struct InspectReport {
    pub certificate: CertificateRecord,
    /// Present when a key was supplied and matched.
    pub key_pem: Option<String>,
}

/// Describe a certificate file, optionally matching it against a key file.
///
/// # Errors
///
/// Returns an error if a file cannot be read or the module rejects it.
pub async fn inspect_files(
    bridge: &ModuleBridge,
    cert_path: &Path,
    key_path: Option<&Path>,
) -> Result<InspectReport> {
    let cert = read_file(cert_path).await?;
    let report = match key_path {
        None => InspectReport {
            certificate: bridge.inspect(&cert).await.map_err(user_facing)?,
            key_pem: None,
        },
        Some(key_path) => {
            let key = read_file(key_path).await?;
            let record = bridge
                .inspect_with_key(&cert, &key)
                .await
                .map_err(user_facing)?;
            InspectReport {
                certificate: record.certificate,
                key_pem: Some(record.key_pem),
            }
        }
    };
    tracing::debug!(
        path = %cert_path.display(),
        subject = %report.certificate.subject_name,
        "Certificate inspected"
    );
    Ok(report)
}

fn user_facing(err: BridgeError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}
