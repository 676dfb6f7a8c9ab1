//! Certificate bundle assembly.
//!
//! A bundle is a leaf certificate plus, optionally, the authority that
//! signed it. [`issue`] drives the bridge through the authority and leaf
//! steps, and [`CertificateBundle::to_archive`] lays the result out as
//! `<name>/<name>.crt`, `<name>/<name>.key` and the `ca_cert.*` pair.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Months, Utc};
use regex::Regex;

use certsmith_types::protocol::{
    CertificateKeyRecord, CertificateRequest, DigestAlgorithm, ExtKeyUsage, KeyAlgorithm,
    KeyUsage, SanType, SignerKey, SubjectAltName, ValidityTime,
};

use crate::archive::{ArchiveError, ArchiveWriter};
use crate::bridge::ModuleBridge;
use crate::errors::BridgeError;

/// Subject used for a generated authority when none is configured.
pub const DEFAULT_AUTHORITY_SUBJECT: &str = "C=NL, O=AAASELFSIGNED, OU=self-signed, CN=AAATESTCA";

/// Years a generated authority stays valid.
pub const DEFAULT_AUTHORITY_YEARS: u32 = 10;

/// Years a leaf stays valid.
pub const DEFAULT_LEAF_YEARS: u32 = 1;

const FALLBACK_NAME: &str = "cert";
const AUTHORITY_FILE_STEM: &str = "ca_cert";

/// Private keys are stored owner-only, rw-------.
pub const KEY_FILE_MODE: u32 = 0o100_600;

static COMMON_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bCN=([^,]*)").expect("valid common name regex"));

// --- Profiles ---

/// Settings for one certificate, before the signer is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateProfile {
    pub subject: String,
    pub is_ca: bool,
    pub subject_alt_names: Vec<SubjectAltName>,
    pub key_algorithm: KeyAlgorithm,
    pub digest_algorithm: DigestAlgorithm,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub key_usage: KeyUsage,
    pub ext_key_usage: ExtKeyUsage,
}

impl CertificateProfile {
    /// Self-signed test authority valid for ten years from `now`.
    #[must_use]
    pub fn default_authority(now: DateTime<Utc>) -> Self {
        let (not_before, not_after) = default_validity(now, DEFAULT_AUTHORITY_YEARS);
        Self {
            subject: DEFAULT_AUTHORITY_SUBJECT.to_string(),
            is_ca: true,
            subject_alt_names: Vec::new(),
            key_algorithm: KeyAlgorithm::EcP256,
            digest_algorithm: DigestAlgorithm::Sha256,
            not_before,
            not_after,
            key_usage: KeyUsage::KEY_CERT_SIGN,
            ext_key_usage: ExtKeyUsage::empty(),
        }
    }

    /// TLS server/client leaf valid for one year from `now`.
    #[must_use]
    pub fn default_leaf(now: DateTime<Utc>) -> Self {
        let (not_before, not_after) = default_validity(now, DEFAULT_LEAF_YEARS);
        Self {
            subject: String::new(),
            is_ca: false,
            subject_alt_names: Vec::new(),
            key_algorithm: KeyAlgorithm::EcP256,
            digest_algorithm: DigestAlgorithm::Sha256,
            not_before,
            not_after,
            key_usage: KeyUsage::DIGITAL_SIGNATURE,
            ext_key_usage: ExtKeyUsage::SERVER_AUTH | ExtKeyUsage::CLIENT_AUTH,
        }
    }

    /// Build the request for this profile, signed by `authority` when given.
    #[must_use]
    pub fn to_request(&self, authority: Option<&CertificateKeyRecord>) -> CertificateRequest {
        let subject = clean_subject(&self.subject, &self.subject_alt_names);
        let mut builder = CertificateRequest::builder(
            subject,
            ValidityTime::from_datetime(&self.not_before),
            ValidityTime::from_datetime(&self.not_after),
        )
        .ca(self.is_ca)
        .sans(self.subject_alt_names.iter().cloned())
        .key_algorithm(self.key_algorithm)
        .digest(self.digest_algorithm)
        .key_usage(self.key_usage)
        .ext_key_usage(self.ext_key_usage);

        if let Some(authority) = authority {
            builder = builder
                .issuer(authority.certificate.subject_name.clone())
                .signed_by(SignerKey {
                    key_pem: authority.key_pem.clone().into_bytes(),
                    authority_key_id: authority.certificate.subject_key_id.clone(),
                });
        }
        builder.build()
    }

    /// Base name for files derived from this profile.
    #[must_use]
    pub fn file_stem(&self) -> String {
        certificate_file_stem(&self.subject, &self.subject_alt_names)
    }
}

/// Validity window starting an hour before `now` and lasting `years`.
#[must_use]
pub fn default_validity(now: DateTime<Utc>, years: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let not_before = now - Duration::hours(1);
    let not_after = not_before
        .checked_add_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (not_before, not_after)
}

// --- Naming ---

/// Append `CN=<first SAN>` to a subject that has no common name.
#[must_use]
pub fn clean_subject(subject: &str, sans: &[SubjectAltName]) -> String {
    let subject = subject.trim();
    match sans.first() {
        Some(san) if !subject.contains("CN=") => {
            if subject.is_empty() {
                format!("CN={}", san.value)
            } else {
                format!("{subject},CN={}", san.value)
            }
        }
        _ => subject.to_string(),
    }
}

/// File-system-safe base name for a certificate.
///
/// Prefers the subject CN, then the first DNS SAN with its first `*`
/// spelled `star`, then `cert`.
#[must_use]
pub fn certificate_file_stem(subject: &str, sans: &[SubjectAltName]) -> String {
    let common_name = COMMON_NAME_RE
        .captures(subject)
        .and_then(|caps| caps.get(1))
        .map(|cn| cn.as_str().trim())
        .filter(|cn| !cn.is_empty());

    let raw = match common_name {
        Some(cn) => cn.to_string(),
        None => sans
            .iter()
            .find(|san| san.kind == SanType::Dns)
            .map_or_else(|| FALLBACK_NAME.to_string(), |san| san.value.replacen('*', "star", 1)),
    };

    let safe: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '.')
        .collect();
    if safe.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        safe
    }
}

// --- Issuing ---

/// Where the signing authority for a leaf comes from.
#[derive(Debug, Clone)]
pub enum Authority {
    /// The leaf signs itself.
    SelfSigned,
    /// Generate a self-signed authority from this profile first.
    Generate(CertificateProfile),
    /// Load an existing authority certificate and key.
    Existing { cert: Vec<u8>, key: Vec<u8> },
}

/// An issued leaf and the authority that signed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    pub name: String,
    pub certificate: CertificateKeyRecord,
    pub authority: Option<CertificateKeyRecord>,
}

impl CertificateBundle {
    /// `<name>.zip`.
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.name)
    }

    /// Lay the bundle out as archive entries.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] if an entry cannot be stored.
    pub fn to_archive(&self) -> Result<ArchiveWriter, ArchiveError> {
        let name = &self.name;
        let mut archive = ArchiveWriter::new();
        archive.add_file(
            format!("{name}/{name}.crt"),
            self.certificate.certificate.cert_pem.as_bytes(),
        )?;
        archive.add_file_with_mode(
            format!("{name}/{name}.key"),
            self.certificate.key_pem.as_bytes(),
            KEY_FILE_MODE,
        )?;
        if let Some(authority) = &self.authority {
            archive.add_file(
                format!("{name}/{AUTHORITY_FILE_STEM}.crt"),
                authority.certificate.cert_pem.as_bytes(),
            )?;
            archive.add_file_with_mode(
                format!("{name}/{AUTHORITY_FILE_STEM}.key"),
                authority.key_pem.as_bytes(),
                KEY_FILE_MODE,
            )?;
        }
        Ok(archive)
    }
}

/// Issue `leaf`, signed according to `authority`.
///
/// # Errors
///
/// Returns the first [`BridgeError`] from the authority or leaf step.
pub async fn issue(
    bridge: &ModuleBridge,
    leaf: &CertificateProfile,
    authority: &Authority,
) -> Result<CertificateBundle, BridgeError> {
    let signer = match authority {
        Authority::SelfSigned => None,
        Authority::Generate(profile) => Some(bridge.generate(&profile.to_request(None)).await?),
        Authority::Existing { cert, key } => Some(bridge.inspect_with_key(cert, key).await?),
    };
    if let Some(signer) = &signer {
        tracing::info!(
            subject = %signer.certificate.subject_name,
            is_ca = signer.certificate.is_ca,
            "Using signing authority"
        );
    }

    let certificate = bridge.generate(&leaf.to_request(signer.as_ref())).await?;
    tracing::info!(subject = %certificate.certificate.subject_name, "Issued certificate");

    Ok(CertificateBundle {
        name: leaf.file_stem(),
        certificate,
        authority: signer,
    })
}
