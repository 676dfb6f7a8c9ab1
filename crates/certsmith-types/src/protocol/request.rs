//! Generate request: the typed form callers build and the raw wire form
//! written to the `input` virtual file.

use crate::codec::{ByteDecoder, ByteEncoder, DecodeError, EncodeError};

use super::{
    DigestAlgorithm, ExtKeyUsage, KeyAlgorithm, KeyUsage, SanType, SubjectAltName, ValidityTime,
};

/// Key material of the authority that signs a non-self-signed certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerKey {
    /// Private key PEM, shipped in the `key` virtual file.
    pub key_pem: Vec<u8>,
    /// Subject key identifier of the signing certificate.
    pub authority_key_id: Vec<u8>,
}

/// Who signs the certificate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Signer {
    #[default]
    SelfSigned,
    Authority(SignerKey),
}

/// Everything needed to generate one certificate and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    /// Issuer DN; `None` means the subject issues itself.
    pub issuer_name: Option<String>,
    pub subject_name: String,
    pub is_ca: bool,
    pub signer: Signer,
    pub subject_alt_names: Vec<SubjectAltName>,
    pub key_algorithm: KeyAlgorithm,
    pub digest_algorithm: DigestAlgorithm,
    pub not_before: ValidityTime,
    pub not_after: ValidityTime,
    pub key_usage: KeyUsage,
    pub ext_key_usage: ExtKeyUsage,
}

impl CertificateRequest {
    /// Start a self-signed request with default algorithms and no usages.
    #[must_use]
    pub fn builder(
        subject_name: impl Into<String>,
        not_before: ValidityTime,
        not_after: ValidityTime,
    ) -> CertificateRequestBuilder {
        CertificateRequestBuilder {
            request: Self {
                issuer_name: None,
                subject_name: subject_name.into(),
                is_ca: false,
                signer: Signer::SelfSigned,
                subject_alt_names: Vec::new(),
                key_algorithm: KeyAlgorithm::default(),
                digest_algorithm: DigestAlgorithm::default(),
                not_before,
                not_after,
                key_usage: KeyUsage::empty(),
                ext_key_usage: ExtKeyUsage::empty(),
            },
        }
    }

    /// Effective issuer DN.
    #[must_use]
    pub fn issuer(&self) -> &str {
        self.issuer_name.as_deref().unwrap_or(&self.subject_name)
    }

    #[must_use]
    pub fn is_self_signed(&self) -> bool {
        matches!(self.signer, Signer::SelfSigned)
    }

    /// Signer private key PEM, present iff not self-signed.
    #[must_use]
    pub fn signer_key_pem(&self) -> Option<&[u8]> {
        match &self.signer {
            Signer::SelfSigned => None,
            Signer::Authority(key) => Some(&key.key_pem),
        }
    }

    /// Project onto the raw wire layout. The signer key PEM is not part of it.
    #[must_use]
    pub fn to_wire(&self) -> WireRequest {
        let authority_key_id = match &self.signer {
            Signer::SelfSigned => Vec::new(),
            Signer::Authority(key) => key.authority_key_id.clone(),
        };
        WireRequest {
            issuer: self.issuer().to_owned(),
            subject: self.subject_name.clone(),
            is_ca: self.is_ca,
            self_signed: self.is_self_signed(),
            authority_key_id,
            subject_alt_names: self.subject_alt_names.clone(),
            key_algorithm_index: self.key_algorithm.index(),
            digest_index: self.digest_algorithm.index(),
            not_before: self.not_before.as_str().to_owned(),
            not_after: self.not_after.as_str().to_owned(),
            key_usage: self.key_usage.bits(),
            ext_key_usage: self.ext_key_usage.bits(),
        }
    }

    /// Encode the `input` file contents.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if a string field overflows its length prefix.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        self.to_wire().encode()
    }
}

/// Builder for [`CertificateRequest`].
#[derive(Debug, Clone)]
pub struct CertificateRequestBuilder {
    request: CertificateRequest,
}

impl CertificateRequestBuilder {
    #[must_use]
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.request.issuer_name = Some(issuer.into());
        self
    }

    #[must_use]
    pub fn ca(mut self, is_ca: bool) -> Self {
        self.request.is_ca = is_ca;
        self
    }

    #[must_use]
    pub fn signed_by(mut self, key: SignerKey) -> Self {
        self.request.signer = Signer::Authority(key);
        self
    }

    #[must_use]
    pub fn san(mut self, san: SubjectAltName) -> Self {
        self.request.subject_alt_names.push(san);
        self
    }

    #[must_use]
    pub fn sans(mut self, sans: impl IntoIterator<Item = SubjectAltName>) -> Self {
        self.request.subject_alt_names.extend(sans);
        self
    }

    #[must_use]
    pub fn key_algorithm(mut self, alg: KeyAlgorithm) -> Self {
        self.request.key_algorithm = alg;
        self
    }

    #[must_use]
    pub fn digest(mut self, digest: DigestAlgorithm) -> Self {
        self.request.digest_algorithm = digest;
        self
    }

    #[must_use]
    pub fn key_usage(mut self, usage: KeyUsage) -> Self {
        self.request.key_usage = usage;
        self
    }

    #[must_use]
    pub fn ext_key_usage(mut self, usage: ExtKeyUsage) -> Self {
        self.request.ext_key_usage = usage;
        self
    }

    #[must_use]
    pub fn build(self) -> CertificateRequest {
        self.request
    }
}

/// Raw field sequence of the `input` file for `generate`.
///
/// Indices, bitmasks and timestamps are kept unvalidated so a module can
/// report its own status for out-of-range values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub issuer: String,
    pub subject: String,
    pub is_ca: bool,
    pub self_signed: bool,
    /// Empty when self-signed; the field is still written.
    pub authority_key_id: Vec<u8>,
    pub subject_alt_names: Vec<SubjectAltName>,
    pub key_algorithm_index: u32,
    pub digest_index: u32,
    pub not_before: String,
    pub not_after: String,
    pub key_usage: u32,
    pub ext_key_usage: u32,
}

impl WireRequest {
    /// # Errors
    ///
    /// Returns [`EncodeError`] if any length-prefixed field overflows `u32`.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut enc = ByteEncoder::new();
        enc.write_string(&self.issuer)?;
        enc.write_string(&self.subject)?;
        enc.write_bool(self.is_ca);
        enc.write_bool(self.self_signed);
        enc.write_bytes(&self.authority_key_id)?;

        let count = u32::try_from(self.subject_alt_names.len())
            .map_err(|_| EncodeError::FieldTooLong(self.subject_alt_names.len()))?;
        enc.write_u32(count);
        for san in &self.subject_alt_names {
            enc.write_u32(san.kind.wire_value());
            enc.write_string(&san.value)?;
        }

        enc.write_u32(self.key_algorithm_index);
        enc.write_u32(self.digest_index);
        enc.write_string(&self.not_before)?;
        enc.write_string(&self.not_after)?;
        enc.write_u32(self.key_usage);
        enc.write_u32(self.ext_key_usage);
        Ok(enc.finish())
    }

    /// # Errors
    ///
    /// Returns [`DecodeError`] on truncation, bad bools, bad UTF-8 or an
    /// unknown SAN type.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = ByteDecoder::new(data);
        let issuer = dec.read_string()?;
        let subject = dec.read_string()?;
        let is_ca = dec.read_bool()?;
        let self_signed = dec.read_bool()?;
        let authority_key_id = dec.read_bytes()?;

        let count = dec.read_u32()?;
        // Each SAN needs at least 8 bytes; refuse counts the buffer cannot hold.
        let mut subject_alt_names = Vec::with_capacity((count as usize).min(dec.remaining() / 8));
        for _ in 0..count {
            let kind = SanType::from_wire(dec.read_u32()?)?;
            let value = dec.read_string()?;
            subject_alt_names.push(SubjectAltName { kind, value });
        }

        Ok(Self {
            issuer,
            subject,
            is_ca,
            self_signed,
            authority_key_id,
            subject_alt_names,
            key_algorithm_index: dec.read_u32()?,
            digest_index: dec.read_u32()?,
            not_before: dec.read_string()?,
            not_after: dec.read_string()?,
            key_usage: dec.read_u32()?,
            ext_key_usage: dec.read_u32()?,
        })
    }
}
