use serde::Serialize;

use crate::codec::{ByteDecoder, ByteEncoder, DecodeError, EncodeError};

/// Certificate metadata as written by a module into the `cert` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateRecord {
    pub cert_pem: String,
    pub is_ca: bool,
    pub subject_name: String,
    pub subject_key_id: Vec<u8>,
}

impl CertificateRecord {
    /// # Errors
    ///
    /// Returns [`EncodeError`] if a field overflows its length prefix.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut enc = ByteEncoder::new();
        enc.write_string(&self.cert_pem)?;
        enc.write_bool(self.is_ca);
        enc.write_string(&self.subject_name)?;
        enc.write_bytes(&self.subject_key_id)?;
        Ok(enc.finish())
    }

    /// # Errors
    ///
    /// Returns [`DecodeError`] if the buffer is truncated or malformed.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = ByteDecoder::new(data);
        Ok(Self {
            cert_pem: dec.read_string()?,
            is_ca: dec.read_bool()?,
            subject_name: dec.read_string()?,
            subject_key_id: dec.read_bytes()?,
        })
    }

    /// Subject key identifier as lowercase colon-separated hex.
    #[must_use]
    pub fn subject_key_id_hex(&self) -> String {
        self.subject_key_id
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }
}

/// A certificate together with its private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateKeyRecord {
    #[serde(flatten)]
    pub certificate: CertificateRecord,
    pub key_pem: String,
}
