//! Reading certificate metadata back out with x509-parser.

use certsmith_types::protocol::CertificateRecord;
use certsmith_types::status::ErrorKind;
use openssl::x509::X509Ref;
use x509_parser::prelude::{FromDer, ParsedExtension, X509Certificate};

use super::{OrStatus, Status};

/// Build the record reported for `cert`.
///
/// A certificate without a subject key identifier reports an empty one.
pub(super) fn describe(cert: &X509Ref) -> Status<CertificateRecord> {
    let der = cert.to_der().or_status(ErrorKind::ConvertPem)?;
    let (_, parsed) = X509Certificate::from_der(&der).or_status(ErrorKind::CertInfo)?;

    let is_ca = parsed
        .basic_constraints()
        .or_status(ErrorKind::CertInfo)?
        .is_some_and(|bc| bc.value.ca);

    let subject_key_id = parsed
        .extensions()
        .iter()
        .find_map(|ext| match ext.parsed_extension() {
            ParsedExtension::SubjectKeyIdentifier(kid) => Some(kid.0.to_vec()),
            _ => None,
        })
        .unwrap_or_default();

    let pem = cert.to_pem().or_status(ErrorKind::ConvertPem)?;
    Ok(CertificateRecord {
        cert_pem: String::from_utf8(pem).or_status(ErrorKind::ConvertPem)?,
        is_ca,
        subject_name: parsed.subject().to_string(),
        subject_key_id,
    })
}
