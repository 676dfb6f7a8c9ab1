//! The `inspect` and `inspect_with_key` entry points.

use certsmith_types::protocol::{CERT_FILE, KEY_FILE};
use certsmith_types::status::ErrorKind;
use openssl::x509::X509;

use super::info::describe;
use super::{contains_pem_marker, read_blob, read_private_key, OrStatus, Status};
use crate::vfs::VirtualDirectory;

/// Report the last certificate of the supplied chain.
pub(super) fn run(dir: &mut VirtualDirectory) -> Status<()> {
    let chain = read_chain(dir)?;
    let cert = chain.last().ok_or(ErrorKind::ReadCert)?;
    let record = describe(cert)?;
    dir.write(CERT_FILE, record.encode().or_status(ErrorKind::WriteCertInfo)?);
    Ok(())
}

/// Report the first certificate whose public key matches the supplied key.
pub(super) fn run_with_key(dir: &mut VirtualDirectory) -> Status<()> {
    let chain = read_chain(dir)?;
    let key = read_private_key(dir)?;

    let cert = chain
        .iter()
        .find(|cert| cert.public_key().is_ok_and(|public| public.public_eq(&key)))
        .ok_or(ErrorKind::KeyMismatch)?;

    let record = describe(cert)?;
    let key_pem = key
        .private_key_to_pem_pkcs8()
        .or_status(ErrorKind::ConvertPem)?;

    dir.write(CERT_FILE, record.encode().or_status(ErrorKind::WriteCertInfo)?);
    dir.write(KEY_FILE, key_pem);
    Ok(())
}

/// Parse the `cert` blob as a PEM chain or a single DER certificate.
fn read_chain(dir: &VirtualDirectory) -> Status<Vec<X509>> {
    let data = read_blob(dir, CERT_FILE, ErrorKind::ReadCert)?;
    let chain = if contains_pem_marker(&data) {
        X509::stack_from_pem(&data)
    } else {
        X509::from_der(&data).map(|cert| vec![cert])
    }
    .or_status(ErrorKind::ReadCert)?;

    if chain.is_empty() {
        return Err(ErrorKind::ReadCert);
    }
    Ok(chain)
}
