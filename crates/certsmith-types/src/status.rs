//! Module status codes and their translation into typed failures.
//!
//! Every exported entry point of an execution module returns an `i32`.
//! Zero means success; every other value translates to exactly one
//! [`ErrorKind`], with [`ErrorKind::Unrecognized`] as the catch-all.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase in which a module failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorGroup {
    /// Reading input files or writing output files.
    Transport,
    /// Assigning a field on the certificate under construction.
    FieldAssignment,
    /// Generating the certificate or key.
    Generation,
    /// Reading information back out of a certificate.
    Inspection,
    /// Converting to or from PEM.
    Conversion,
    /// Code outside the known table.
    Unknown,
}

impl fmt::Display for ErrorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transport => "transport",
            Self::FieldAssignment => "field_assignment",
            Self::Generation => "generation",
            Self::Inspection => "inspection",
            Self::Conversion => "conversion",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Closed set of failure kinds a module can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ReadInput,
    ReadCert,
    ReadKey,
    WriteCert,
    WriteCertInfo,
    WriteKey,
    CertSetSerial,
    CertSetValidity,
    CertSetIssuer,
    CertSetSubject,
    CertSetKeyUsage,
    CertSetExtKeyUsage,
    CertSetSkid,
    CertSetAkid,
    CertSetSan,
    GenerateCert,
    GenerateKey,
    CertInfo,
    KeyMismatch,
    ConvertPem,
    OpenFile,
    /// Any non-zero code outside the table above.
    Unrecognized,
}

impl ErrorKind {
    /// Every kind with a fixed numeric code.
    pub const KNOWN: [Self; 21] = [
        Self::ReadInput,
        Self::ReadCert,
        Self::ReadKey,
        Self::WriteCert,
        Self::WriteCertInfo,
        Self::WriteKey,
        Self::CertSetSerial,
        Self::CertSetValidity,
        Self::CertSetIssuer,
        Self::CertSetSubject,
        Self::CertSetKeyUsage,
        Self::CertSetExtKeyUsage,
        Self::CertSetSkid,
        Self::CertSetAkid,
        Self::CertSetSan,
        Self::GenerateCert,
        Self::GenerateKey,
        Self::CertInfo,
        Self::KeyMismatch,
        Self::ConvertPem,
        Self::OpenFile,
    ];

    /// Numeric code as returned by a module, `None` for [`Self::Unrecognized`].
    #[must_use]
    pub fn code(self) -> Option<i32> {
        let code = match self {
            Self::ReadInput => 100,
            Self::ReadCert => 101,
            Self::ReadKey => 102,
            Self::WriteCert => 200,
            Self::WriteCertInfo => 201,
            Self::WriteKey => 202,
            Self::CertSetSerial => 300,
            Self::CertSetValidity => 301,
            Self::CertSetIssuer => 302,
            Self::CertSetSubject => 303,
            Self::CertSetKeyUsage => 304,
            Self::CertSetExtKeyUsage => 305,
            Self::CertSetSkid => 306,
            Self::CertSetAkid => 307,
            Self::CertSetSan => 308,
            Self::GenerateCert => 400,
            Self::GenerateKey => 401,
            Self::CertInfo => 402,
            Self::KeyMismatch => 403,
            Self::ConvertPem => 404,
            Self::OpenFile => 405,
            Self::Unrecognized => return None,
        };
        Some(code)
    }

    /// Translate a non-zero status code. Total over all non-zero inputs.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|k| k.code() == Some(code))
            .unwrap_or(Self::Unrecognized)
    }

    #[must_use]
    pub fn group(self) -> ErrorGroup {
        match self {
            Self::ReadInput
            | Self::ReadCert
            | Self::ReadKey
            | Self::WriteCert
            | Self::WriteCertInfo
            | Self::WriteKey
            | Self::OpenFile => ErrorGroup::Transport,
            Self::CertSetSerial
            | Self::CertSetValidity
            | Self::CertSetIssuer
            | Self::CertSetSubject
            | Self::CertSetKeyUsage
            | Self::CertSetExtKeyUsage
            | Self::CertSetSkid
            | Self::CertSetAkid
            | Self::CertSetSan => ErrorGroup::FieldAssignment,
            Self::GenerateCert | Self::GenerateKey => ErrorGroup::Generation,
            Self::CertInfo | Self::KeyMismatch => ErrorGroup::Inspection,
            Self::ConvertPem => ErrorGroup::Conversion,
            Self::Unrecognized => ErrorGroup::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadInput => "read_input",
            Self::ReadCert => "read_cert",
            Self::ReadKey => "read_key",
            Self::WriteCert => "write_cert",
            Self::WriteCertInfo => "write_cert_info",
            Self::WriteKey => "write_key",
            Self::CertSetSerial => "cert_set_serial",
            Self::CertSetValidity => "cert_set_validity",
            Self::CertSetIssuer => "cert_set_issuer",
            Self::CertSetSubject => "cert_set_subject",
            Self::CertSetKeyUsage => "cert_set_key_usage",
            Self::CertSetExtKeyUsage => "cert_set_ext_key_usage",
            Self::CertSetSkid => "cert_set_skid",
            Self::CertSetAkid => "cert_set_akid",
            Self::CertSetSan => "cert_set_san",
            Self::GenerateCert => "generate_cert",
            Self::GenerateKey => "generate_key",
            Self::CertInfo => "cert_info",
            Self::KeyMismatch => "key_mismatch",
            Self::ConvertPem => "convert_pem",
            Self::OpenFile => "open_file",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-zero status returned by a module entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("module returned {kind} (status {code})")]
pub struct ModuleFailure {
    /// Exact code the module returned.
    pub code: i32,
    pub kind: ErrorKind,
}

impl ModuleFailure {
    /// Build a failure for a known kind. [`ErrorKind::Unrecognized`] maps to `-1`.
    #[must_use]
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self {
            code: kind.code().unwrap_or(-1),
            kind,
        }
    }
}

/// Status code for success.
pub const SUCCESS: i32 = 0;

/// Check a raw module status.
///
/// # Errors
///
/// Returns a [`ModuleFailure`] carrying the code for every non-zero status.
pub fn check_status(status: i32) -> Result<(), ModuleFailure> {
    if status == SUCCESS {
        return Ok(());
    }
    Err(ModuleFailure {
        code: status,
        kind: ErrorKind::from_code(status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn success_never_fails() {
        assert!(check_status(SUCCESS).is_ok());
    }

    #[test]
    fn known_codes_round_trip() {
        for kind in ErrorKind::KNOWN {
            let code = kind.code().unwrap();
            assert_eq!(ErrorKind::from_code(code), kind);
        }
    }

    #[test]
    fn known_codes_are_unique() {
        let codes: HashSet<i32> = ErrorKind::KNOWN.iter().filter_map(|k| k.code()).collect();
        assert_eq!(codes.len(), ErrorKind::KNOWN.len());
    }

    #[test]
    fn key_mismatch_is_inspection_failure() {
        let err = check_status(403).unwrap_err();
        assert_eq!(err.kind, ErrorKind::KeyMismatch);
        assert_eq!(err.code, 403);
        assert_eq!(err.kind.group(), ErrorGroup::Inspection);
    }

    #[test]
    fn groups_follow_code_hundreds() {
        assert_eq!(ErrorKind::ReadKey.group(), ErrorGroup::Transport);
        assert_eq!(ErrorKind::WriteCertInfo.group(), ErrorGroup::Transport);
        assert_eq!(ErrorKind::CertSetSan.group(), ErrorGroup::FieldAssignment);
        assert_eq!(ErrorKind::GenerateKey.group(), ErrorGroup::Generation);
        assert_eq!(ErrorKind::ConvertPem.group(), ErrorGroup::Conversion);
        assert_eq!(ErrorKind::OpenFile.group(), ErrorGroup::Transport);
    }

    #[test]
    fn unknown_code_is_unrecognized_and_keeps_code() {
        let err = check_status(-7).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unrecognized);
        assert_eq!(err.code, -7);
        assert_eq!(err.to_string(), "module returned unrecognized (status -7)");
    }

    #[test]
    fn display_uses_snake_case() {
        assert_eq!(ErrorKind::CertSetExtKeyUsage.to_string(), "cert_set_ext_key_usage");
        assert_eq!(ErrorGroup::FieldAssignment.to_string(), "field_assignment");
    }

    proptest! {
        #[test]
        fn every_nonzero_status_fails_with_exact_code(code in any::<i32>().prop_filter("non-zero", |c| *c != 0)) {
            let err = check_status(code).unwrap_err();
            prop_assert_eq!(err.code, code);
            match err.kind.code() {
                Some(known) => prop_assert_eq!(known, code),
                None => prop_assert_eq!(err.kind, ErrorKind::Unrecognized),
            }
        }
    }
}
