//! Bridge error model and user-facing message mapping.

use certsmith_runtime::RuntimeError;
use certsmith_types::codec::{DecodeError, EncodeError};
use certsmith_types::status::{ErrorKind, ModuleFailure};

/// Failure of a bridge operation.
///
/// `Module` carries the exact status a module returned. `Protocol` and
/// `MissingOutput` mean the module broke the virtual-file contract and are
/// never recoverable by retrying.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Non-zero status from a module entry point.
    #[error(transparent)]
    Module(#[from] ModuleFailure),

    /// An output file could not be decoded.
    #[error("protocol violation: {0}")]
    Protocol(#[from] DecodeError),

    /// A request field could not be encoded.
    #[error("request encoding failed: {0}")]
    Encode(#[from] EncodeError),

    /// Loading or invoking the module failed.
    #[error("module runtime: {0}")]
    Runtime(#[from] RuntimeError),

    /// The module reported success without writing an expected file.
    #[error("protocol violation: module returned success but wrote no '{0}' file")]
    MissingOutput(&'static str),

    /// A previous call panicked while holding the instance.
    #[error("module instance lock poisoned")]
    LockPoisoned,

    /// The blocking task running the call was cancelled or panicked.
    #[error("module task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl BridgeError {
    /// Module failure kind, if this error came from a module status.
    #[must_use]
    pub fn module_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Module(failure) => Some(failure.kind),
            _ => None,
        }
    }

    /// Message suitable for showing to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.module_kind() {
            Some(ErrorKind::ReadCert) => "Error reading certificate file.".to_string(),
            Some(ErrorKind::ReadKey) => "Error reading private key file.".to_string(),
            Some(ErrorKind::KeyMismatch) => {
                "Private key doesn't match the supplied certificates.".to_string()
            }
            _ => format!("Unexpected error: {self}"),
        }
    }
}
