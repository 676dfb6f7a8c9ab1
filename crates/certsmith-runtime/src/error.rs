//! Runtime error types.

/// Errors from loading or invoking an execution module.
///
/// A module returning a non-zero status is not a runtime error; statuses are
/// passed through untouched for the caller to translate.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Wasmtime engine, linking or trap error.
    #[error("wasmtime: {0}")]
    Wasmtime(#[from] anyhow::Error),

    /// I/O error (module reads, sandbox directory mirroring).
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    /// The module does not export a required function or memory.
    #[error("module is missing export '{0}'")]
    MissingExport(String),

    /// The randomness source could not produce bytes.
    #[error("random source: {0}")]
    Random(String),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, RuntimeError>;
