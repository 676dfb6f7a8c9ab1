//! Host randomness handed to modules, which have no system RNG of their own.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{Result, RuntimeError};

/// Fills buffers with cryptographically secure random bytes.
pub trait RandomnessProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns [`RuntimeError::Random`] if the source cannot supply bytes.
    fn fill(&self, buf: &mut [u8]) -> Result<()>;
}

/// Operating-system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomnessProvider for OsRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| RuntimeError::Random(e.to_string()))
    }
}
