//! Store data for a sandboxed module: WASI context, limits and randomness.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use wasmtime::StoreLimits;
use wasmtime_wasi::preview1::WasiP1Ctx;

use crate::random::RandomnessProvider;
use crate::sandbox::{build_store_limits, build_wasi_ctx, SandboxConfig};

/// State owned by the wasmtime `Store` of a [`SandboxModule`](crate::SandboxModule).
pub(crate) struct SandboxState {
    pub(crate) wasi: WasiP1Ctx,
    pub(crate) limits: StoreLimits,
    pub(crate) random: Arc<dyn RandomnessProvider>,
}

impl SandboxState {
    /// Build state whose WASI view preopens `root` as `.`.
    ///
    /// # Errors
    ///
    /// Returns an error if the WASI context cannot preopen `root`.
    pub(crate) fn new(
        root: &Path,
        config: &SandboxConfig,
        random: Arc<dyn RandomnessProvider>,
    ) -> Result<Self> {
        Ok(Self {
            wasi: build_wasi_ctx(root, config)?,
            limits: build_store_limits(config),
            random,
        })
    }
}
