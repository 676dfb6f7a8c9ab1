//! Wasmtime sandbox hosting a compiled certificate module (WASI preview 1).
//!
//! The module sees a single preopened directory `.` backed by a private
//! temporary directory. Before each call the host [`VirtualDirectory`] is
//! mirrored into it, and afterwards the directory is read back, so the guest
//! observes exactly the host's files and nothing left over from earlier calls.
//! Random bytes come from the host through the `crypto.fill_random` import.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tempfile::TempDir;
use wasmtime::{
    Caller, Config, Engine, Extern, Instance, Linker, Module, Store, StoreLimits,
    StoreLimitsBuilder,
};
use wasmtime_wasi::preview1::WasiP1Ctx;
use wasmtime_wasi::{DirPerms, FilePerms, WasiCtxBuilder};

use crate::error::{Result, RuntimeError};
use crate::host_state::SandboxState;
use crate::module::{EntryPoint, ExecutionModule};
use crate::random::RandomnessProvider;
use crate::vfs::VirtualDirectory;

/// Guest path of the preopened virtual directory.
const GUEST_ROOT: &str = ".";

/// Resource settings for a sandboxed module.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Upper bound on guest linear memory.
    pub max_memory_bytes: Option<u64>,
    /// Forward guest stderr to the host's stderr.
    pub inherit_stderr: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: None,
            inherit_stderr: true,
        }
    }
}

/// Build a preview-1 WASI context with network disabled and `root` preopened as `.`.
///
/// # Errors
///
/// Returns an error if `root` cannot be opened.
pub fn build_wasi_ctx(root: &Path, config: &SandboxConfig) -> anyhow::Result<WasiP1Ctx> {
    let mut builder = WasiCtxBuilder::new();
    builder.allow_blocking_current_thread(true);

    builder.allow_tcp(false);
    builder.allow_udp(false);
    builder.allow_ip_name_lookup(false);

    if config.inherit_stderr {
        builder.inherit_stderr();
    }

    builder
        .preopened_dir(root, GUEST_ROOT, DirPerms::all(), FilePerms::all())
        .with_context(|| format!("failed to preopen directory '{}'", root.display()))?;

    Ok(builder.build_p1())
}

/// Build Wasmtime store limits from sandbox settings.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn build_store_limits(config: &SandboxConfig) -> StoreLimits {
    let mut builder = StoreLimitsBuilder::new();
    if let Some(max_bytes) = config.max_memory_bytes {
        builder = builder.memory_size(max_bytes as usize);
    }
    builder = builder.trap_on_grow_failure(true);
    builder.build()
}

/// A compiled module instantiated once and reused for every call.
///
/// A trap discards the instance: the next call runs against a fresh store
/// and a freshly initialized guest.
pub struct SandboxModule {
    module: Module,
    config: SandboxConfig,
    random: Arc<dyn RandomnessProvider>,
    store: Store<SandboxState>,
    instance: Instance,
    root: TempDir,
}

impl SandboxModule {
    /// Compile and instantiate the module at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be compiled, an import cannot be satisfied,
    /// or `_initialize` traps.
    pub fn load(
        path: &Path,
        config: &SandboxConfig,
        random: Arc<dyn RandomnessProvider>,
    ) -> Result<Self> {
        let engine = new_engine()?;
        let module = Module::from_file(&engine, path)
            .with_context(|| format!("Failed to load Wasm module: {}", path.display()))?;
        tracing::info!(path = %path.display(), "Loaded certificate module");
        Self::new(module, config, random)
    }

    /// Compile and instantiate a module from bytes (binary or text format).
    ///
    /// # Errors
    ///
    /// Same as [`SandboxModule::load`].
    pub fn from_bytes(
        bytes: &[u8],
        config: &SandboxConfig,
        random: Arc<dyn RandomnessProvider>,
    ) -> Result<Self> {
        let engine = new_engine()?;
        let module = Module::new(&engine, bytes).context("Failed to compile Wasm module")?;
        Self::new(module, config, random)
    }

    fn new(
        module: Module,
        config: &SandboxConfig,
        random: Arc<dyn RandomnessProvider>,
    ) -> Result<Self> {
        let (store, instance, root) = instantiate(&module, config, &random)?;
        Ok(Self {
            module,
            config: config.clone(),
            random,
            store,
            instance,
            root,
        })
    }

    /// Replace the store, instance and directory with fresh ones.
    fn reset(&mut self) -> Result<()> {
        let (store, instance, root) = instantiate(&self.module, &self.config, &self.random)?;
        self.store = store;
        self.instance = instance;
        self.root = root;
        Ok(())
    }
}

fn instantiate(
    module: &Module,
    config: &SandboxConfig,
    random: &Arc<dyn RandomnessProvider>,
) -> Result<(Store<SandboxState>, Instance, TempDir)> {
    let engine = module.engine();
    let mut linker: Linker<SandboxState> = Linker::new(engine);
    wasmtime_wasi::preview1::add_to_linker_sync(&mut linker, |s: &mut SandboxState| &mut s.wasi)
        .context("Failed to add WASI imports to linker")?;
    linker
        .func_wrap("crypto", "fill_random", fill_random)
        .context("Failed to add crypto.fill_random to linker")?;

    let root = tempfile::tempdir()?;
    let state = SandboxState::new(root.path(), config, Arc::clone(random))?;
    let mut store = Store::new(engine, state);
    store.limiter(|s| &mut s.limits);

    let instance = linker
        .instantiate(&mut store, module)
        .context("Failed to instantiate Wasm module")?;

    if let Some(init) = instance.get_func(&mut store, "_initialize") {
        init.typed::<(), ()>(&store)?
            .call(&mut store, ())
            .context("Module _initialize trapped")?;
        tracing::debug!("Ran module _initialize");
    }

    Ok((store, instance, root))
}

impl ExecutionModule for SandboxModule {
    fn backend(&self) -> &'static str {
        "wasm"
    }

    fn invoke(&mut self, entry: EntryPoint, dir: &mut VirtualDirectory) -> Result<i32> {
        let name = entry.export_name();
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| RuntimeError::MissingExport(name.to_owned()))?
            .typed::<(), i32>(&self.store)?;

        mirror_to_disk(dir, self.root.path())?;
        let status = match func.call(&mut self.store, ()) {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(entry = %entry, error = %err, "Module trapped, discarding instance");
                self.reset()?;
                return Err(err.into());
            }
        };
        load_from_disk(self.root.path(), dir)?;
        Ok(status)
    }
}

fn new_engine() -> Result<Engine> {
    let mut config = Config::new();
    config.async_support(false);
    Ok(Engine::new(&config).context("Failed to initialize Wasmtime engine")?)
}

/// Host side of `crypto.fill_random(offset, len)`. Out-of-bounds regions trap.
fn fill_random(mut caller: Caller<'_, SandboxState>, offset: i32, len: i32) -> anyhow::Result<()> {
    let memory = caller
        .get_export("memory")
        .and_then(Extern::into_memory)
        .ok_or_else(|| anyhow!("fill_random: module exports no memory"))?;
    let (data, state) = memory.data_and_store_mut(&mut caller);

    // Guest pointers are unsigned 32-bit values carried in i32.
    #[allow(clippy::cast_sign_loss)]
    let (start, len) = (offset as u32 as usize, len as u32 as usize);
    let region = start
        .checked_add(len)
        .and_then(|end| data.get_mut(start..end))
        .ok_or_else(|| anyhow!("fill_random: region {start}+{len} outside linear memory"))?;
    state.random.fill(region)?;
    Ok(())
}

/// Make `root` hold exactly the files of `dir`.
fn mirror_to_disk(dir: &VirtualDirectory, root: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let stale = entry
            .file_name()
            .to_str()
            .map_or(true, |name| !dir.contains(name));
        if stale {
            fs::remove_file(entry.path())?;
        }
    }
    for (name, data) in dir.iter() {
        fs::write(root.join(name), data)?;
    }
    Ok(())
}

/// Replace the contents of `dir` with the regular files in `root`.
fn load_from_disk(root: &Path, dir: &mut VirtualDirectory) -> std::io::Result<()> {
    dir.clear();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            tracing::warn!(path = %entry.path().display(), "Skipping non-UTF-8 file name written by module");
            continue;
        };
        dir.write(name, fs::read(entry.path())?);
    }
    Ok(())
}
