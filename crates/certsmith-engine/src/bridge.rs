//! Module bridge: the single place that talks to an execution module.
//!
//! The bridge owns one lazily created [`ModuleInstance`]. Every operation
//! clears the instance's virtual directory, writes its inputs, invokes one
//! entry point and decodes the outputs while holding the instance lock, so
//! calls never observe each other's files.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use certsmith_runtime::{
    EntryPoint, ExecutionModule, ModuleInstance, NativeModule, OsRandom, SandboxConfig,
    SandboxModule,
};
use certsmith_types::codec::{ByteEncoder, DecodeError, EncodeError};
use certsmith_types::protocol::{
    CertificateKeyRecord, CertificateRecord, CertificateRequest, CERT_FILE, INPUT_FILE, KEY_FILE,
};
use certsmith_types::status::check_status;
use tokio::sync::OnceCell;

use crate::errors::BridgeError;

type ModuleFactory =
    dyn Fn() -> certsmith_runtime::Result<Box<dyn ExecutionModule>> + Send + Sync;

type SharedInstance = Arc<Mutex<ModuleInstance>>;

/// Typed front door to an execution module.
///
/// Created once by the application root and passed by reference. The module
/// itself is built on first use.
pub struct ModuleBridge {
    factory: Arc<ModuleFactory>,
    instance: OnceCell<SharedInstance>,
}

impl ModuleBridge {
    /// Bridge over modules produced by `factory`.
    ///
    /// The factory runs on a blocking thread at most once per successful
    /// creation. A failed creation is retried on the next call.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> certsmith_runtime::Result<Box<dyn ExecutionModule>> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            instance: OnceCell::new(),
        }
    }

    /// Bridge over the in-process OpenSSL module.
    #[must_use]
    pub fn native() -> Self {
        Self::new(|| {
            let module: Box<dyn ExecutionModule> = Box::new(NativeModule::new(Arc::new(OsRandom)));
            Ok(module)
        })
    }

    /// Bridge over a sandboxed Wasm module loaded from `path`.
    #[must_use]
    pub fn sandbox(path: PathBuf, config: SandboxConfig) -> Self {
        Self::new(move || {
            let module: Box<dyn ExecutionModule> =
                Box::new(SandboxModule::load(&path, &config, Arc::new(OsRandom))?);
            Ok(module)
        })
    }

    /// Whether the module instance has been created.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.instance.initialized()
    }

    /// The shared module instance, creating it on first use.
    ///
    /// Concurrent first callers all wait on the same creation.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Runtime`] if the module cannot be created.
    pub async fn acquire(&self) -> Result<SharedInstance, BridgeError> {
        let instance = self
            .instance
            .get_or_try_init(|| async {
                let factory = Arc::clone(&self.factory);
                let started = Instant::now();
                let module = tokio::task::spawn_blocking(move || (*factory)()).await??;
                tracing::info!(
                    backend = module.backend(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "Module instance created"
                );
                Ok::<_, BridgeError>(Arc::new(Mutex::new(ModuleInstance::new(module))))
            })
            .await?;
        Ok(Arc::clone(instance))
    }

    // --- Operations ---

    /// Generate a certificate and key for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Module`] carrying the status of a failed call,
    /// or a protocol error if the outputs cannot be decoded.
    pub async fn generate(
        &self,
        request: &CertificateRequest,
    ) -> Result<CertificateKeyRecord, BridgeError> {
        let mut inputs = vec![(INPUT_FILE, request.encode()?)];
        if let Some(key_pem) = request.signer_key_pem() {
            inputs.push((KEY_FILE, length_prefixed(key_pem)?));
        }

        tracing::debug!(
            subject = %request.subject_name,
            is_ca = request.is_ca,
            self_signed = request.is_self_signed(),
            "Generating certificate"
        );
        self.call(EntryPoint::Generate, inputs, |instance| {
            Ok(CertificateKeyRecord {
                certificate: read_record(instance)?,
                key_pem: read_key_pem(instance)?,
            })
        })
        .await
    }

    /// Describe the last certificate in `cert` (PEM chain or DER).
    ///
    /// # Errors
    ///
    /// Same as [`ModuleBridge::generate`].
    pub async fn inspect(&self, cert: &[u8]) -> Result<CertificateRecord, BridgeError> {
        let inputs = vec![(CERT_FILE, length_prefixed(cert)?)];
        self.call(EntryPoint::Inspect, inputs, read_record).await
    }

    /// Describe the certificate in `cert` whose public key matches `key`.
    ///
    /// # Errors
    ///
    /// Same as [`ModuleBridge::generate`]. A key that matches no certificate
    /// is reported as a `key_mismatch` module failure.
    pub async fn inspect_with_key(
        &self,
        cert: &[u8],
        key: &[u8],
    ) -> Result<CertificateKeyRecord, BridgeError> {
        let inputs = vec![
            (CERT_FILE, length_prefixed(cert)?),
            (KEY_FILE, length_prefixed(key)?),
        ];
        self.call(EntryPoint::InspectWithKey, inputs, |instance| {
            Ok(CertificateKeyRecord {
                certificate: read_record(instance)?,
                key_pem: read_key_pem(instance)?,
            })
        })
        .await
    }

    /// Run one write-invoke-read sequence under the instance lock.
    async fn call<T, F>(
        &self,
        entry: EntryPoint,
        inputs: Vec<(&'static str, Vec<u8>)>,
        decode: F,
    ) -> Result<T, BridgeError>
    where
        T: Send + 'static,
        F: FnOnce(&ModuleInstance) -> Result<T, BridgeError> + Send + 'static,
    {
        let instance = self.acquire().await?;
        tokio::task::spawn_blocking(move || {
            let mut guard = instance.lock().map_err(|_| BridgeError::LockPoisoned)?;
            guard.clear();
            for (name, data) in inputs {
                guard.write_file(name, data);
            }

            let status = guard.invoke(entry)?;
            if let Err(failure) = check_status(status) {
                tracing::warn!(entry = %entry, status, kind = %failure.kind, "Module call failed");
                return Err(failure.into());
            }
            decode(&*guard)
        })
        .await?
    }
}

impl std::fmt::Debug for ModuleBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleBridge")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

// --- Output decoding ---

fn read_record(instance: &ModuleInstance) -> Result<CertificateRecord, BridgeError> {
    let data = instance
        .read_file(CERT_FILE)
        .ok_or(BridgeError::MissingOutput(CERT_FILE))?;
    Ok(CertificateRecord::decode(data)?)
}

/// The `key` output is raw PEM text with no length prefix.
fn read_key_pem(instance: &ModuleInstance) -> Result<String, BridgeError> {
    let data = instance
        .read_file(KEY_FILE)
        .ok_or(BridgeError::MissingOutput(KEY_FILE))?;
    String::from_utf8(data.to_vec()).map_err(|_| BridgeError::Protocol(DecodeError::InvalidUtf8))
}

fn length_prefixed(data: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let mut enc = ByteEncoder::new();
    enc.write_bytes(data)?;
    Ok(enc.finish())
}
