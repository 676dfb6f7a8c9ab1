//! Execution modules for certsmith.
//!
//! An execution module exposes integer-returning entry points and reads and
//! writes named buffers in a [`vfs::VirtualDirectory`]. Two implementations
//! are provided: a wasmtime sandbox hosting a compiled WASI module, and a
//! native module backed by OpenSSL.

#![warn(clippy::pedantic)]

pub mod error;
mod host_state;
pub mod module;
pub mod native;
pub mod random;
pub mod sandbox;
pub mod vfs;

pub use error::{Result, RuntimeError};
pub use module::{EntryPoint, ExecutionModule, ModuleInstance};
pub use native::NativeModule;
pub use random::{OsRandom, RandomnessProvider};
pub use sandbox::{SandboxConfig, SandboxModule};
pub use vfs::{VirtualDirectory, VirtualFile};
