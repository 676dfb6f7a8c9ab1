//! Bridge, packaging and settings layer for certsmith.
//!
//! [`ModuleBridge`] owns the single execution-module instance and turns
//! typed requests into virtual-file calls. [`bundle`] assembles issued
//! certificates into an [`archive`], and [`config`] reads the YAML settings
//! the command line works from.

#![warn(clippy::pedantic)]

pub mod archive;
pub mod bridge;
pub mod bundle;
pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod resolve;

pub use bridge::ModuleBridge;
pub use bundle::{Authority, CertificateBundle, CertificateProfile};
pub use errors::BridgeError;
pub use orchestrator::{check_settings, inspect_files, issue_from_config};
