use std::path::{Path, PathBuf};

use anyhow::Result;

use certsmith_engine::orchestrator::{self, InspectReport};
use certsmith_engine::ModuleBridge;
use certsmith_runtime::SandboxConfig;

/// Execute the `inspect` command: describe a certificate, optionally
/// confirming that a private key belongs to it.
pub async fn execute(
    cert: &Path,
    key: Option<&Path>,
    wasm: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let bridge = match wasm {
        Some(path) => ModuleBridge::sandbox(path, SandboxConfig::default()),
        None => ModuleBridge::native(),
    };

    let report = orchestrator::inspect_files(&bridge, cert, key).await?;
    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &InspectReport) {
    let record = &report.certificate;
    println!("Subject:           {}", record.subject_name);
    println!("  CA:              {}", if record.is_ca { "yes" } else { "no" });
    if record.subject_key_id.is_empty() {
        println!("  Subject key id:  (none)");
    } else {
        println!("  Subject key id:  {}", record.subject_key_id_hex());
    }
    if report.key_pem.is_some() {
        println!("  Private key:     matches");
    }
}

fn print_json(report: &InspectReport) -> Result<()> {
    let value = serde_json::json!({
        "subject_name": report.certificate.subject_name,
        "is_ca": report.certificate.is_ca,
        "subject_key_id": report.certificate.subject_key_id_hex(),
        "key_matches": report.key_pem.as_ref().map(|_| true),
        "cert_pem": report.certificate.cert_pem,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
