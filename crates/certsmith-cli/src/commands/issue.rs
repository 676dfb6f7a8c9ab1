use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use certsmith_engine::orchestrator;
use certsmith_engine::resolve;

use super::settings_dir;

/// Execute the `issue` command: issue a bundle and write it as a ZIP archive.
pub async fn execute(settings_path: &Path, output: Option<&Path>) -> Result<()> {
    // 1. Parse and validate settings
    let config = orchestrator::check_settings(settings_path)
        .with_context(|| format!("Failed to load settings: {}", settings_path.display()))?;
    let base_dir = settings_dir(settings_path);

    // 2. Issue
    let bridge = resolve::build_bridge(&config.module, &base_dir)?;
    let bundle = orchestrator::issue_from_config(&config, &base_dir, &bridge, Utc::now()).await?;

    // 3. Write archive
    let target = orchestrator::output_target(&config, &base_dir, output);
    let path = orchestrator::write_bundle(&bundle, target.as_deref()).await?;

    println!("Issued '{}'", bundle.certificate.certificate.subject_name);
    if let Some(authority) = &bundle.authority {
        println!("  Signed by:       {}", authority.certificate.subject_name);
    } else {
        println!("  Signed by:       (self-signed)");
    }
    println!(
        "  Subject key id:  {}",
        bundle.certificate.certificate.subject_key_id_hex()
    );
    println!("  Archive:         {}", path.display());
    Ok(())
}
