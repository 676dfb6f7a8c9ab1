use std::path::Path;

use anyhow::{Context, Result};

use certsmith_engine::config::types::AuthorityMode;
use certsmith_engine::orchestrator;

/// Execute the `check` command: parse and validate a settings file.
pub fn execute(settings_path: &Path) -> Result<()> {
    let config = orchestrator::check_settings(settings_path)
        .with_context(|| format!("Failed to check settings: {}", settings_path.display()))?;

    let authority = match config.authority.mode {
        AuthorityMode::SelfSigned => "self-signed",
        AuthorityMode::Generate => "generated",
        AuthorityMode::Files => "from files",
    };
    let subject = if config.certificate.subject.trim().is_empty() {
        "(from first SAN)"
    } else {
        config.certificate.subject.trim()
    };

    println!("Settings:          OK");
    println!("  Module backend:  {:?}", config.module.backend);
    println!("  Authority:       {authority}");
    println!("  Subject:         {subject}");
    println!("  SANs:            {}", config.certificate.san.len());
    println!("  Key algorithm:   {}", config.certificate.key_algorithm);
    Ok(())
}
