//! Settings YAML parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::types::SettingsConfig;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut missing = Vec::new();
    let result = ENV_VAR_RE.replace_all(input, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        std::env::var(name).unwrap_or_else(|_| {
            if !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
            String::new()
        })
    });

    if !missing.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }
    Ok(result.into_owned())
}

/// Parse a settings YAML string (after env var substitution).
///
/// # Errors
///
/// Returns an error if env var substitution fails or the YAML is invalid.
pub fn parse_settings_str(yaml_str: &str) -> Result<SettingsConfig> {
    let substituted = substitute_env_vars(yaml_str)?;
    serde_yaml::from_str(&substituted).context("Failed to parse settings YAML")
}

/// Parse a settings YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn parse_settings(path: &Path) -> Result<SettingsConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    parse_settings_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{AuthorityMode, ModuleBackend};
    use certsmith_types::protocol::{KeyAlgorithm, SanType};

    #[test]
    fn env_var_substitution() {
        std::env::set_var("CERTSMITH_TEST_HOST", "svc.example.com");
        let input = "value: ${CERTSMITH_TEST_HOST}\nother: ${CERTSMITH_TEST_HOST}";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "value: svc.example.com\nother: svc.example.com");
        std::env::remove_var("CERTSMITH_TEST_HOST");
    }

    #[test]
    fn missing_env_vars_are_all_reported() {
        let err = substitute_env_vars("a: ${CERTSMITH_NOPE_ONE}\nb: ${CERTSMITH_NOPE_TWO}")
            .unwrap_err()
            .to_string();
        assert!(err.contains("CERTSMITH_NOPE_ONE"));
        assert!(err.contains("CERTSMITH_NOPE_TWO"));
    }

    #[test]
    fn text_without_vars_is_unchanged() {
        let input = "subject: \"CN=$literal, O={braces}\"";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn parse_full_settings() {
        let yaml = r#"
version: "1.0"
module:
  backend: wasm
  path: ./sign.wasm
  max_memory: 128mb
authority:
  mode: files
  cert: ./ca.crt
  key: ./ca.key
certificate:
  subject: "O=Acme"
  san:
    - { type: dns, value: localhost }
    - { type: ip, value: 127.0.0.1 }
  key_algorithm: rsa-2048
output: ./out
"#;
        let config = parse_settings_str(yaml).unwrap();
        assert_eq!(config.module.backend, ModuleBackend::Wasm);
        assert_eq!(config.module.max_memory.as_deref(), Some("128mb"));
        assert_eq!(config.authority.mode, AuthorityMode::Files);
        assert_eq!(config.certificate.san.len(), 2);
        assert_eq!(config.certificate.san[1].kind, SanType::Ip);
        assert_eq!(config.certificate.key_algorithm, KeyAlgorithm::Rsa2048);
    }

    #[test]
    fn invalid_yaml_has_context() {
        let err = parse_settings_str("version: [").unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings YAML"));
    }

    #[test]
    fn missing_file_has_context() {
        let err = parse_settings(Path::new("/nonexistent/certsmith.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read settings file"));
    }
}
