//! Semantic validation for parsed settings.

use std::net::IpAddr;

use anyhow::{bail, Result};
use certsmith_types::protocol::{ExtKeyUsage, KeyUsage, SanType, SubjectAltName};

use crate::config::types::{
    parse_byte_size, AuthorityMode, ModuleBackend, SettingsConfig, ValidityConfig,
    SUPPORTED_VERSION,
};

fn validate_validity(validity: &ValidityConfig, context: &str, errors: &mut Vec<String>) {
    match (validity.years, validity.not_before, validity.not_after) {
        (Some(0), _, _) => errors.push(format!("{context}: validity years must be > 0")),
        (Some(_), None, None) => {}
        (Some(_), _, _) => errors.push(format!(
            "{context}: validity takes either 'years' or 'not_before'/'not_after', not both"
        )),
        (None, Some(not_before), Some(not_after)) => {
            if not_after <= not_before {
                errors.push(format!("{context}: validity not_after must be after not_before"));
            }
        }
        (None, _, _) => errors.push(format!(
            "{context}: validity needs 'years' or both 'not_before' and 'not_after'"
        )),
    }
}

fn validate_usages(
    key_usage: &[String],
    ext_key_usage: &[String],
    context: &str,
    errors: &mut Vec<String>,
) {
    for name in key_usage {
        if KeyUsage::from_snake_name(name).is_none() {
            errors.push(format!("{context}: unknown key usage '{name}'"));
        }
    }
    for name in ext_key_usage {
        if ExtKeyUsage::from_snake_name(name).is_none() {
            errors.push(format!("{context}: unknown extended key usage '{name}'"));
        }
    }
}

fn validate_sans(sans: &[SubjectAltName], errors: &mut Vec<String>) {
    for (i, san) in sans.iter().enumerate() {
        let value = san.value.trim();
        if value.is_empty() {
            errors.push(format!("certificate.san[{i}]: value must not be empty"));
        } else if san.kind == SanType::Ip && value.parse::<IpAddr>().is_err() {
            errors.push(format!(
                "certificate.san[{i}]: '{}' is not an IP address",
                san.value
            ));
        }
    }
}

/// Validate a parsed settings file.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns an error listing every problem found.
pub fn validate_settings(config: &SettingsConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != SUPPORTED_VERSION {
        errors.push(format!(
            "Unsupported settings version '{}' (expected '{SUPPORTED_VERSION}')",
            config.version
        ));
    }

    // Module
    if config.module.backend == ModuleBackend::Wasm && config.module.path.is_none() {
        errors.push("module: the wasm backend requires 'path'".to_string());
    }
    if let Some(ref mem) = config.module.max_memory {
        if parse_byte_size(mem).is_err() {
            errors.push(format!("module: invalid max_memory '{mem}'"));
        }
    }

    // Authority
    let authority = &config.authority;
    match authority.mode {
        AuthorityMode::Files => {
            if authority.cert.is_none() {
                errors.push("authority: files mode requires 'cert'".to_string());
            }
            if authority.key.is_none() {
                errors.push("authority: files mode requires 'key'".to_string());
            }
        }
        AuthorityMode::Generate => {
            validate_validity(&authority.validity, "authority", &mut errors);
            validate_usages(
                &authority.key_usage,
                &authority.ext_key_usage,
                "authority",
                &mut errors,
            );
        }
        AuthorityMode::SelfSigned => {}
    }

    // Certificate
    let cert = &config.certificate;
    if cert.subject.trim().is_empty() && cert.san.is_empty() {
        errors.push("certificate: needs a subject or at least one san".to_string());
    }
    validate_sans(&cert.san, &mut errors);
    validate_validity(&cert.validity, "certificate", &mut errors);
    validate_usages(&cert.key_usage, &cert.ext_key_usage, "certificate", &mut errors);

    if !errors.is_empty() {
        bail!("Settings validation failed:\n  - {}", errors.join("\n  - "));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_settings_str;

    fn base_yaml() -> String {
        r#"
version: "1.0"
certificate:
  subject: "CN=svc.example"
"#
        .to_string()
    }

    fn errors_of(yaml: &str) -> String {
        let config = parse_settings_str(yaml).unwrap();
        validate_settings(&config).unwrap_err().to_string()
    }

    #[test]
    fn minimal_settings_are_valid() {
        let config = parse_settings_str(&base_yaml()).unwrap();
        assert!(validate_settings(&config).is_ok());
    }

    #[test]
    fn wrong_version() {
        let yaml = base_yaml().replace("\"1.0\"", "\"2.0\"");
        assert!(errors_of(&yaml).contains("Unsupported settings version '2.0'"));
    }

    #[test]
    fn wasm_needs_path_and_valid_memory() {
        let yaml = format!("{}module:\n  backend: wasm\n  max_memory: lots\n", base_yaml());
        let err = errors_of(&yaml);
        assert!(err.contains("requires 'path'"));
        assert!(err.contains("invalid max_memory 'lots'"));
    }

    #[test]
    fn files_mode_needs_both_paths() {
        let yaml = format!("{}authority:\n  mode: files\n  cert: ca.crt\n", base_yaml());
        let err = errors_of(&yaml);
        assert!(err.contains("requires 'key'"));
        assert!(!err.contains("requires 'cert'"));
    }

    #[test]
    fn leaf_needs_subject_or_san() {
        let err = errors_of("version: \"1.0\"\ncertificate:\n  subject: \"  \"\n");
        assert!(err.contains("needs a subject or at least one san"));
    }

    #[test]
    fn bad_sans_are_reported_by_index() {
        let yaml = r#"
version: "1.0"
certificate:
  san:
    - { type: dns, value: ok.example }
    - { type: ip, value: not-an-ip }
    - { type: email, value: "" }
"#;
        let err = errors_of(yaml);
        assert!(err.contains("certificate.san[1]: 'not-an-ip' is not an IP address"));
        assert!(err.contains("certificate.san[2]: value must not be empty"));
    }

    #[test]
    fn validity_rules() {
        let zero = format!("{}  validity: {{ years: 0 }}\n", base_yaml());
        assert!(errors_of(&zero).contains("years must be > 0"));

        let backwards = format!(
            "{}  validity: {{ not_before: \"2026-01-01T00:00:00Z\", not_after: \"2025-01-01T00:00:00Z\" }}\n",
            base_yaml()
        );
        assert!(errors_of(&backwards).contains("not_after must be after not_before"));

        let half = format!(
            "{}  validity: {{ not_before: \"2026-01-01T00:00:00Z\" }}\n",
            base_yaml()
        );
        assert!(errors_of(&half).contains("needs 'years' or both"));

        let both = format!(
            "{}  validity: {{ years: 1, not_after: \"2030-01-01T00:00:00Z\" }}\n",
            base_yaml()
        );
        assert!(errors_of(&both).contains("not both"));
    }

    #[test]
    fn unknown_usages() {
        let yaml = format!(
            "{}  key_usage: [digital_signature, sign_everything]\n  ext_key_usage: [server_auth, teleport]\n",
            base_yaml()
        );
        let err = errors_of(&yaml);
        assert!(err.contains("unknown key usage 'sign_everything'"));
        assert!(err.contains("unknown extended key usage 'teleport'"));
    }

    #[test]
    fn all_errors_are_collected() {
        let yaml = r#"
version: "0.9"
module:
  backend: wasm
authority:
  mode: files
certificate:
  subject: ""
"#;
        let err = errors_of(yaml);
        assert!(err.starts_with("Settings validation failed:"));
        assert_eq!(err.matches("\n  - ").count(), 5);
    }
}
