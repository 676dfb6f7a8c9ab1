//! Distinguished-name strings such as `C=NL, O=Example, CN=host`.
//!
//! Components are separated by commas; `\,` escapes a literal comma inside a
//! value. Attribute names are whatever OpenSSL accepts as short or long names.

use openssl::error::ErrorStack;
use openssl::x509::{X509Name, X509NameBuilder};

#[derive(Debug, thiserror::Error)]
pub(crate) enum DnError {
    #[error("component '{0}' is not of the form ATTR=value")]
    MissingEquals(String),

    #[error("attribute '{attr}' rejected: {source}")]
    Attribute {
        attr: String,
        #[source]
        source: ErrorStack,
    },

    #[error(transparent)]
    OpenSsl(#[from] ErrorStack),
}

/// Split a DN string into `(attribute, value)` pairs, trimming whitespace.
pub(crate) fn parse_components(dn: &str) -> Result<Vec<(String, String)>, DnError> {
    let mut components = Vec::new();
    for part in split_unescaped(dn) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (attr, value) = part
            .split_once('=')
            .ok_or_else(|| DnError::MissingEquals(part.to_owned()))?;
        let attr = attr.trim();
        if attr.is_empty() {
            return Err(DnError::MissingEquals(part.to_owned()));
        }
        components.push((attr.to_owned(), value.trim().replace("\\,", ",")));
    }
    Ok(components)
}

pub(crate) fn build_name(dn: &str) -> Result<X509Name, DnError> {
    let mut builder = X509NameBuilder::new()?;
    for (attr, value) in parse_components(dn)? {
        builder
            .append_entry_by_text(&attr, &value)
            .map_err(|source| DnError::Attribute { attr, source })?;
    }
    Ok(builder.build())
}

fn split_unescaped(dn: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in dn.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => {
                parts.push(&dn[start..i]);
                start = i + 1;
            }
            _ => escaped = false,
        }
    }
    parts.push(&dn[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims_components() {
        let parts = parse_components("C=NL, O=AAASELFSIGNED,OU=self-signed , CN=AAATESTCA").unwrap();
        assert_eq!(
            parts,
            vec![
                ("C".into(), "NL".into()),
                ("O".into(), "AAASELFSIGNED".into()),
                ("OU".into(), "self-signed".into()),
                ("CN".into(), "AAATESTCA".into()),
            ]
        );
    }

    #[test]
    fn escaped_comma_stays_in_value() {
        let parts = parse_components(r"O=Acme\, Inc, CN=x").unwrap();
        assert_eq!(parts[0], ("O".into(), "Acme, Inc".into()));
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn value_may_contain_equals() {
        let parts = parse_components("CN=a=b").unwrap();
        assert_eq!(parts, vec![("CN".into(), "a=b".into())]);
    }

    #[test]
    fn component_without_equals_is_rejected() {
        assert!(matches!(
            parse_components("CN=x, garbage"),
            Err(DnError::MissingEquals(p)) if p == "garbage"
        ));
    }

    #[test]
    fn unknown_attribute_fails_to_build() {
        assert!(matches!(
            build_name("NOPE=x"),
            Err(DnError::Attribute { attr, .. }) if attr == "NOPE"
        ));
    }

    #[test]
    fn builds_openssl_name() {
        let name = build_name("CN=leaf.example").unwrap();
        let cn = name
            .entries_by_nid(openssl::nid::Nid::COMMONNAME)
            .next()
            .unwrap();
        assert_eq!(cn.data().as_utf8().unwrap().to_string(), "leaf.example");
    }
}
