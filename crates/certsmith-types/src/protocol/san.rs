use serde::{Deserialize, Serialize};

use crate::codec::DecodeError;

/// Kind of a subject alternative name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanType {
    Dns,
    Ip,
    Email,
}

impl SanType {
    #[must_use]
    pub fn wire_value(self) -> u32 {
        match self {
            Self::Dns => 0,
            Self::Ip => 1,
            Self::Email => 2,
        }
    }

    /// # Errors
    ///
    /// Returns [`DecodeError::UnknownSanType`] for values other than 0, 1 and 2.
    pub fn from_wire(value: u32) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(Self::Dns),
            1 => Ok(Self::Ip),
            2 => Ok(Self::Email),
            other => Err(DecodeError::UnknownSanType(other)),
        }
    }
}

/// One subject alternative name entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectAltName {
    #[serde(rename = "type")]
    pub kind: SanType,
    pub value: String,
}

impl SubjectAltName {
    pub fn dns(value: impl Into<String>) -> Self {
        Self {
            kind: SanType::Dns,
            value: value.into(),
        }
    }

    pub fn ip(value: impl Into<String>) -> Self {
        Self {
            kind: SanType::Ip,
            value: value.into(),
        }
    }

    pub fn email(value: impl Into<String>) -> Self {
        Self {
            kind: SanType::Email,
            value: value.into(),
        }
    }
}
