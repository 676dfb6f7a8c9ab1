use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::codec::DecodeError;

const FORMAT: &str = "%Y%m%d%H%M%S";

/// A UTC timestamp in the 14-digit `YYYYMMDDHHMMSS` wire form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidityTime(String);

impl ValidityTime {
    #[must_use]
    pub fn from_datetime(at: &DateTime<Utc>) -> Self {
        Self(at.format(FORMAT).to_string())
    }

    /// Accept a wire string after checking its shape.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidValidity`] unless the input is exactly 14 ASCII digits.
    pub fn parse(s: &str) -> Result<Self, DecodeError> {
        if s.len() == 14 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_owned()))
        } else {
            Err(DecodeError::InvalidValidity(s.to_owned()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret as a calendar time; `None` for impossible dates such as month 13.
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.0, FORMAT)
            .ok()
            .map(|n| n.and_utc())
    }
}

impl fmt::Display for ValidityTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
