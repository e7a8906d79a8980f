//! Migration version identifiers
//!
//! A version is a 14-digit `YYYYMMDDHHMMSS` timestamp. Because every version
//! has the same width, comparing the strings compares the timestamps, so the
//! derived `Ord` is chronological order.

use crate::errors::{MigrationError, Result};
use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

const VERSION_FORMAT: &str = "%Y%m%d%H%M%S";
pub const VERSION_LEN: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(String);

impl Version {
    /// Parse and validate a version identifier
    ///
    /// Rejects anything that is not exactly 14 ASCII digits forming a real
    /// calendar timestamp.
    pub fn parse(value: &str) -> Result<Self> {
        Self::timestamp_of(value)
            .map(|_| Self(value.to_string()))
            .ok_or_else(|| {
                MigrationError::InvalidVersion {
                    value: value.to_string(),
                }
                .into()
            })
    }

    /// Version for the current UTC second, as used when scaffolding
    pub fn now() -> Self {
        Self::from_timestamp(chrono::Utc::now().naive_utc())
    }

    pub fn from_timestamp(ts: NaiveDateTime) -> Self {
        Self(ts.format(VERSION_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The timestamp this version encodes
    pub fn timestamp(&self) -> NaiveDateTime {
        // Constructors only admit strings that parsed.
        Self::timestamp_of(&self.0).unwrap_or_default()
    }

    fn timestamp_of(value: &str) -> Option<NaiveDateTime> {
        if value.len() != VERSION_LEN || !value.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDateTime::parse_from_str(value, VERSION_FORMAT).ok()
    }
}

impl FromStr for Version {
    type Err = crate::errors::ExError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use proptest::prelude::*;

    #[test]
    fn test_parse_valid_version() {
        let v = Version::parse("20230102030405").unwrap();
        assert_eq!(v.as_str(), "20230102030405");
        assert_eq!(
            v.timestamp().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2023-01-02 03:04:05"
        );
    }

    #[test]
    fn test_rejects_wrong_length_and_non_digits() {
        for bad in ["2023010203040", "202301020304055", "2023010203040a", "", " 20230102030405"] {
            let err = Version::parse(bad).unwrap_err();
            assert_eq!(err.kind(), ExErrorKind::Configuration);
        }
    }

    #[test]
    fn test_rejects_impossible_calendar_values() {
        assert!(Version::parse("20231301000000").is_err());
        assert!(Version::parse("20230230000000").is_err());
        assert!(Version::parse("20230101250000").is_err());
    }

    #[test]
    fn test_now_round_trips_through_parse() {
        let now = Version::now();
        assert_eq!(Version::parse(now.as_str()).unwrap(), now);
    }

    proptest! {
        #[test]
        fn prop_string_order_is_chronological(
            a in 0i64..4_000_000_000,
            b in 0i64..4_000_000_000,
        ) {
            let ta = chrono::DateTime::from_timestamp(a, 0).unwrap().naive_utc();
            let tb = chrono::DateTime::from_timestamp(b, 0).unwrap().naive_utc();
            let va = Version::from_timestamp(ta);
            let vb = Version::from_timestamp(tb);
            prop_assert_eq!(va.cmp(&vb), ta.cmp(&tb));
        }
    }
}
