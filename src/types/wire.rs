//! Wire encoding adapters
//!
//! Downstream consumers expect every complex value as a `{real, imag}` object
//! and every timestamp as an RFC-3339 string with nanosecond precision. These
//! adapters are used through `#[serde(with = "...")]` so the in-memory types
//! keep native `Complex64` / `DateTime<Utc>` fields.

use chrono::{DateTime, SecondsFormat, Utc};
use num_complex::Complex64;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One complex value as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexPair {
    pub real: f64,
    pub imag: f64,
}

impl From<Complex64> for ComplexPair {
    fn from(c: Complex64) -> Self {
        Self {
            real: c.re,
            imag: c.im,
        }
    }
}

impl From<ComplexPair> for Complex64 {
    fn from(p: ComplexPair) -> Self {
        Self::new(p.real, p.imag)
    }
}

/// `Vec<Complex64>` <-> `[{ "real": .., "imag": .. }, ...]`
pub mod complex_pairs {
    use super::*;
    use serde::ser::SerializeSeq;

    pub fn serialize<S>(values: &[Complex64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            seq.serialize_element(&ComplexPair::from(*v))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Complex64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pairs = Vec::<ComplexPair>::deserialize(deserializer)?;
        Ok(pairs.into_iter().map(Complex64::from).collect())
    }
}

/// `DateTime<Utc>` <-> RFC-3339 with 9 fractional digits, `Z` suffix.
pub mod rfc3339_nanos {
    use super::*;

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    /// Format a timestamp the way it goes on the wire.
    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    /// Parse any RFC-3339 timestamp (offsets are normalised to UTC).
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw.trim()).map(|dt| dt.with_timezone(&Utc))
    }
}
