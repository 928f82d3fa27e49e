//! # Index Parser
//! Decodes a Helm repository `index.yaml` into a typed chart → versions map.
//!
//! A document is accepted or rejected as a whole: any decode failure yields a
//! [`ParseError`] and nothing is extracted. Individual entries may lack a
//! `created` timestamp; those still count as versions downstream.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Errors raised while decoding an index document.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("index document is empty")]
    Empty,

    #[error("failed to parse index document: {0}")]
    Decode(#[from] serde_yaml::Error),
}

/// Parsed repository index. Keys of `entries` are unique chart names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    #[serde(rename = "apiVersion", default, deserialize_with = "lenient_string")]
    pub api_version: String,
    #[serde(default)]
    pub entries: BTreeMap<String, Vec<VersionRecord>>,
    #[serde(default)]
    pub generated: Option<DateTime<Utc>>,
}

/// One published version of a chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub icon: String,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub urls: Vec<String>,
}

impl VersionRecord {
    /// Creation time, or `None` when absent or set to the zero instant
    /// (`0001-01-01T00:00:00Z`) that Helm tooling writes for "unset".
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created.filter(|t| *t != zero_instant())
    }
}

/// Decode raw bytes into an [`IndexDocument`].
pub fn parse(bytes: &[u8]) -> Result<IndexDocument, ParseError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ParseError::Empty);
    }
    Ok(serde_yaml::from_slice(bytes)?)
}

fn zero_instant() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// Plain scalars such as `version: 1.10` keep their source text; `null` is empty.
fn lenient_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}
