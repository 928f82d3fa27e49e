// src/config/duration.rs
use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Parse a Go-style duration (`250ms`, `30s`, `5m`, `1h30m`) or a bare
/// integer number of seconds.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let s = raw.trim();
    if s.is_empty() {
        bail!("empty duration");
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| anyhow!("missing unit in duration '{raw}'"))?;
        if digits == 0 {
            bail!("invalid duration '{raw}'");
        }
        let value: f64 = rest[..digits]
            .parse()
            .map_err(|_| anyhow!("invalid number in duration '{raw}'"))?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_nanos: f64 = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            other => bail!("unknown unit '{other}' in duration '{raw}'"),
        };
        rest = &rest[unit_len..];
        total += Duration::from_nanos((value * unit_nanos).round() as u64);
    }
    Ok(total)
}

/// Serde helper for optional duration fields written as strings or seconds.
pub(crate) fn de_opt_duration<'de, D>(de: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(de)? {
        None => Ok(None),
        Some(Raw::Secs(s)) => Ok(Some(Duration::from_secs(s))),
        Some(Raw::Text(t)) => parse_duration(&t)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
