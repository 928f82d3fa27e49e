// src/analyze/dates.rs
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Oldest / newest / median of a set of timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateStats {
    pub oldest: DateTime<Utc>,
    pub newest: DateTime<Utc>,
    pub median: DateTime<Utc>,
}

impl DateStats {
    /// Sorts `dates` in place and picks first, last and the upper-middle
    /// element (index `len / 2`). `None` for an empty slice.
    pub fn from_unsorted(dates: &mut [DateTime<Utc>]) -> Option<Self> {
        if dates.is_empty() {
            return None;
        }
        dates.sort_unstable();
        Some(Self {
            oldest: dates[0],
            newest: dates[dates.len() - 1],
            median: dates[dates.len() / 2],
        })
    }
}
