// src/analyze/mod.rs
//! Statistics engine: turns a parsed [`IndexDocument`] into per-chart and
//! corpus-wide version-age statistics.
//!
//! Pure and deterministic: no I/O, no wall clock. Output is sorted by chart
//! name so metric labels and dashboard ordering are stable across scrapes.

pub mod dates;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::index::IndexDocument;

pub use crate::analyze::dates::DateStats;

/// Dashboard detail for one version of a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionDetail {
    pub version: String,
    pub created: Option<DateTime<Utc>>,
    /// First download URL listed for the version, if any.
    pub url: Option<String>,
}

/// Statistics for one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSummary {
    pub name: String,
    pub version_count: usize,
    /// Version strings in document order.
    pub versions: Vec<String>,
    pub version_details: Vec<VersionDetail>,
    /// Only over versions carrying a timestamp; `None` if none do.
    pub dates: Option<DateStats>,
    pub icon: String,
    pub description: String,
    /// Repository the chart was scraped from, when attributed.
    pub source: Option<String>,
}

/// Statistics over one scrape of one or more sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusAnalysis {
    pub total_charts: usize,
    pub total_versions: usize,
    pub charts: Vec<ChartSummary>,
    pub dates: Option<DateStats>,
}

/// Analyze a document without source attribution.
pub fn analyze(doc: &IndexDocument) -> CorpusAnalysis {
    build(doc, None)
}

/// Analyze a document and tag every chart with `source`.
pub fn analyze_with_source(doc: &IndexDocument, source: &str) -> CorpusAnalysis {
    build(doc, Some(source))
}

fn build(doc: &IndexDocument, source: Option<&str>) -> CorpusAnalysis {
    let mut charts = Vec::with_capacity(doc.entries.len());
    let mut all_dates: Vec<DateTime<Utc>> = Vec::new();
    let mut total_versions = 0usize;

    for (name, versions) in &doc.entries {
        if versions.is_empty() {
            continue;
        }

        let mut summary = ChartSummary {
            name: name.clone(),
            version_count: versions.len(),
            versions: Vec::with_capacity(versions.len()),
            version_details: Vec::with_capacity(versions.len()),
            dates: None,
            icon: String::new(),
            description: String::new(),
            source: source.map(str::to_string),
        };

        let mut dates = Vec::with_capacity(versions.len());
        for v in versions {
            total_versions += 1;
            summary.versions.push(v.version.clone());

            let created = v.timestamp();
            if let Some(t) = created {
                dates.push(t);
                all_dates.push(t);
            }
            summary.version_details.push(VersionDetail {
                version: v.version.clone(),
                created,
                url: v.urls.first().cloned(),
            });

            // first non-empty wins, in document order
            if summary.icon.is_empty() && !v.icon.is_empty() {
                summary.icon = v.icon.clone();
            }
            if summary.description.is_empty() && !v.description.is_empty() {
                summary.description = v.description.clone();
            }
        }

        summary.dates = DateStats::from_unsorted(&mut dates);
        charts.push(summary);
    }

    // BTreeMap iteration is already name-ordered; keep the sort explicit.
    charts.sort_by(|a, b| a.name.cmp(&b.name));

    CorpusAnalysis {
        total_charts: charts.len(),
        total_versions,
        charts,
        dates: DateStats::from_unsorted(&mut all_dates),
    }
}
