//! # Multi-Source Merger
//! Caches the latest [`CorpusAnalysis`] per source and folds them into the
//! published merged view read by the dashboard.
//!
//! - Chart/version totals are exact sums.
//! - Chart lists are concatenated, then stable-sorted by name; charts sharing
//!   a name keep fold order.
//! - Merged oldest/newest are exact min/max over sources.
//! - Merged median is the pairwise average (unix seconds) of each source's
//!   median, folded in source-name order. This is an approximation and it
//!   depends on fold order; computing the true pooled median would mean
//!   keeping and re-sorting every timestamp on each update.
//!
//! The view is swapped as a whole `Arc` under a write lock held only for the
//! pointer replacement; readers always see a complete snapshot.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use crate::analyze::{CorpusAnalysis, DateStats};

/// What the caller is handing to [`Merger::update`].
#[derive(Debug, Clone)]
pub enum MergeInput {
    /// Latest analysis of one source; replaces its cache slot and refolds.
    SingleSource {
        source: String,
        analysis: Arc<CorpusAnalysis>,
    },
    /// Already-merged (or single, un-cached) view; replaces the published
    /// view wholesale and leaves the per-source cache untouched.
    Composite { analysis: Arc<CorpusAnalysis> },
}

#[derive(Debug, Default)]
pub struct Merger {
    cache: Mutex<BTreeMap<String, Arc<CorpusAnalysis>>>,
    view: RwLock<Option<Arc<CorpusAnalysis>>>,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an update and return the newly published view.
    pub fn update(&self, input: MergeInput) -> Arc<CorpusAnalysis> {
        let next = match input {
            MergeInput::SingleSource { source, analysis } => {
                let mut cache = self.cache.lock().expect("merger cache mutex poisoned");
                cache.insert(source, analysis);
                Arc::new(merge_all(cache.values().map(Arc::as_ref)))
            }
            MergeInput::Composite { analysis } => analysis,
        };

        let mut guard = self.view.write().expect("merged view rwlock poisoned");
        *guard = Some(next.clone());
        next
    }

    /// Current published view; `None` until the first update.
    pub fn view(&self) -> Option<Arc<CorpusAnalysis>> {
        self.view
            .read()
            .expect("merged view rwlock poisoned")
            .clone()
    }

    /// Cached analysis for one source.
    pub fn cached(&self, source: &str) -> Option<Arc<CorpusAnalysis>> {
        self.cache
            .lock()
            .expect("merger cache mutex poisoned")
            .get(source)
            .cloned()
    }

    /// Names of sources with a cached analysis, in fold order.
    pub fn sources(&self) -> Vec<String> {
        self.cache
            .lock()
            .expect("merger cache mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

/// Fold analyses in iteration order. An empty iterator yields an empty view.
pub fn merge_all<'a, I>(analyses: I) -> CorpusAnalysis
where
    I: IntoIterator<Item = &'a CorpusAnalysis>,
{
    let mut merged = CorpusAnalysis::default();
    let mut dates: Option<DateStats> = None;

    for a in analyses {
        merged.total_charts += a.total_charts;
        merged.total_versions += a.total_versions;
        merged.charts.extend(a.charts.iter().cloned());
        dates = match (dates, a.dates) {
            (Some(acc), Some(next)) => Some(fold_dates(acc, next)),
            (acc, next) => acc.or(next),
        };
    }

    // stable: ties keep fold order
    merged.charts.sort_by(|a, b| a.name.cmp(&b.name));
    merged.dates = dates;
    merged
}

fn fold_dates(acc: DateStats, next: DateStats) -> DateStats {
    DateStats {
        oldest: acc.oldest.min(next.oldest),
        newest: acc.newest.max(next.newest),
        median: average_seconds(acc.median, next.median),
    }
}

fn average_seconds(a: DateTime<Utc>, b: DateTime<Utc>) -> DateTime<Utc> {
    let avg = (a.timestamp() + b.timestamp()) / 2;
    DateTime::from_timestamp(avg, 0).unwrap_or(a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::ChartSummary;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn corpus(names: &[&str], versions: usize, dates: Option<(i64, i64, i64)>) -> CorpusAnalysis {
        CorpusAnalysis {
            total_charts: names.len(),
            total_versions: versions,
            charts: names
                .iter()
                .map(|n| ChartSummary {
                    name: n.to_string(),
                    version_count: 1,
                    versions: vec!["1.0.0".into()],
                    version_details: vec![],
                    dates: None,
                    icon: String::new(),
                    description: String::new(),
                    source: None,
                })
                .collect(),
            dates: dates.map(|(o, m, n)| DateStats {
                oldest: ts(o),
                newest: ts(n),
                median: ts(m),
            }),
        }
    }

    #[test]
    fn median_is_pairwise_average() {
        let a = corpus(&["a"], 1, Some((0, 100, 200)));
        let b = corpus(&["b"], 1, Some((50, 301, 400)));
        let m = merge_all([&a, &b]);
        let d = m.dates.unwrap();
        assert_eq!(d.oldest, ts(0));
        assert_eq!(d.newest, ts(400));
        assert_eq!(d.median, ts(200)); // (100 + 301) / 2, truncated
    }

    #[test]
    fn sources_without_dates_do_not_disturb_stats() {
        let a = corpus(&["a"], 1, None);
        let b = corpus(&["b"], 1, Some((5, 6, 7)));
        let m = merge_all([&a, &b]);
        assert_eq!(m.dates.unwrap().median, ts(6));
        assert!(merge_all([&a]).dates.is_none());
    }

    #[test]
    fn composite_leaves_cache_alone() {
        let merger = Merger::new();
        merger.update(MergeInput::SingleSource {
            source: "s1".into(),
            analysis: Arc::new(corpus(&["a"], 2, None)),
        });
        let composite = Arc::new(corpus(&["x", "y", "z"], 9, None));
        let view = merger.update(MergeInput::Composite {
            analysis: composite.clone(),
        });
        assert!(Arc::ptr_eq(&view, &composite));
        assert_eq!(merger.sources(), vec!["s1".to_string()]);
        assert_eq!(merger.cached("s1").unwrap().total_versions, 2);
    }

    #[test]
    fn view_is_none_before_first_update() {
        assert!(Merger::new().view().is_none());
    }
}
