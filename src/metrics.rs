// src/metrics.rs
//! Prometheus exposition of scrape outcomes and chart statistics.
//!
//! Timestamps are exported as unix seconds. Age gauges are only written when
//! the underlying statistic exists, so charts without any dated version never
//! produce a zero-valued series.

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;

use crate::analyze::{CorpusAnalysis, DateStats};
use crate::publish::{Scope, Sink};

pub const CHARTS_TOTAL: &str = "helm_repo_charts_total";
pub const VERSIONS_TOTAL: &str = "helm_repo_versions_total";
pub const CHART_VERSIONS: &str = "helm_repo_chart_versions";
pub const CHART_AGE_OLDEST: &str = "helm_repo_chart_age_oldest_seconds";
pub const CHART_AGE_NEWEST: &str = "helm_repo_chart_age_newest_seconds";
pub const CHART_AGE_MEDIAN: &str = "helm_repo_chart_age_median_seconds";
pub const OVERALL_AGE_OLDEST: &str = "helm_repo_overall_age_oldest_seconds";
pub const OVERALL_AGE_NEWEST: &str = "helm_repo_overall_age_newest_seconds";
pub const OVERALL_AGE_MEDIAN: &str = "helm_repo_overall_age_median_seconds";
pub const SCRAPE_DURATION: &str = "helm_repo_scrape_duration_seconds";
pub const SCRAPE_ERRORS: &str = "helm_repo_scrape_errors_total";
pub const LAST_SCRAPE_SUCCESS: &str = "helm_repo_last_scrape_success";
pub const MERGED_CHARTS_TOTAL: &str = "helm_repo_merged_charts_total";
pub const MERGED_VERSIONS_TOTAL: &str = "helm_repo_merged_versions_total";

/// Prometheus client default buckets.
const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

pub struct Metrics {
    pub handle: PrometheusHandle,
}

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(SCRAPE_DURATION.to_string()), &DEFAULT_BUCKETS)
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = builder()?.install_recorder()?;
        describe_metrics();
        Ok(Self { handle })
    }

    /// Recorder that is not installed globally, plus its handle. Tests pair
    /// this with `metrics::with_local_recorder`.
    pub fn detached() -> anyhow::Result<(metrics_exporter_prometheus::PrometheusRecorder, Self)> {
        let recorder = builder()?.build_recorder();
        let handle = recorder.handle();
        Ok((recorder, Self { handle }))
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// One-time metric descriptions (so HELP/TYPE lines show up on scrape).
pub fn describe_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_gauge!(
            CHARTS_TOTAL,
            "Total number of distinct Helm charts in the repository"
        );
        describe_gauge!(
            VERSIONS_TOTAL,
            "Total number of chart versions in the repository"
        );
        describe_gauge!(CHART_VERSIONS, "Number of versions for each Helm chart");
        describe_gauge!(
            CHART_AGE_OLDEST,
            "Timestamp of the oldest version of each chart"
        );
        describe_gauge!(
            CHART_AGE_NEWEST,
            "Timestamp of the newest version of each chart"
        );
        describe_gauge!(
            CHART_AGE_MEDIAN,
            "Timestamp of the median version of each chart"
        );
        describe_gauge!(
            OVERALL_AGE_OLDEST,
            "Timestamp of the oldest chart version in the repository"
        );
        describe_gauge!(
            OVERALL_AGE_NEWEST,
            "Timestamp of the newest chart version in the repository"
        );
        describe_gauge!(
            OVERALL_AGE_MEDIAN,
            "Timestamp of the median chart version in the repository"
        );
        describe_histogram!(
            SCRAPE_DURATION,
            metrics::Unit::Seconds,
            "Duration of the repository scrape operation in seconds"
        );
        describe_counter!(SCRAPE_ERRORS, "Total number of scrape errors per repository");
        describe_gauge!(
            LAST_SCRAPE_SUCCESS,
            "Timestamp of the last successful scrape per repository"
        );
        describe_gauge!(
            MERGED_CHARTS_TOTAL,
            "Total number of charts across all repositories"
        );
        describe_gauge!(
            MERGED_VERSIONS_TOTAL,
            "Total number of chart versions across all repositories"
        );
    });
}

/// [`Sink`] writing through the `metrics` facade. Whatever recorder is
/// current when a method runs receives the values.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusSink;

impl PrometheusSink {
    pub fn new() -> Self {
        describe_metrics();
        Self
    }
}

fn set_repo_dates(repository: &str, dates: &DateStats) {
    let repo = repository.to_string();
    gauge!(OVERALL_AGE_OLDEST, "repository" => repo.clone()).set(dates.oldest.timestamp() as f64);
    gauge!(OVERALL_AGE_NEWEST, "repository" => repo.clone()).set(dates.newest.timestamp() as f64);
    gauge!(OVERALL_AGE_MEDIAN, "repository" => repo).set(dates.median.timestamp() as f64);
}

impl Sink for PrometheusSink {
    fn record_success(&self, source: &str) {
        gauge!(LAST_SCRAPE_SUCCESS, "repository" => source.to_string())
            .set(Utc::now().timestamp() as f64);
    }

    fn record_error(&self, source: &str) {
        counter!(SCRAPE_ERRORS, "repository" => source.to_string()).increment(1);
    }

    fn record_duration(&self, source: &str, elapsed: Duration) {
        histogram!(SCRAPE_DURATION, "repository" => source.to_string())
            .record(elapsed.as_secs_f64());
    }

    fn publish(&self, scope: &Scope, analysis: &CorpusAnalysis) {
        let repo = match scope {
            Scope::Composite => {
                gauge!(MERGED_CHARTS_TOTAL).set(analysis.total_charts as f64);
                gauge!(MERGED_VERSIONS_TOTAL).set(analysis.total_versions as f64);
                return;
            }
            Scope::Source(name) => name,
        };

        gauge!(CHARTS_TOTAL, "repository" => repo.clone()).set(analysis.total_charts as f64);
        gauge!(VERSIONS_TOTAL, "repository" => repo.clone()).set(analysis.total_versions as f64);

        for chart in &analysis.charts {
            let labels = [
                ("repository", repo.clone()),
                ("chart", chart.name.clone()),
            ];
            gauge!(CHART_VERSIONS, &labels).set(chart.version_count as f64);
            if let Some(d) = &chart.dates {
                gauge!(CHART_AGE_OLDEST, &labels).set(d.oldest.timestamp() as f64);
                gauge!(CHART_AGE_NEWEST, &labels).set(d.newest.timestamp() as f64);
                gauge!(CHART_AGE_MEDIAN, &labels).set(d.median.timestamp() as f64);
            }
        }

        if let Some(d) = &analysis.dates {
            set_repo_dates(repo, d);
        }
    }
}
