// tests/telemetry.rs
//
// Scrape outcomes as seen by a metrics recorder. The recorder is installed
// thread-locally; #[tokio::test] runs on a current-thread runtime so every
// task records into it.

mod common;

use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use metrics_util::MetricKind;
use tokio_util::sync::CancellationToken;

use helm_repo_exporter::ingest::providers::FixtureFetcher;
use helm_repo_exporter::ingest::types::FetchError;
use helm_repo_exporter::ingest::{Scheduler, SchedulerCfg, StatusBoard};
use helm_repo_exporter::merge::Merger;
use helm_repo_exporter::metrics::{self as exporter_metrics, Metrics, PrometheusSink};
use helm_repo_exporter::publish::{LogSink, Sink, SinkMux};

fn scheduler(fetcher: FixtureFetcher, names: &[&str]) -> Scheduler {
    let sources: Vec<_> = names.iter().map(|n| common::source(n, 60)).collect();
    let status = Arc::new(StatusBoard::new(
        sources.iter().map(|s| (s.name.as_str(), s.url.as_str())),
    ));
    let sink: Arc<dyn Sink> = Arc::new(
        SinkMux::new()
            .with(Arc::new(PrometheusSink::new()))
            .with(Arc::new(LogSink)),
    );
    Scheduler::new(
        sources,
        Arc::new(fetcher),
        Arc::new(Merger::new()),
        sink,
        status,
        SchedulerCfg {
            scan_timeout: Duration::from_secs(5),
            queue_capacity: 8,
        },
    )
}

type Entry = (MetricKind, String, Vec<(String, String)>, DebugValue);

fn entries(recorder: &DebuggingRecorder) -> Vec<Entry> {
    recorder
        .snapshotter()
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(ck, _unit, _desc, value)| {
            let (kind, key) = ck.into_parts();
            let labels = key
                .labels()
                .map(|l| (l.key().to_string(), l.value().to_string()))
                .collect();
            (kind, key.name().to_string(), labels, value)
        })
        .collect()
}

fn find<'a>(all: &'a [Entry], name: &str, repo: Option<&str>) -> Option<&'a DebugValue> {
    all.iter()
        .find(|(_, n, labels, _)| {
            n == name
                && match repo {
                    Some(r) => labels.iter().any(|(k, v)| k == "repository" && v == r),
                    None => labels.is_empty(),
                }
        })
        .map(|(_, _, _, v)| v)
}

#[tokio::test]
async fn scrape_outcomes_reach_the_recorder() {
    let recorder = DebuggingRecorder::new();
    let _guard = metrics::set_default_local_recorder(&recorder);

    let fetcher = FixtureFetcher::new()
        .with_body("bitnami", common::fixture("bitnami.yaml"))
        .with_failure(
            "flaky",
            FetchError::Network {
                url: "https://flaky.example.com/index.yaml".into(),
                message: "connection refused".into(),
            },
        );
    let sched = scheduler(fetcher, &["bitnami", "flaky"]);
    sched.warm_up(&CancellationToken::new()).await;

    let all = entries(&recorder);

    assert_eq!(
        find(&all, exporter_metrics::SCRAPE_ERRORS, Some("flaky")),
        Some(&DebugValue::Counter(1))
    );
    assert!(find(&all, exporter_metrics::SCRAPE_ERRORS, Some("bitnami")).is_none());

    assert!(find(&all, exporter_metrics::LAST_SCRAPE_SUCCESS, Some("bitnami")).is_some());
    assert!(find(&all, exporter_metrics::LAST_SCRAPE_SUCCESS, Some("flaky")).is_none());

    match find(&all, exporter_metrics::CHARTS_TOTAL, Some("bitnami")) {
        Some(DebugValue::Gauge(v)) => assert_eq!(v.into_inner(), 2.0),
        other => panic!("unexpected charts_total: {other:?}"),
    }
    match find(&all, exporter_metrics::MERGED_VERSIONS_TOTAL, None) {
        Some(DebugValue::Gauge(v)) => assert_eq!(v.into_inner(), 5.0),
        other => panic!("unexpected merged_versions_total: {other:?}"),
    }

    for repo in ["bitnami", "flaky"] {
        match find(&all, exporter_metrics::SCRAPE_DURATION, Some(repo)) {
            Some(DebugValue::Histogram(samples)) => assert_eq!(samples.len(), 1),
            other => panic!("missing duration for {repo}: {other:?}"),
        }
    }

    // per-chart series carry both labels
    assert!(all.iter().any(|(_, n, labels, _)| {
        n == exporter_metrics::CHART_AGE_NEWEST
            && labels.contains(&("chart".to_string(), "redis".to_string()))
    }));
}

#[tokio::test]
async fn prometheus_text_uses_exporter_names() {
    let (recorder, exporter) = Metrics::detached().expect("recorder");
    let _guard = metrics::set_default_local_recorder(&recorder);

    let fetcher = FixtureFetcher::new().with_body("bitnami", common::fixture("bitnami.yaml"));
    scheduler(fetcher, &["bitnami"])
        .warm_up(&CancellationToken::new())
        .await;

    let text = exporter.render();
    for needle in [
        r#"helm_repo_charts_total{repository="bitnami"} 2"#,
        r#"helm_repo_versions_total{repository="bitnami"} 5"#,
        r#"helm_repo_chart_versions{repository="bitnami",chart="nginx"} 3"#,
        "helm_repo_scrape_duration_seconds_bucket",
        "helm_repo_last_scrape_success",
        "helm_repo_merged_charts_total 2",
    ] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }
}
