// tests/merge_view.rs
mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};

use helm_repo_exporter::analyze::{analyze_with_source, ChartSummary, CorpusAnalysis, DateStats};
use helm_repo_exporter::index::parse;
use helm_repo_exporter::merge::{merge_all, MergeInput, Merger};

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

fn corpus(prefix: &str, charts: usize, versions: usize) -> CorpusAnalysis {
    CorpusAnalysis {
        total_charts: charts,
        total_versions: versions,
        charts: (0..charts)
            .map(|i| ChartSummary {
                name: format!("{prefix}-{i}"),
                version_count: 1,
                versions: vec!["1.0.0".into()],
                version_details: vec![],
                dates: None,
                icon: String::new(),
                description: String::new(),
                source: Some(prefix.to_string()),
            })
            .collect(),
        dates: None,
    }
}

fn single(source: &str, analysis: CorpusAnalysis) -> MergeInput {
    MergeInput::SingleSource {
        source: source.to_string(),
        analysis: Arc::new(analysis),
    }
}

#[test]
fn totals_are_summed_across_sources() {
    let merger = Merger::new();
    merger.update(single("source1", corpus("a", 2, 5)));
    let view = merger.update(single("source2", corpus("b", 3, 7)));

    assert_eq!(view.total_charts, 5);
    assert_eq!(view.total_versions, 12);
    assert_eq!(view.charts.len(), 5);
    assert!(Arc::ptr_eq(&view, &merger.view().unwrap()));
}

#[test]
fn repeated_update_replaces_slot() {
    let merger = Merger::new();
    merger.update(single("s1", corpus("a", 2, 5)));
    merger.update(single("s2", corpus("b", 1, 1)));
    let view = merger.update(single("s1", corpus("a", 4, 9)));
    assert_eq!(view.total_charts, 5);
    assert_eq!(view.total_versions, 10);
}

#[test]
fn merged_chart_list_is_sorted_and_attributed() {
    let bitnami = parse(common::fixture("bitnami.yaml").as_bytes()).unwrap();
    let stable = parse(common::fixture("stable.yaml").as_bytes()).unwrap();

    let merger = Merger::new();
    merger.update(MergeInput::SingleSource {
        source: "stable".into(),
        analysis: Arc::new(analyze_with_source(&stable, "stable")),
    });
    let view = merger.update(MergeInput::SingleSource {
        source: "bitnami".into(),
        analysis: Arc::new(analyze_with_source(&bitnami, "bitnami")),
    });

    let names: Vec<_> = view
        .charts
        .iter()
        .map(|c| (c.name.as_str(), c.source.as_deref().unwrap()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("grafana", "stable"),
            ("nginx", "bitnami"),
            ("nginx", "stable"),
            ("redis", "bitnami"),
            ("unset-dates", "stable"),
        ]
    );
}

#[test]
fn oldest_and_newest_are_exact_extremes() {
    let mut a = corpus("a", 1, 1);
    a.dates = Some(DateStats {
        oldest: ts(10),
        newest: ts(20),
        median: ts(15),
    });
    let mut b = corpus("b", 1, 1);
    b.dates = Some(DateStats {
        oldest: ts(5),
        newest: ts(18),
        median: ts(12),
    });
    let d = merge_all([&a, &b]).dates.unwrap();
    assert_eq!(d.oldest, ts(5));
    assert_eq!(d.newest, ts(20));
    assert!(d.oldest <= d.median && d.median <= d.newest);
    assert_eq!(d.median, ts(13));
}

#[test]
fn fold_order_follows_source_names() {
    // ((a + b) / 2 + c) / 2 with a < b < c by name, independent of update order
    let mk = |p: &str, m: i64| {
        let mut c = corpus(p, 1, 1);
        c.dates = Some(DateStats {
            oldest: ts(0),
            newest: ts(1_000),
            median: ts(m),
        });
        c
    };

    let first = Merger::new();
    first.update(single("c", mk("c", 400)));
    first.update(single("a", mk("a", 100)));
    let v1 = first.update(single("b", mk("b", 200)));

    let second = Merger::new();
    second.update(single("a", mk("a", 100)));
    second.update(single("b", mk("b", 200)));
    let v2 = second.update(single("c", mk("c", 400)));

    assert_eq!(v1.dates.unwrap().median, ts(275));
    assert_eq!(v1.dates, v2.dates);
}

#[test]
fn composite_replaces_view_but_not_cache() {
    let merger = Merger::new();
    merger.update(single("s1", corpus("a", 2, 2)));
    let composite = Arc::new(corpus("all", 7, 7));
    let view = merger.update(MergeInput::Composite {
        analysis: composite.clone(),
    });
    assert_eq!(view.total_charts, 7);
    assert_eq!(merger.cached("s1").unwrap().total_charts, 2);

    // next single-source update folds against the untouched cache
    let view = merger.update(single("s2", corpus("b", 1, 1)));
    assert_eq!(view.total_charts, 3);
}

#[test]
fn readers_never_see_a_partial_view() {
    let merger = Arc::new(Merger::new());
    merger.update(single("s1", corpus("a", 10, 10)));

    let stop = Arc::new(AtomicBool::new(false));
    let reader = {
        let merger = merger.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut reads = 0u64;
            loop {
                let view = merger.view().expect("view present");
                let n = view.charts.len();
                assert!(n == 10 || n == 30, "saw partial view of {n} charts");
                assert_eq!(n, view.total_charts);
                reads += 1;
                if stop.load(Ordering::Relaxed) {
                    break reads;
                }
            }
        })
    };

    for i in 0..500 {
        let size = if i % 2 == 0 { 30 } else { 10 };
        merger.update(single("s1", corpus("a", size, size)));
    }
    stop.store(true, Ordering::Relaxed);
    let reads = reader.join().expect("reader thread");
    assert!(reads > 0);
}
