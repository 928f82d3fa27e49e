// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use helm_repo_exporter::analyze::CorpusAnalysis;
use helm_repo_exporter::config::Source;
use helm_repo_exporter::ingest::providers::FixtureFetcher;
use helm_repo_exporter::ingest::{Scheduler, SchedulerCfg, StatusBoard};
use helm_repo_exporter::merge::Merger;
use helm_repo_exporter::publish::{Scope, Sink};

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}")).expect("fixture")
}

pub fn source(name: &str, every_secs: u64) -> Source {
    Source::new(
        name,
        format!("https://{name}.example.com/index.yaml"),
        Duration::from_secs(every_secs),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Success(String),
    Error(String),
    Duration(String),
    Publish(Scope, usize),
}

/// Sink that remembers every call in order.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| f(e)).count()
    }

    pub fn errors_for(&self, source: &str) -> usize {
        self.count(|e| matches!(e, Event::Error(s) if s == source))
    }

    pub fn successes_for(&self, source: &str) -> usize {
        self.count(|e| matches!(e, Event::Success(s) if s == source))
    }
}

impl Sink for RecordingSink {
    fn record_success(&self, source: &str) {
        self.events.lock().unwrap().push(Event::Success(source.into()));
    }
    fn record_error(&self, source: &str) {
        self.events.lock().unwrap().push(Event::Error(source.into()));
    }
    fn record_duration(&self, source: &str, _elapsed: Duration) {
        self.events.lock().unwrap().push(Event::Duration(source.into()));
    }
    fn publish(&self, scope: &Scope, analysis: &CorpusAnalysis) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Publish(scope.clone(), analysis.total_charts));
    }
}

pub struct Harness {
    pub scheduler: Arc<Scheduler>,
    pub fetcher: Arc<FixtureFetcher>,
    pub merger: Arc<Merger>,
    pub sink: Arc<RecordingSink>,
    pub status: Arc<StatusBoard>,
}

pub fn harness(sources: Vec<Source>, fetcher: FixtureFetcher, scan_timeout: Duration) -> Harness {
    harness_with_queue(sources, fetcher, scan_timeout, 16)
}

pub fn harness_with_queue(
    sources: Vec<Source>,
    fetcher: FixtureFetcher,
    scan_timeout: Duration,
    queue_capacity: usize,
) -> Harness {
    let fetcher = Arc::new(fetcher);
    let merger = Arc::new(Merger::new());
    let sink = Arc::new(RecordingSink::default());
    let status = Arc::new(StatusBoard::new(
        sources.iter().map(|s| (s.name.as_str(), s.url.as_str())),
    ));
    let scheduler = Arc::new(Scheduler::new(
        sources,
        fetcher.clone(),
        merger.clone(),
        sink.clone(),
        status.clone(),
        SchedulerCfg {
            scan_timeout,
            queue_capacity,
        },
    ));
    Harness {
        scheduler,
        fetcher,
        merger,
        sink,
        status,
    }
}
