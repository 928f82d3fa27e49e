// src/publish.rs
//! Output side of the scrape pipeline.
//!
//! The scheduler never formats a metric name or a line of HTML itself; it
//! reports outcomes and finished analyses to a [`Sink`]. One sink instance is
//! built at startup and passed to the scheduler explicitly.

use std::sync::Arc;
use std::time::Duration;

use crate::analyze::CorpusAnalysis;

/// Which view a published analysis belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Fresh analysis of one repository.
    Source(String),
    /// The merged view after an update.
    Composite,
}

pub trait Sink: Send + Sync {
    fn record_success(&self, source: &str);
    fn record_error(&self, source: &str);
    fn record_duration(&self, source: &str, elapsed: Duration);
    fn publish(&self, scope: &Scope, analysis: &CorpusAnalysis);
}

/// Fan-out to several sinks, in registration order.
#[derive(Clone, Default)]
pub struct SinkMux {
    sinks: Vec<Arc<dyn Sink>>,
}

impl SinkMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Sink for SinkMux {
    fn record_success(&self, source: &str) {
        for s in &self.sinks {
            s.record_success(source);
        }
    }

    fn record_error(&self, source: &str) {
        for s in &self.sinks {
            s.record_error(source);
        }
    }

    fn record_duration(&self, source: &str, elapsed: Duration) {
        for s in &self.sinks {
            s.record_duration(source, elapsed);
        }
    }

    fn publish(&self, scope: &Scope, analysis: &CorpusAnalysis) {
        for s in &self.sinks {
            s.publish(scope, analysis);
        }
    }
}

/// Writes scrape outcomes to the log. Handy as a second sink next to the
/// Prometheus one, and the only sink when metrics are not wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl Sink for LogSink {
    fn record_success(&self, source: &str) {
        tracing::debug!(repository = %source, "scrape succeeded");
    }

    fn record_error(&self, source: &str) {
        tracing::debug!(repository = %source, "scrape failed");
    }

    fn record_duration(&self, source: &str, elapsed: Duration) {
        tracing::debug!(
            repository = %source,
            elapsed_ms = elapsed.as_millis() as u64,
            "scrape duration"
        );
    }

    fn publish(&self, scope: &Scope, analysis: &CorpusAnalysis) {
        match scope {
            Scope::Source(name) => tracing::info!(
                repository = %name,
                charts = analysis.total_charts,
                versions = analysis.total_versions,
                "repository analysis published"
            ),
            Scope::Composite => tracing::info!(
                charts = analysis.total_charts,
                versions = analysis.total_versions,
                "merged view published"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Counting {
        calls: Mutex<Vec<String>>,
    }

    impl Sink for Counting {
        fn record_success(&self, source: &str) {
            self.calls.lock().unwrap().push(format!("ok:{source}"));
        }
        fn record_error(&self, source: &str) {
            self.calls.lock().unwrap().push(format!("err:{source}"));
        }
        fn record_duration(&self, source: &str, _elapsed: Duration) {
            self.calls.lock().unwrap().push(format!("dur:{source}"));
        }
        fn publish(&self, scope: &Scope, _analysis: &CorpusAnalysis) {
            self.calls.lock().unwrap().push(format!("pub:{scope:?}"));
        }
    }

    #[test]
    fn mux_forwards_to_every_sink() {
        let a = Arc::new(Counting::default());
        let b = Arc::new(Counting::default());
        let mux = SinkMux::new().with(a.clone()).with(b.clone());
        assert_eq!(mux.len(), 2);

        mux.record_error("r1");
        mux.publish(&Scope::Composite, &CorpusAnalysis::default());

        for s in [&a, &b] {
            assert_eq!(
                *s.calls.lock().unwrap(),
                vec!["err:r1".to_string(), "pub:Composite".to_string()]
            );
        }
    }
}
