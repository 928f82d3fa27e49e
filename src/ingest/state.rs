// src/ingest/state.rs
//! Lifecycle bookkeeping shared by the scheduler and the HTTP surface.

use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePhase {
    Idle,
    Enqueued,
    Scraping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServicePhase {
    Starting,
    WarmingUp,
    SteadyState,
    ShuttingDown,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub url: String,
    pub phase: SourcePhase,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_duration_ms: Option<u64>,
    pub consecutive_failures: u32,
    pub scrapes_total: u64,
    pub errors_total: u64,
}

impl SourceStatus {
    fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            phase: SourcePhase::Idle,
            last_success: None,
            last_error: None,
            last_duration_ms: None,
            consecutive_failures: 0,
            scrapes_total: 0,
            errors_total: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub phase: ServicePhase,
    pub repositories: Vec<SourceStatus>,
}

/// Per-source phase plus the service phase. Transitions are checked so a
/// source can only be enqueued from `Idle`.
#[derive(Debug)]
pub struct StatusBoard {
    service: RwLock<ServicePhase>,
    sources: Mutex<BTreeMap<String, SourceStatus>>,
    /// Declaration order, for snapshots.
    order: Vec<String>,
}

impl StatusBoard {
    pub fn new<'a, I>(sources: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut map = BTreeMap::new();
        let mut order = Vec::new();
        for (name, url) in sources {
            order.push(name.to_string());
            map.insert(name.to_string(), SourceStatus::new(name, url));
        }
        Self {
            service: RwLock::new(ServicePhase::Starting),
            sources: Mutex::new(map),
            order,
        }
    }

    pub fn service(&self) -> ServicePhase {
        *self.service.read().expect("status rwlock poisoned")
    }

    pub fn set_service(&self, phase: ServicePhase) {
        let mut guard = self.service.write().expect("status rwlock poisoned");
        if *guard != phase {
            tracing::info!(from = ?*guard, to = ?phase, "service phase changed");
            *guard = phase;
        }
    }

    pub fn is_ready(&self) -> bool {
        self.service() == ServicePhase::SteadyState
    }

    pub fn phase(&self, source: &str) -> Option<SourcePhase> {
        self.sources
            .lock()
            .expect("status mutex poisoned")
            .get(source)
            .map(|s| s.phase)
    }

    /// Idle → Enqueued. Returns false (and changes nothing) otherwise.
    pub fn try_enqueue(&self, source: &str) -> bool {
        let mut map = self.sources.lock().expect("status mutex poisoned");
        match map.get_mut(source) {
            Some(s) if s.phase == SourcePhase::Idle => {
                s.phase = SourcePhase::Enqueued;
                true
            }
            _ => false,
        }
    }

    /// Undo an enqueue whose queue send failed.
    pub fn cancel_enqueue(&self, source: &str) {
        let mut map = self.sources.lock().expect("status mutex poisoned");
        if let Some(s) = map.get_mut(source) {
            if s.phase == SourcePhase::Enqueued {
                s.phase = SourcePhase::Idle;
            }
        }
    }

    pub fn begin(&self, source: &str) {
        self.with_source(source, |s| s.phase = SourcePhase::Scraping);
    }

    pub fn finish_ok(&self, source: &str, elapsed: Duration) {
        self.with_source(source, |s| {
            s.phase = SourcePhase::Idle;
            s.last_success = Some(Utc::now());
            s.last_error = None;
            s.last_duration_ms = Some(elapsed.as_millis() as u64);
            s.consecutive_failures = 0;
            s.scrapes_total += 1;
        });
    }

    /// Failure leaves `last_success` untouched.
    pub fn finish_err(&self, source: &str, elapsed: Duration, error: &str) {
        self.with_source(source, |s| {
            s.phase = SourcePhase::Idle;
            s.last_error = Some(error.to_string());
            s.last_duration_ms = Some(elapsed.as_millis() as u64);
            s.consecutive_failures += 1;
            s.scrapes_total += 1;
            s.errors_total += 1;
        });
    }

    pub fn source(&self, source: &str) -> Option<SourceStatus> {
        self.sources
            .lock()
            .expect("status mutex poisoned")
            .get(source)
            .cloned()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let map = self.sources.lock().expect("status mutex poisoned");
        StatusSnapshot {
            phase: self.service(),
            repositories: self
                .order
                .iter()
                .filter_map(|n| map.get(n).cloned())
                .collect(),
        }
    }

    fn with_source(&self, source: &str, f: impl FnOnce(&mut SourceStatus)) {
        let mut map = self.sources.lock().expect("status mutex poisoned");
        match map.get_mut(source) {
            Some(s) => f(s),
            None => tracing::warn!(repository = %source, "status update for unknown repository"),
        }
    }
}
