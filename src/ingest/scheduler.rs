// src/ingest/scheduler.rs
//! Per-source timers feeding one worker.
//!
//! Each source gets its own interval task. A tick only enqueues the source
//! (if it is idle) onto a bounded channel; a single worker drains the channel
//! and runs fetch → parse → analyze → merge → publish. Every mutation of the
//! merged view and of the sinks therefore happens on one task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::Source;
use crate::ingest::state::{ServicePhase, StatusBoard};
use crate::ingest::types::IndexFetcher;
use crate::ingest::{scrape_once, ScrapeError};
use crate::merge::{MergeInput, Merger};
use crate::publish::{Scope, Sink};

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub scan_timeout: Duration,
    pub queue_capacity: usize,
}

pub struct Scheduler {
    sources: Vec<Source>,
    fetcher: Arc<dyn IndexFetcher>,
    merger: Arc<Merger>,
    sink: Arc<dyn Sink>,
    status: Arc<StatusBoard>,
    cfg: SchedulerCfg,
}

impl Scheduler {
    pub fn new(
        sources: Vec<Source>,
        fetcher: Arc<dyn IndexFetcher>,
        merger: Arc<Merger>,
        sink: Arc<dyn Sink>,
        status: Arc<StatusBoard>,
        cfg: SchedulerCfg,
    ) -> Self {
        Self {
            sources,
            fetcher,
            merger,
            sink,
            status,
            cfg,
        }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn status(&self) -> &Arc<StatusBoard> {
        &self.status
    }

    /// One scrape of every source, in declaration order. Failures are logged
    /// and the pass continues. Stops early if `cancel` fires between sources.
    pub async fn warm_up(&self, cancel: &CancellationToken) {
        self.status.set_service(ServicePhase::WarmingUp);
        let mut ok = 0usize;
        for source in &self.sources {
            if cancel.is_cancelled() {
                tracing::info!(target: "scheduler", "warm-up interrupted by shutdown");
                return;
            }
            if self.process(source).await.is_ok() {
                ok += 1;
            }
        }
        tracing::info!(
            target: "scheduler",
            ok,
            failed = self.sources.len() - ok,
            "warm-up pass finished"
        );
    }

    /// Run the full pipeline for one source and report the outcome.
    pub async fn process(&self, source: &Source) -> Result<(), ScrapeError> {
        self.status.begin(&source.name);
        let started = Instant::now();

        let result = scrape_once(self.fetcher.as_ref(), source, self.cfg.scan_timeout).await;

        let elapsed = started.elapsed();
        self.sink.record_duration(&source.name, elapsed);

        match result {
            Ok(analysis) => {
                let input = if self.sources.len() == 1 {
                    MergeInput::Composite {
                        analysis: analysis.clone(),
                    }
                } else {
                    MergeInput::SingleSource {
                        source: source.name.clone(),
                        analysis: analysis.clone(),
                    }
                };
                let view = self.merger.update(input);

                self.sink
                    .publish(&Scope::Source(source.name.clone()), &analysis);
                self.sink.publish(&Scope::Composite, &view);
                self.sink.record_success(&source.name);
                self.status.finish_ok(&source.name, elapsed);

                tracing::info!(
                    target: "scheduler",
                    repository = %source.name,
                    charts = analysis.total_charts,
                    versions = analysis.total_versions,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "scrape ok"
                );
                Ok(())
            }
            Err(e) => {
                self.sink.record_error(&source.name);
                self.status
                    .finish_err(&source.name, elapsed, &e.to_string());
                tracing::warn!(
                    target: "scheduler",
                    error = %e,
                    kind = e.kind(),
                    repository = %source.name,
                    fetcher = self.fetcher.name(),
                    "scrape failed; keeping previous data"
                );
                Err(e)
            }
        }
    }

    /// Start the worker and one timer per source. The first tick of each
    /// timer is one period after this call.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> SchedulerHandle {
        let (tx, rx) = mpsc::channel::<usize>(self.cfg.queue_capacity);
        let mut tasks = JoinSet::new();

        tasks.spawn(worker(self.clone(), rx, cancel.clone()));

        for idx in 0..self.sources.len() {
            tasks.spawn(timer(self.clone(), idx, tx.clone(), cancel.clone()));
        }
        drop(tx);

        self.status.set_service(ServicePhase::SteadyState);
        tracing::info!(
            target: "scheduler",
            sources = self.sources.len(),
            queue_capacity = self.cfg.queue_capacity,
            "scheduler started"
        );

        SchedulerHandle {
            tasks,
            cancel,
            status: self.status.clone(),
        }
    }
}

async fn worker(sched: Arc<Scheduler>, mut rx: mpsc::Receiver<usize>, cancel: CancellationToken) {
    loop {
        let idx = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(idx) => idx,
                None => break,
            },
        };
        let Some(source) = sched.sources.get(idx) else {
            continue;
        };
        // Errors are already reported inside `process`.
        let _ = sched.process(source).await;
    }
    tracing::debug!(target: "scheduler", "worker stopped");
}

async fn timer(
    sched: Arc<Scheduler>,
    idx: usize,
    tx: mpsc::Sender<usize>,
    cancel: CancellationToken,
) {
    let source = &sched.sources[idx];
    let period = source.scan_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if !sched.status.try_enqueue(&source.name) {
            tracing::debug!(
                target: "scheduler",
                repository = %source.name,
                "previous scrape still pending; tick coalesced"
            );
            continue;
        }

        match tx.try_send(idx) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                sched.status.cancel_enqueue(&source.name);
                tracing::warn!(
                    target: "scheduler",
                    repository = %source.name,
                    "scrape queue full; dropping tick"
                );
            }
            Err(TrySendError::Closed(_)) => {
                sched.status.cancel_enqueue(&source.name);
                break;
            }
        }
    }
    tracing::debug!(target: "scheduler", repository = %source.name, "timer stopped");
}

/// Owns the running tasks.
pub struct SchedulerHandle {
    tasks: JoinSet<()>,
    cancel: CancellationToken,
    status: Arc<StatusBoard>,
}

impl SchedulerHandle {
    /// Cancel every task and wait up to `grace` for an in-flight scrape to
    /// finish. Returns `false` if tasks had to be aborted.
    pub async fn shutdown(mut self, grace: Duration) -> bool {
        self.status.set_service(ServicePhase::ShuttingDown);
        self.cancel.cancel();

        let drained = tokio::time::timeout(grace, async {
            while let Some(res) = self.tasks.join_next().await {
                if let Err(e) = res {
                    tracing::warn!(target: "scheduler", error = %e, "scheduler task failed");
                }
            }
        })
        .await
        .is_ok();

        if !drained {
            tracing::warn!(
                target: "scheduler",
                grace_ms = grace.as_millis() as u64,
                "grace period elapsed; aborting scheduler tasks"
            );
            self.tasks.shutdown().await;
        }

        self.status.set_service(ServicePhase::Stopped);
        drained
    }
}
