// src/ingest/mod.rs
//! Fetch → parse → analyze for one source, plus the scheduler that drives it.

pub mod providers;
pub mod scheduler;
pub mod state;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use crate::analyze::{analyze_with_source, CorpusAnalysis};
use crate::config::Source;
use crate::index::{self, ParseError};
use crate::ingest::types::{FetchError, IndexFetcher};

pub use scheduler::{Scheduler, SchedulerCfg, SchedulerHandle};
pub use state::{ServicePhase, SourcePhase, SourceStatus, StatusBoard, StatusSnapshot};

/// Everything that can go wrong in one scrape cycle.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("invalid index document: {0}")]
    Parse(#[from] ParseError),
}

impl ScrapeError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(e) => e.kind(),
            Self::Parse(_) => "parse",
        }
    }
}

/// Run one fetch/parse/analyze cycle for `source`.
///
/// The transport call is bounded by `timeout` regardless of whether the
/// fetcher honours the deadline it is handed.
pub async fn scrape_once(
    fetcher: &dyn IndexFetcher,
    source: &Source,
    timeout: Duration,
) -> Result<Arc<CorpusAnalysis>, ScrapeError> {
    let body = match tokio::time::timeout(timeout, fetcher.fetch(source, timeout)).await {
        Ok(res) => res?,
        Err(_) => {
            return Err(FetchError::Timeout {
                url: source.url.clone(),
                timeout,
            }
            .into())
        }
    };

    let doc = index::parse(&body)?;
    Ok(Arc::new(analyze_with_source(&doc, &source.name)))
}
