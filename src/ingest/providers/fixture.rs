// src/ingest/providers/fixture.rs
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::Source;
use crate::ingest::types::{FetchError, IndexFetcher};

/// Canned response for one source.
#[derive(Debug, Clone)]
pub enum FixtureResponse {
    Body(Vec<u8>),
    Fail(FetchError),
    /// Never completes on its own; exercises timeouts and shutdown grace.
    Hang,
}

/// In-memory fetcher keyed by source name. Counts calls per source and lets
/// tests swap a response between scrapes.
#[derive(Default)]
pub struct FixtureFetcher {
    responses: Mutex<HashMap<String, FixtureResponse>>,
    calls: Mutex<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, source: &str, body: impl Into<Vec<u8>>) -> Self {
        self.set(source, FixtureResponse::Body(body.into()));
        self
    }

    pub fn with_failure(self, source: &str, err: FetchError) -> Self {
        self.set(source, FixtureResponse::Fail(err));
        self
    }

    pub fn set(&self, source: &str, response: FixtureResponse) {
        self.responses
            .lock()
            .expect("fixture mutex poisoned")
            .insert(source.to_string(), response);
    }

    /// Source names in the order they were fetched.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("fixture mutex poisoned").clone()
    }

    pub fn call_count(&self, source: &str) -> usize {
        self.calls
            .lock()
            .expect("fixture mutex poisoned")
            .iter()
            .filter(|s| *s == source)
            .count()
    }
}

#[async_trait]
impl IndexFetcher for FixtureFetcher {
    async fn fetch(&self, source: &Source, _deadline: Duration) -> Result<Vec<u8>, FetchError> {
        self.calls
            .lock()
            .expect("fixture mutex poisoned")
            .push(source.name.clone());

        let response = self
            .responses
            .lock()
            .expect("fixture mutex poisoned")
            .get(&source.name)
            .cloned();

        match response {
            Some(FixtureResponse::Body(b)) => Ok(b),
            Some(FixtureResponse::Fail(e)) => Err(e),
            Some(FixtureResponse::Hang) => std::future::pending().await,
            None => Err(FetchError::Status {
                url: source.url.clone(),
                status: 404,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
