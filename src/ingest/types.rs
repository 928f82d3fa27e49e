// src/ingest/types.rs
use std::time::Duration;

use crate::config::Source;

/// Why an index document could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("authentication rejected by {url} (status {status})")]
    Auth { url: String, status: u16 },

    #[error("unexpected status code {status} from {url}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// Short label for logs and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::Auth { .. } => "auth",
            Self::Status { .. } => "status",
        }
    }
}

/// Transport for index documents. The scheduler only looks at
/// success/failure; protocol details stay inside the implementation.
#[async_trait::async_trait]
pub trait IndexFetcher: Send + Sync {
    async fn fetch(&self, source: &Source, deadline: Duration) -> Result<Vec<u8>, FetchError>;

    fn name(&self) -> &'static str;
}
