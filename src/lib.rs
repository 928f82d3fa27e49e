// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod api;
pub mod config;
pub mod index;
pub mod ingest;
pub mod merge;
pub mod metrics;
pub mod publish;
pub mod web;

pub use crate::analyze::{analyze, analyze_with_source, ChartSummary, CorpusAnalysis};
pub use crate::api::router;
pub use crate::merge::{MergeInput, Merger};
