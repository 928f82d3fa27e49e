// src/ingest/providers/mod.rs
pub mod fixture;
pub mod http;

pub use fixture::{FixtureFetcher, FixtureResponse};
pub use http::HttpFetcher;
