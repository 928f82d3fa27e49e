// src/ingest/providers/http.rs
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;

use crate::config::{AuthConfig, Source};
use crate::ingest::types::{FetchError, IndexFetcher};

/// Fetches `index.yaml` over HTTP(S). One client is shared by all sources;
/// credentials are applied per request from the source's auth block.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("helm-repo-exporter/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

/// Exactly one `Authorization` header is sent. A custom `Authorization`
/// header beats the bearer token, which beats basic auth.
fn apply_auth(req: RequestBuilder, auth: &AuthConfig) -> RequestBuilder {
    let mut headers = HeaderMap::new();
    for (k, v) in &auth.headers {
        match (HeaderName::from_bytes(k.as_bytes()), HeaderValue::from_str(v)) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %k, "skipping invalid custom header"),
        }
    }

    let req = if headers.contains_key(AUTHORIZATION) {
        req
    } else if let Some(token) = auth.bearer_token.as_deref().filter(|t| !t.is_empty()) {
        req.bearer_auth(token)
    } else if let Some(basic) = &auth.basic {
        req.basic_auth(&basic.username, Some(&basic.password))
    } else {
        req
    };
    req.headers(headers)
}

fn map_transport_error(url: &str, deadline: Duration, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout: deadline,
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl IndexFetcher for HttpFetcher {
    async fn fetch(&self, source: &Source, deadline: Duration) -> Result<Vec<u8>, FetchError> {
        let url = source.url.as_str();
        let mut req = self.client.get(url).timeout(deadline);
        if let Some(auth) = &source.auth {
            req = apply_auth(req, auth);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| map_transport_error(url, deadline, e))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Auth {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| map_transport_error(url, deadline, e))?;
        Ok(body.to_vec())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
