// src/config/repository.rs
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// One configured chart repository. Immutable after startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub name: String,
    /// HTTP(S) URL of the repository's `index.yaml`.
    pub url: String,
    pub scan_interval: Duration,
    pub auth: Option<AuthConfig>,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>, scan_interval: Duration) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            scan_interval,
            auth: None,
        }
    }
}

/// Credentials applied to every request for a source.
#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default)]
    pub basic: Option<BasicAuth>,
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl AuthConfig {
    /// Short, secret-free label for startup logs.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(b) = &self.basic {
            parts.push(format!("basic (username: {})", b.username));
        }
        if self.bearer_token.as_deref().is_some_and(|t| !t.is_empty()) {
            parts.push("bearer token".to_string());
        }
        if !self.headers.is_empty() {
            parts.push(format!("custom headers ({})", self.headers.len()));
        }
        if parts.is_empty() {
            "none".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("basic", &self.basic)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Clone, PartialEq, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
