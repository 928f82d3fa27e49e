// src/config/mod.rs
//! Exporter configuration.
//!
//! Loading order:
//! 1) `$CONFIG_FILE` → YAML / TOML / JSON by extension
//! 2) single-repository mode from `$INDEX_URL` and friends
//!
//! Every problem found here is fatal: the service refuses to start rather
//! than scheduling a half-configured source list.

pub mod duration;
pub mod repository;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub use crate::config::duration::parse_duration;
pub use crate::config::repository::{AuthConfig, BasicAuth, Source};

use crate::config::duration::de_opt_duration;

pub const ENV_CONFIG_FILE: &str = "CONFIG_FILE";
pub const ENV_INDEX_URL: &str = "INDEX_URL";

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
pub const DEFAULT_METRICS_PORT: u16 = 9571;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_HTML_PATH: &str = "/charts";
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Routes served regardless of configuration.
const RESERVED_PATHS: [&str; 3] = ["/health", "/ready", "/status"];

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterConfig {
    /// Declaration order is the warm-up order.
    pub repositories: Vec<Source>,
    pub scan_interval: Duration,
    pub scan_timeout: Duration,
    pub metrics_port: u16,
    pub metrics_path: String,
    pub enable_html: bool,
    pub html_path: String,
    pub shutdown_grace: Duration,
    pub queue_capacity: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    repositories: Vec<RawRepository>,
    #[serde(default, deserialize_with = "de_opt_duration")]
    scan_interval: Option<Duration>,
    #[serde(default, deserialize_with = "de_opt_duration")]
    scan_timeout: Option<Duration>,
    #[serde(default)]
    metrics_port: Option<u16>,
    #[serde(default)]
    metrics_path: Option<String>,
    #[serde(default, rename = "enableHTML", alias = "enableHtml")]
    enable_html: bool,
    #[serde(default)]
    html_path: Option<String>,
    #[serde(default, deserialize_with = "de_opt_duration")]
    shutdown_grace: Option<Duration>,
    #[serde(default)]
    queue_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRepository {
    name: String,
    url: String,
    #[serde(default, deserialize_with = "de_opt_duration")]
    scan_interval: Option<Duration>,
    #[serde(default)]
    auth: Option<AuthConfig>,
}

impl ExporterConfig {
    /// Load from an explicit file. Format is picked from the extension.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self::from_str_with_format(&content, &ext)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    /// Parse config text; `format` is `yaml`/`yml`, `toml` or `json`.
    pub fn from_str_with_format(content: &str, format: &str) -> Result<Self> {
        let raw: RawConfig = match format {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            "yaml" | "yml" | "" => serde_yaml::from_str(content)?,
            other => bail!("unsupported config format '{other}'"),
        };
        raw.resolve()
    }

    /// `$CONFIG_FILE` if set, else single-repository mode from `$INDEX_URL`.
    pub fn load_from_env() -> Result<Self> {
        if let Some(path) = env_non_empty(ENV_CONFIG_FILE) {
            return Self::load_from_path(Path::new(&path));
        }

        let url = env_non_empty(ENV_INDEX_URL).ok_or_else(|| {
            anyhow!("either {ENV_CONFIG_FILE} or {ENV_INDEX_URL} environment variable is required")
        })?;

        let scan_interval = env_duration("SCAN_INTERVAL")?.unwrap_or(DEFAULT_SCAN_INTERVAL);
        let metrics_port = match env_non_empty("METRICS_PORT") {
            Some(p) => p
                .parse()
                .with_context(|| format!("METRICS_PORT '{p}' is not a port number"))?,
            None => DEFAULT_METRICS_PORT,
        };

        let cfg = Self {
            repositories: vec![Source::new("default", url, scan_interval)],
            scan_interval,
            scan_timeout: env_duration("SCAN_TIMEOUT")?.unwrap_or(DEFAULT_SCAN_TIMEOUT),
            metrics_port,
            metrics_path: env_non_empty("METRICS_PATH")
                .unwrap_or_else(|| DEFAULT_METRICS_PATH.to_string()),
            enable_html: env_non_empty("ENABLE_HTML")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(false),
            html_path: env_non_empty("HTML_PATH").unwrap_or_else(|| DEFAULT_HTML_PATH.to_string()),
            shutdown_grace: env_duration("SHUTDOWN_GRACE")?.unwrap_or(DEFAULT_SHUTDOWN_GRACE),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Startup checks. Any error here aborts the process.
    pub fn validate(&self) -> Result<()> {
        if self.repositories.is_empty() {
            bail!("no repositories configured");
        }
        let mut seen = HashSet::new();
        for repo in &self.repositories {
            if repo.name.trim().is_empty() {
                bail!("repository with url '{}' has an empty name", repo.url);
            }
            if !seen.insert(repo.name.as_str()) {
                bail!("duplicate repository name '{}'", repo.name);
            }
            let parsed = url::Url::parse(&repo.url)
                .with_context(|| format!("repository '{}' has an invalid url", repo.name))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!(
                    "repository '{}' url must be http or https, got '{}'",
                    repo.name,
                    parsed.scheme()
                );
            }
            if repo.scan_interval.is_zero() {
                bail!("repository '{}' has a zero scan interval", repo.name);
            }
        }
        if self.scan_timeout.is_zero() {
            bail!("scan timeout must be greater than zero");
        }
        if self.queue_capacity == 0 {
            bail!("queue capacity must be greater than zero");
        }
        for (what, path) in [("metrics", &self.metrics_path), ("html", &self.html_path)] {
            if !path.starts_with('/') {
                bail!("{what} path '{path}' must start with '/'");
            }
            if RESERVED_PATHS.contains(&path.as_str()) {
                bail!("{what} path '{path}' is reserved");
            }
        }
        if self.enable_html && self.html_path == self.metrics_path {
            bail!("html path and metrics path must differ");
        }
        Ok(())
    }
}

impl RawConfig {
    fn resolve(self) -> Result<ExporterConfig> {
        let scan_interval = self
            .scan_interval
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_SCAN_INTERVAL);
        let repositories = self
            .repositories
            .into_iter()
            .map(|r| Source {
                name: r.name.trim().to_string(),
                url: r.url.trim().to_string(),
                // zero means "not set", like an omitted key
                scan_interval: r
                    .scan_interval
                    .filter(|d| !d.is_zero())
                    .unwrap_or(scan_interval),
                auth: r.auth,
            })
            .collect();

        let cfg = ExporterConfig {
            repositories,
            scan_interval,
            scan_timeout: self.scan_timeout.unwrap_or(DEFAULT_SCAN_TIMEOUT),
            metrics_port: self.metrics_port.unwrap_or(DEFAULT_METRICS_PORT),
            metrics_path: self
                .metrics_path
                .unwrap_or_else(|| DEFAULT_METRICS_PATH.to_string()),
            enable_html: self.enable_html,
            html_path: self
                .html_path
                .unwrap_or_else(|| DEFAULT_HTML_PATH.to_string()),
            shutdown_grace: self.shutdown_grace.unwrap_or(DEFAULT_SHUTDOWN_GRACE),
            queue_capacity: self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_duration(key: &str) -> Result<Option<Duration>> {
    env_non_empty(key)
        .map(|v| parse_duration(&v).with_context(|| format!("{key} '{v}' is not a duration")))
        .transpose()
}
