//! helm-repo-exporter binary entrypoint.
//! Loads configuration, warms up every repository once, then serves metrics,
//! readiness and the optional dashboard while the scheduler polls.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use helm_repo_exporter::api::{self, AppState, Routes};
use helm_repo_exporter::config::ExporterConfig;
use helm_repo_exporter::ingest::providers::HttpFetcher;
use helm_repo_exporter::ingest::types::IndexFetcher;
use helm_repo_exporter::ingest::{Scheduler, SchedulerCfg, ServicePhase, StatusBoard};
use helm_repo_exporter::merge::Merger;
use helm_repo_exporter::metrics::{Metrics, PrometheusSink};
use helm_repo_exporter::publish::{LogSink, Sink, SinkMux};

/// `RUST_LOG` drives the filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("helm_repo_exporter=info,tower_http=warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received terminate signal, shutting down"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real deployments set the environment directly.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = ExporterConfig::load_from_env().context("loading configuration")?;
    info!(
        repositories = cfg.repositories.len(),
        scan_timeout = ?cfg.scan_timeout,
        metrics_port = cfg.metrics_port,
        metrics_path = %cfg.metrics_path,
        enable_html = cfg.enable_html,
        html_path = %cfg.html_path,
        "configuration loaded"
    );
    for repo in &cfg.repositories {
        info!(
            repository = %repo.name,
            url = %repo.url,
            interval = ?repo.scan_interval,
            auth = %repo.auth.as_ref().map(|a| a.describe()).unwrap_or_else(|| "none".into()),
            "repository configured"
        );
    }

    let metrics = Metrics::init().context("installing prometheus recorder")?;
    let fetcher: Arc<dyn IndexFetcher> =
        Arc::new(HttpFetcher::new().context("building http client")?);
    let merger = Arc::new(Merger::new());
    let status = Arc::new(StatusBoard::new(
        cfg.repositories
            .iter()
            .map(|r| (r.name.as_str(), r.url.as_str())),
    ));
    let sink: Arc<dyn Sink> = Arc::new(
        SinkMux::new()
            .with(Arc::new(PrometheusSink::new()))
            .with(Arc::new(LogSink)),
    );

    let cancel = CancellationToken::new();

    // HTTP server first, so /health and /ready answer during warm-up.
    let app = api::router(
        AppState {
            merger: merger.clone(),
            status: status.clone(),
            metrics: metrics.handle.clone(),
        },
        &Routes::from(&cfg),
    );
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.metrics_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, metrics_path = %cfg.metrics_path, "http server listening");

    let server_cancel = cancel.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
    });

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    let scheduler = Arc::new(Scheduler::new(
        cfg.repositories.clone(),
        fetcher,
        merger,
        sink,
        status.clone(),
        SchedulerCfg {
            scan_timeout: cfg.scan_timeout,
            queue_capacity: cfg.queue_capacity,
        },
    ));

    scheduler.warm_up(&cancel).await;

    let handle = if cancel.is_cancelled() {
        None
    } else {
        Some(scheduler.clone().spawn(cancel.clone()))
    };

    cancel.cancelled().await;

    match handle {
        Some(h) => {
            if !h.shutdown(cfg.shutdown_grace).await {
                warn!("scheduler did not stop within the grace period");
            }
        }
        None => status.set_service(ServicePhase::Stopped),
    }

    match tokio::time::timeout(cfg.shutdown_grace, &mut server).await {
        Ok(Ok(res)) => res.context("http server")?,
        Ok(Err(e)) => warn!(error = %e, "http server task failed"),
        Err(_) => {
            warn!("http server did not drain within the grace period; closing");
            server.abort();
        }
    }

    info!("shutdown complete");
    Ok(())
}
