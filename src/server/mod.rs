use crate::config::{Config, ConfigStore};
use crate::service::VideoService;
use crate::staging::StagingArea;
use anyhow::{Context, Result};
use axum::{extract::DefaultBodyLimit, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod routes_config;
pub mod routes_index;
pub mod routes_sse;
pub mod routes_video;

/// Server limits and timings taken from `[server]`.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub max_upload_bytes: usize,
    pub progress_interval: Duration,
    pub progress_timeout: Duration,
}

impl ServerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_upload_bytes: config.server.max_upload_bytes(),
            progress_interval: Duration::from_millis(config.server.progress_interval_ms),
            progress_timeout: Duration::from_secs(config.server.progress_timeout_secs),
        }
    }
}

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub service: Arc<VideoService>,
    pub config: Arc<ConfigStore>,
    pub settings: ServerSettings,
}

/// Build the context: purge staging, then wire the store and service together.
pub fn build_context(config: &Config) -> Result<AppContext> {
    let staging = StagingArea::new(config.app.staging_dir());
    staging
        .purge_on_start()
        .with_context(|| format!("Failed to prepare staging directory {:?}", staging.dir()))?;

    let store = Arc::new(ConfigStore::from_app_config(&config.app));
    let service = Arc::new(VideoService::new(
        store.clone(),
        staging,
        config.app.ffprobe_path.clone(),
    ));

    Ok(AppContext {
        service,
        config: store,
        settings: ServerSettings::from_config(config),
    })
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let body_limit = ctx.settings.max_upload_bytes;

    Router::new()
        .merge(routes_index::index_routes())
        .merge(routes_video::video_routes())
        .merge(routes_sse::sse_routes())
        .merge(routes_config::config_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Start the HTTP server and run until a shutdown signal arrives
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = build_context(&config)?;
    let service = ctx.service.clone();
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);
    tracing::info!("Output directory: {}", config.app.output_path);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if service.is_converting() {
        tracing::info!("Stopping running conversion");
    }
    service.shutdown().await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Context over `dir` with tools that do not exist, for router tests.
#[cfg(test)]
pub(crate) fn test_context(dir: &std::path::Path) -> AppContext {
    let mut config = Config::default();
    config.app.output_path = dir.join("out").to_string_lossy().into_owned();
    config.app.staging_dir = Some(dir.join("staging"));
    config.app.ffmpeg_path = "nonexistent_ffmpeg_12345".to_string();
    config.app.ffprobe_path = "nonexistent_ffprobe_12345".to_string();
    config.server.progress_interval_ms = 10;
    config.server.progress_timeout_secs = 2;
    build_context(&config).expect("test context")
}
