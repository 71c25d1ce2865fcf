//! HTTP server lifecycle.

use anyhow::{Context, Result};
use breakconf::BreakConfig;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

use crate::controller::{SessionController, StopOutcome};
use crate::web::{self, AppState};

/// Serve until SIGINT/SIGTERM, then stop any running session before returning.
pub async fn run(config: &BreakConfig) -> Result<()> {
    let controller = Arc::new(SessionController::new(config));
    controller.workspace().ensure().with_context(|| {
        format!(
            "Failed to create workspace {}",
            controller.workspace().dir().display()
        )
    })?;

    let addr = config.bind.addr();
    info!("🎥 Breakshot starting on http://{}", addr);
    info!("   Workspace: {}", controller.workspace().dir().display());
    info!("   Encoder log: {}", config.paths.encoder_log.display());
    info!(
        "   Capture: {} @ {} {}fps",
        config.capture.device, config.capture.video_size, config.capture.framerate
    );
    info!("   Playlist: GET http://{}/hls/stream.m3u8", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    serve_until(listener, controller, shutdown_signal()).await
}

/// Serve on `listener` until `shutdown` resolves, then stop the encoder.
///
/// The encoder is stopped whether the server exits cleanly or with an error.
pub async fn serve_until(
    listener: tokio::net::TcpListener,
    controller: Arc<SessionController>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = web::router(AppState::new(controller.clone()));

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error");

    if let StopOutcome::Stopped { info, termination } = controller.stop().await {
        info!(session.id = %info.id, ?termination, "Encoder stopped for shutdown");
    }

    info!("Shutdown complete");
    served
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = sigterm() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}

