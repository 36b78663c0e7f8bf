//! HTTP/WebSocket surface for the Encore show server.
//!
//! | Path | Description |
//! |------|-------------|
//! | `/ws` | WebSocket carrying the show protocol |
//! | `/upload-audio` | Multipart audio upload |
//! | `/upload-video` | Multipart video upload |
//! | `/upload-logo`, `/upload-start-image` | Multipart image uploads |
//! | `/*` | Static files from the media root |
//!
//! The server binds to `0.0.0.0` so spectator phones on the venue network
//! can reach it directly.

pub use state::{AppState, ShowSession};

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;

mod state;
mod upload;
mod ws;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/upload-audio", post(upload::upload_audio))
        .route("/upload-video", post(upload::upload_video))
        .route("/upload-logo", post(upload::upload_logo))
        .route("/upload-start-image", post(upload::upload_start_image))
        .fallback_service(ServeDir::new(state.media_dir.clone()))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("encore server listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    // Show state is in-memory only; exiting discards it by design.
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {err}");
    }
    log::info!("shutting down");
}
