use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use flowboard_common::Repository;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use super::api::{self, AppState};
use super::ws;
use crate::board::{BoardController, RoadmapController, ViewPreferences};

/// Configuration for the board server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub organization_id: Option<String>,
    /// Allow cross-origin requests (local front-end dev servers).
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3141,
            organization_id: None,
            dev_mode: false,
        }
    }
}

/// Build controllers over `repo` and wire their events to the WebSocket
/// channel. Must be called inside a Tokio runtime.
pub fn build_state(
    repo: Arc<dyn Repository>,
    prefs: ViewPreferences,
    organization_id: Option<String>,
) -> Arc<AppState> {
    let board = BoardController::new(repo.clone(), prefs.clone(), organization_id.clone());
    let roadmap = RoadmapController::new(repo, prefs, organization_id);
    let (ws_tx, _rx) = broadcast::channel::<String>(256);

    tokio::spawn(ws::forward_events(board.subscribe(), ws_tx.clone()));
    tokio::spawn(ws::forward_events(roadmap.subscribe(), ws_tx.clone()));

    Arc::new(AppState {
        board,
        roadmap,
        ws_tx,
    })
}

pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router().with_state(state)
}

/// Load both controllers and serve until Ctrl+C.
pub async fn start_server(
    repo: Arc<dyn Repository>,
    prefs: ViewPreferences,
    config: ServerConfig,
) -> Result<()> {
    let state = build_state(repo, prefs, config.organization_id.clone());

    let (board, roadmap) = futures::join!(state.board.load_all(), state.roadmap.load_all());
    if let Err(e) = board {
        tracing::warn!(error = %e, "Initial board load failed");
    }
    if let Err(e) = roadmap {
        tracing::warn!(error = %e, "Initial roadmap load failed");
    }

    let mut app = build_router(state.clone());
    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "Board server listening");
    println!("flowboard running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.board.close();
    state.roadmap.close();
    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
