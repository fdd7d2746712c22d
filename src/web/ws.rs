use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::api::SharedState;
use crate::board::BoardEvent;

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let rx = state.ws_tx.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(socket: WebSocket, rx: broadcast::Receiver<String>) {
    let (sender, receiver) = socket.split();
    run_socket_loop(sender, receiver, rx).await;
}

/// Forward serialized events to the client and answer pings. If no Pong
/// arrives within [`PONG_TIMEOUT`] of a Ping the connection is dropped.
async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut rx: broadcast::Receiver<String>,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // First tick completes immediately.
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    tracing::debug!("WebSocket client missed pong, closing");
                    break;
                }
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            result = rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "WebSocket client lagged");
                        continue;
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;
}

// ── Event fan-out ────────────────────────────────────────────────────

/// Serialize and broadcast a board event to all connected clients.
pub fn broadcast_event(tx: &broadcast::Sender<String>, event: &BoardEvent) {
    match serde_json::to_string(event) {
        Ok(json) => {
            let _ = tx.send(json);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize board event");
        }
    }
}

/// Relay one controller's events onto the WebSocket channel until the
/// controller is dropped.
pub async fn forward_events(mut rx: broadcast::Receiver<BoardEvent>, tx: broadcast::Sender<String>) {
    loop {
        match rx.recv().await {
            Ok(event) => broadcast_event(&tx, &event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event forwarder lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
