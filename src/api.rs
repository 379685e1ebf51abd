// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;

use crate::broadcast::{Broadcaster, SnapshotListener};
use crate::snapshot::Snapshot;
use crate::source::SourceRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SourceRegistry>,
    pub broadcaster: Broadcaster,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/vehicles", get(vehicles))
        .route("/data.json", get(ws_upgrade))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn vehicles(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.registry.snapshot())
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Bridges the broadcaster to one WebSocket client. Frames go through a
/// bounded channel; when the client can't keep up the frame is dropped, so
/// a slow client never stalls a refresh task.
struct WsListener {
    tx: mpsc::Sender<String>,
}

impl SnapshotListener for WsListener {
    fn handle_snapshot(&self, snapshot: &Snapshot) {
        match serde_json::to_string(snapshot) {
            Ok(frame) => {
                let _ = self.tx.try_send(frame);
            }
            Err(e) => tracing::warn!(error = ?e, "snapshot serialization failed"),
        }
    }
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    // New clients get the current snapshot up front, then every subsequent
    // one as it is produced.
    if let Ok(initial) = serde_json::to_string(&state.registry.snapshot()) {
        if socket.send(Message::Text(initial.into())).await.is_err() {
            return;
        }
    }

    let (tx, mut rx) = mpsc::channel::<String>(8);
    let id = state.broadcaster.add_listener(Arc::new(WsListener { tx }));
    tracing::debug!(listener = ?id, "websocket client connected");

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    // Clients don't speak; pings are answered by axum.
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }

    state.broadcaster.remove_listener(id);
    tracing::debug!(listener = ?id, "websocket client disconnected");
}
