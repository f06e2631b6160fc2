//! WebSocket listener: subscriber upgrades plus the `/health` and
//! `/clients` helper endpoints.
//!
//! Each subscriber gets its own writer task fed by a bounded mailbox;
//! the broadcast step never performs a socket write itself, so one
//! stalled peer cannot block the engine reader or the other
//! subscribers.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::registry::{Registry, SubscriberMessage, SubscriberSummary, MAILBOX_CAPACITY};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(registry: Arc<Registry>) -> Self {
        AppState {
            registry,
            started_at: Utc::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/clients", get(clients))
        .with_state(state)
}

/// Serve until `shutdown` resolves, then stop accepting and finish.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_subscriber(state, socket, peer))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "subscribers": state.registry.len(),
        "uptime-secs": (Utc::now() - state.started_at).num_seconds(),
    }))
}

async fn clients(State(state): State<AppState>) -> Json<Vec<SubscriberSummary>> {
    Json(state.registry.summaries())
}

/// One upgraded subscriber connection.
async fn serve_subscriber(state: AppState, socket: WebSocket, peer: SocketAddr) {
    let (mailbox_tx, mut mailbox_rx) = mpsc::channel(MAILBOX_CAPACITY);
    let id = state.registry.insert(mailbox_tx, peer.to_string());
    info!(subscriber = %id, %peer, "subscriber connected");

    let (mut sink, mut stream) = socket.split();

    // Writer: sole owner of the send half. Ends when every mailbox
    // sender is gone, i.e. when the registry entry is removed.
    tokio::spawn(async move {
        while let Some(msg) = mailbox_rx.recv().await {
            let result = match msg {
                SubscriberMessage::Event(text) => {
                    sink.send(Message::Text(text.to_string().into())).await
                }
                SubscriberMessage::Pong(payload) => {
                    sink.send(Message::Pong(payload.into())).await
                }
                SubscriberMessage::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            };
            if result.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    // Reader: pings and the close handshake. Client binary frames are
    // ignored; clients have nothing to tell us in this direction.
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Ping(payload)) => state.registry.pong(id, payload.to_vec()),
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(Message::Binary(_)) => debug!(subscriber = %id, "binary frame ignored"),
            Ok(_) => {}
        }
    }

    if state.registry.remove(id) {
        info!(subscriber = %id, %peer, "subscriber disconnected");
    }
}
