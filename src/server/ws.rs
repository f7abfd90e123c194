//! WebSocket handler for live statistics updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::server::state::AppState;
use crate::store::statistics_message;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Subscribes to updates, then takes the initial snapshot.
///
/// An update published while the snapshot is built is still delivered.
fn subscribe_with_snapshot<F>(
    state: &AppState,
    snapshot: F,
) -> (broadcast::Receiver<String>, Option<String>)
where
    F: FnOnce() -> Option<String>,
{
    let rx = state.subscribe();
    (rx, snapshot())
}

/// Handles an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (mut rx, initial) = subscribe_with_snapshot(&state, statistics_message);
    if let Some(initial) = initial {
        let _ = sender.send(Message::Text(initial)).await;
    }

    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if sender.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "WebSocket client lagged behind updates");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Clients only listen; anything but Close is ignored
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    tracing::debug!("WebSocket connection closed");
}
