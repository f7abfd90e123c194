//! Shared application state for the HTTP server.

use std::time::Instant;
use tokio::sync::broadcast;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast channel for WebSocket updates.
    pub broadcast_tx: broadcast::Sender<String>,

    /// When the server started, for the health report.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(broadcast_tx: broadcast::Sender<String>) -> Self {
        Self {
            broadcast_tx,
            started_at: Instant::now(),
        }
    }

    /// Subscribe to the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.broadcast_tx.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_receive_broadcasts() {
        let (tx, _) = broadcast::channel::<String>(4);
        let state = AppState::new(tx);
        let mut rx = state.subscribe();

        state.broadcast_tx.send("hello".to_string()).unwrap();

        assert_eq!(rx.try_recv().unwrap(), "hello");
    }
}
