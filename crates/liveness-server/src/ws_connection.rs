//! `WebSocket` implementation of the [`Connection`] seam.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::ws::Message;
use liveness_core::{Connection, ConnectionId, TransportError};
use metrics::counter;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::deadline::Deadline;
use crate::metrics::WS_SEND_DROPS_TOTAL;

/// A connected `WebSocket` client.
///
/// Frames are enqueued on a bounded channel drained by the session's writer
/// task, so sending never blocks the caller.
pub struct WsConnection {
    id: ConnectionId,
    tx: mpsc::Sender<Message>,
    deadline: Arc<Deadline>,
    connected_at: Instant,
    dropped: AtomicU64,
}

impl WsConnection {
    /// Wrap an outbound queue and the transport's deadline.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Message>, deadline: Arc<Deadline>) -> Self {
        Self {
            id,
            tx,
            deadline,
            connected_at: Instant::now(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue a frame for the writer task.
    pub fn send(&self, message: Message) -> Result<(), TransportError> {
        self.tx.try_send(message).map_err(|e| {
            let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
            let (err, reason) = match e {
                TrySendError::Full(_) => (TransportError::QueueFull, "queue_full"),
                TrySendError::Closed(_) => (TransportError::Closed, "closed"),
            };
            counter!(WS_SEND_DROPS_TOTAL, "reason" => reason).increment(1);
            err
        })
    }

    /// Frames that could not be enqueued.
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Time since the upgrade completed.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// The deadline this connection re-arms.
    pub fn deadline(&self) -> &Arc<Deadline> {
        &self.deadline
    }
}

impl Connection for WsConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn send_probe(&self) -> Result<(), TransportError> {
        self.send(Message::Ping(Bytes::new()))
    }

    fn arm_deadline(&self, window: Duration) {
        self.deadline.extend(window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection(capacity: usize) -> (WsConnection, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        let deadline = Arc::new(Deadline::new(Duration::from_secs(8)));
        (WsConnection::new("conn_1".into(), tx, deadline), rx)
    }

    #[tokio::test]
    async fn probe_is_an_empty_ping() {
        let (conn, mut rx) = make_connection(4);
        conn.send_probe().unwrap();
        match rx.recv().await.unwrap() {
            Message::Ping(payload) => assert!(payload.is_empty()),
            other => panic!("expected ping, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn full_queue_reports_queue_full() {
        let (conn, _rx) = make_connection(1);
        conn.send_probe().unwrap();
        assert_eq!(conn.send_probe(), Err(TransportError::QueueFull));
        assert_eq!(conn.drop_count(), 1);
    }

    #[tokio::test]
    async fn closed_queue_reports_closed() {
        let (conn, rx) = make_connection(4);
        drop(rx);
        assert_eq!(conn.send_probe(), Err(TransportError::Closed));
        assert_eq!(
            conn.send(Message::Text("late".into())),
            Err(TransportError::Closed)
        );
        assert_eq!(conn.drop_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn arm_deadline_extends_shared_deadline() {
        let (conn, _rx) = make_connection(4);
        tokio::time::advance(Duration::from_secs(5)).await;
        conn.arm_deadline(Duration::from_secs(8));
        assert_eq!(conn.deadline().remaining(), Duration::from_secs(8));
    }

    #[test]
    fn id_is_stable() {
        let (tx, _rx) = mpsc::channel(1);
        let deadline = Arc::new(Deadline::new(Duration::from_secs(1)));
        let conn = WsConnection::new("conn_x".into(), tx, deadline);
        assert_eq!(conn.id().as_str(), "conn_x");
    }
}
