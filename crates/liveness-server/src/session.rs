//! One `WebSocket` client from upgrade through close.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use futures::{SinkExt, StreamExt};
use liveness_core::{CloseCause, ConnectionId, ConnectionLifecycle};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::deadline::Deadline;
use crate::handler::{Inbound, classify};
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::ws_connection::WsConnection;

/// How long the writer gets to flush a final Close frame.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Run a session for an upgraded socket.
///
/// Registers the connection, echoes data frames, re-arms the deadline on
/// every inbound frame and pong, and reports exactly one close with its
/// cause. Returns that cause.
#[instrument(skip_all, fields(conn_id = %id))]
pub async fn run_ws_session(
    ws: WebSocket,
    id: ConnectionId,
    lifecycle: ConnectionLifecycle,
    queue_capacity: usize,
    shutdown: CancellationToken,
) -> CloseCause {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<Message>(queue_capacity.max(1));

    let deadline = Arc::new(Deadline::new(lifecycle.policy().deadline()));
    let connection = Arc::new(WsConnection::new(id.clone(), send_tx, deadline.clone()));

    let started = Instant::now();
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    lifecycle.on_open(connection.clone());

    let mut writer = tokio::spawn(async move {
        while let Some(msg) = send_rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if ws_tx.send(msg).await.is_err() || closing {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });
    let mut writer_done = false;

    let cause = loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break CloseCause::ServerShutdown,
            () = deadline.expired() => break CloseCause::DeadlineExpired,
            _ = &mut writer => {
                writer_done = true;
                break CloseCause::IoError;
            }
            frame = ws_rx.next() => match frame {
                None => break CloseCause::PeerClosed,
                Some(Err(e)) => {
                    debug!(error = %e, "websocket read failed");
                    break CloseCause::IoError;
                }
                Some(Ok(msg)) => match classify(msg) {
                    Inbound::Close => break CloseCause::PeerClosed,
                    Inbound::ProbeAck => lifecycle.on_probe_ack(connection.as_ref()),
                    Inbound::PeerPing => lifecycle.on_activity(connection.as_ref()),
                    Inbound::Data(reply) => {
                        if let Err(e) = connection.send(reply) {
                            warn!(error = %e, "failed to enqueue echo");
                        }
                        lifecycle.on_activity(connection.as_ref());
                    }
                },
            },
        }
    };

    if let Some(frame) = close_frame(cause) {
        let _ = connection.send(Message::Close(Some(frame)));
    }
    let _ = lifecycle.on_close(&id, cause);

    // Dropping the last sender lets the writer drain and exit.
    drop(connection);
    if !writer_done && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }

    counter!(WS_DISCONNECTIONS_TOTAL, "cause" => cause.as_str()).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    info!(%cause, "session ended");
    cause
}

/// The Close frame we send for causes the server initiates.
fn close_frame(cause: CloseCause) -> Option<CloseFrame> {
    let (code, reason) = match cause {
        CloseCause::DeadlineExpired => (close_code::POLICY, "keepalive deadline expired"),
        CloseCause::ServerShutdown => (close_code::AWAY, "server shutting down"),
        CloseCause::PeerClosed | CloseCause::IoError => return None,
    };
    Some(CloseFrame {
        code,
        reason: reason.into(),
    })
}
