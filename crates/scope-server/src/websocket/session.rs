//! Per-connection socket loop.
//!
//! Each accepted socket runs three pieces:
//! - a reader (this task) that relays peer frames in arrival order
//! - a writer task draining the connection's buffer and sending pings
//! - a heartbeat task that gives up on silent peers
//!
//! Whichever finishes first ends the connection. The registry entry is
//! removed by the [`Registration`](super::registry::Registration) guard on
//! every exit path.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use scope_core::{ConnectionId, FrameError, RelayFrame};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::connection::{ClientConnection, ConnectionRole};
use super::dispatcher::BroadcastDispatcher;
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use crate::metrics::{WS_HEARTBEAT_TIMEOUTS_TOTAL, WS_MALFORMED_FRAMES_TOTAL};
use crate::server::AppState;

/// Drive one accepted socket until it closes.
pub async fn run_connection(socket: WebSocket, role: ConnectionRole, state: AppState) {
    let (tx, rx) = mpsc::channel(state.config.send_queue_capacity);
    let connection = Arc::new(ClientConnection::new(ConnectionId::new(), role, tx));
    let _registration = state.registry.register_guarded(Arc::clone(&connection));
    info!(conn_id = %connection.id, role = %role, "socket connected");

    let (sink, stream) = socket.split();
    let shutdown = state.shutdown.token();
    let heartbeat_cancel = CancellationToken::new();

    let mut writer = tokio::spawn(write_loop(
        sink,
        rx,
        state.config.heartbeat_interval,
        shutdown.clone(),
    ));
    let mut heartbeat = tokio::spawn(run_heartbeat(
        Arc::clone(&connection),
        state.config.heartbeat_interval,
        state.config.heartbeat_timeout,
        heartbeat_cancel.clone(),
    ));

    tokio::select! {
        () = read_loop(stream, &connection, &state.dispatcher) => {
            debug!(conn_id = %connection.id, "peer closed the socket");
        }
        _ = &mut writer => {
            debug!(conn_id = %connection.id, "writer finished");
        }
        result = &mut heartbeat => {
            if let Ok(HeartbeatResult::TimedOut) = result {
                counter!(WS_HEARTBEAT_TIMEOUTS_TOTAL).increment(1);
                warn!(conn_id = %connection.id, "heartbeat timed out, closing socket");
            }
        }
    }

    connection.close();
    heartbeat_cancel.cancel();
    writer.abort();

    info!(
        conn_id = %connection.id,
        role = %role,
        age_ms = u64::try_from(connection.age().as_millis()).unwrap_or(u64::MAX),
        dropped = connection.drop_count(),
        "socket disconnected"
    );
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Utf8Bytes>,
    ping_every: Duration,
    shutdown: CancellationToken,
) {
    let mut ping = tokio::time::interval(ping_every);
    let _ = ping.tick().await;

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Some(text) = msg else { break };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            _ = ping.tick() => {
                if sink.send(Message::Ping(bytes::Bytes::new())).await.is_err() {
                    break;
                }
                trace!("sent ping");
            }
            () = shutdown.cancelled() => {
                let close = CloseFrame {
                    code: close_code::AWAY,
                    reason: Utf8Bytes::from_static("server shutting down"),
                };
                let _ = sink.send(Message::Close(Some(close))).await;
                break;
            }
        }
    }
}

async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    connection: &ClientConnection,
    dispatcher: &BroadcastDispatcher,
) {
    while let Some(next) = stream.next().await {
        let message = match next {
            Ok(message) => message,
            Err(e) => {
                debug!(conn_id = %connection.id, error = %e, "socket read failed");
                break;
            }
        };
        connection.mark_alive();
        match message {
            Message::Text(text) => {
                handle_frame(connection, dispatcher, || RelayFrame::parse(text.as_str()));
            }
            Message::Binary(bytes) => {
                handle_frame(connection, dispatcher, || RelayFrame::parse_bytes(&bytes));
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => break,
        }
    }
}

fn handle_frame<F>(connection: &ClientConnection, dispatcher: &BroadcastDispatcher, parse: F)
where
    F: FnOnce() -> Result<RelayFrame, FrameError>,
{
    if connection.role == ConnectionRole::Viewer {
        trace!(conn_id = %connection.id, "ignoring frame from viewer");
        return;
    }
    match parse() {
        Ok(frame) => {
            let len = frame.len();
            let report = dispatcher.relay_frame(frame, &connection.id);
            trace!(
                conn_id = %connection.id,
                bytes = len,
                recipients = report.recipients,
                "frame relayed"
            );
        }
        Err(e) => {
            counter!(WS_MALFORMED_FRAMES_TOTAL).increment(1);
            warn!(conn_id = %connection.id, error = %e, "dropping malformed frame");
        }
    }
}
