//! WebSocket transport for the event bus.
//!
//! Each upgraded socket becomes one bus connection:
//! - outbound frames go through a bounded queue drained by a writer loop,
//!   so a publish never waits on a socket write;
//! - inbound messages are mapped to [`InboundFrame`]s and consumed by the
//!   bus's reader task.
//!
//! Closing the connection (from the bus, a client close, or server shutdown)
//! cancels the connection's token, which stops the writer and the reader.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::sink::SinkExt;
use futures::stream::{SplitSink, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::api::AppState;
use crate::events::{ConnectionTransport, InboundFrame, TransportError};

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Outbound half of a websocket connection as registered with the bus.
struct WsTransport {
    peer: String,
    frames: mpsc::Sender<Arc<str>>,
    cancel: CancellationToken,
}

impl ConnectionTransport for WsTransport {
    fn send(&self, frame: Arc<str>) -> Result<(), TransportError> {
        if self.cancel.is_cancelled() {
            return Err(TransportError::Closed);
        }
        self.frames.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::QueueFull,
            TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    fn close(&self) {
        self.cancel.cancel();
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}

/// Maps a websocket read into a bus frame. Control frames are dropped.
fn to_inbound(msg: Result<Message, axum::Error>) -> Option<InboundFrame> {
    match msg {
        Ok(Message::Text(text)) => Some(InboundFrame::Text(text.as_str().to_owned())),
        Ok(Message::Binary(data)) => Some(InboundFrame::Binary(data)),
        Ok(Message::Close(frame)) => Some(InboundFrame::Closed {
            code: frame.map(|f| f.code),
        }),
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
        Err(e) => Some(InboundFrame::Error(e.to_string())),
    }
}

/// Serializes the history snapshot as one JSON array frame.
fn backfill_frame(state: &AppState) -> Option<Arc<str>> {
    match serde_json::to_string(&state.bus.history()) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            log::error!("[WS] Failed to serialize history backfill: {}", e);
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handler
// ─────────────────────────────────────────────────────────────────────────────

/// WebSocket upgrade handler for `/events`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, remote_addr.to_string(), state))
}

/// Runs one websocket connection to completion.
async fn handle_ws(socket: WebSocket, peer: String, state: AppState) {
    let (sender, receiver) = socket.split();

    let cancel_token = state.shutdown.child_token();
    let (frames_tx, frames_rx) = mpsc::channel(state.outbound_queue_capacity());
    let transport = Arc::new(WsTransport {
        peer,
        frames: frames_tx,
        cancel: cancel_token.clone(),
    });

    // Queued before registration so it precedes any live event.
    if state.backfill_on_connect() {
        if let Some(frame) = backfill_frame(&state) {
            if let Err(e) = transport.send(frame) {
                log::warn!("[WS] Failed to queue history backfill: {}", e);
            }
        }
    }

    let inbound = receiver
        .filter_map(|msg| futures::future::ready(to_inbound(msg)))
        .take_until(cancel_token.clone().cancelled_owned());
    let handle = state.bus.connect(transport, inbound);

    write_frames(sender, frames_rx, &cancel_token).await;

    state.bus.disconnect(handle);
}

/// Drains the outbound queue into the socket until the connection is
/// cancelled or a write fails.
async fn write_frames(
    mut sender: SplitSink<WebSocket, Message>,
    frames: mpsc::Receiver<Arc<str>>,
    cancel_token: &CancellationToken,
) {
    let mut frames = ReceiverStream::new(frames);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            frame = frames.next() => {
                let Some(frame) = frame else { break };
                if let Err(e) = sender.send(Message::Text(frame.to_string().into())).await {
                    log::warn!("[WS] Write failed: {}", e);
                    cancel_token.cancel();
                    break;
                }
            }
        }
    }

    let _ = sender.close().await;
}
