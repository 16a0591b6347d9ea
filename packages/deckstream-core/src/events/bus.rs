//! Connection registry and filtered event fan-out.
//!
//! The [`EventBus`] owns every live client connection together with the
//! set of event types each client has subscribed to. Producers call
//! [`EventBus::publish`]; the bus records whitelisted events in its
//! [`EventHistory`] and writes the event to each matching connection.
//!
//! # Locking
//!
//! Two independent lock domains:
//! - the connection registry, held for the whole of a publish (history write
//!   and fan-out) and for every membership change;
//! - the history buffer, owned by [`EventHistory`].
//!
//! When both are needed the registry lock is taken first. Removing a
//! connection from the registry and closing its transport happen under the
//! same registry lock, so a publish never writes to a half-closed connection.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use futures::stream::{Stream, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use thiserror::Error;

use super::history::EventHistory;
use super::sink::EventSink;
use super::Event;
use crate::runtime::{TaskSpawner, TokioSpawner};

/// WebSocket close code for an endpoint going away (page navigation,
/// server shutdown).
const CLOSE_GOING_AWAY: u16 = 1001;

/// Close code for a normal, requested closure.
const CLOSE_NORMAL: u16 = 1000;

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Errors returned when writing a frame to a connection.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The connection is gone; it will not accept further frames.
    #[error("connection closed")]
    Closed,

    /// The connection's outbound queue is full; this frame was dropped.
    #[error("outbound queue full")]
    QueueFull,
}

/// Outbound half of a client connection, as seen by the bus.
///
/// `send` is called while the registry lock is held and must not block for
/// long. `close` must be idempotent.
pub trait ConnectionTransport: Send + Sync {
    /// Writes one JSON text frame.
    fn send(&self, frame: Arc<str>) -> Result<(), TransportError>;

    /// Releases the connection.
    fn close(&self);

    /// Human-readable peer description for logs.
    fn peer(&self) -> &str;
}

/// One inbound item from a client connection.
#[derive(Debug, Clone)]
pub enum InboundFrame {
    Text(String),
    Binary(Bytes),
    /// The client closed the connection, with the close code if one was sent.
    Closed { code: Option<u16> },
    /// The transport failed while reading.
    Error(String),
}

/// Client → server frame replacing the subscription set.
#[derive(Debug, Deserialize)]
struct SubscriptionRequest {
    subscriptions: Vec<String>,
}

fn is_expected_close(code: Option<u16>) -> bool {
    matches!(code, None | Some(CLOSE_NORMAL) | Some(CLOSE_GOING_AWAY))
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscription Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Identifies a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionHandle(u64);

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct Connection {
    transport: Arc<dyn ConnectionTransport>,
    subscriptions: HashSet<String>,
}

/// Per-connection record of subscribed event types.
///
/// Plain data; the [`EventBus`] wraps it in its registry lock.
#[derive(Default)]
pub struct SubscriptionRegistry {
    connections: HashMap<ConnectionHandle, Connection>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection with an empty subscription set.
    pub fn insert(&mut self, handle: ConnectionHandle, transport: Arc<dyn ConnectionTransport>) {
        self.connections.insert(
            handle,
            Connection {
                transport,
                subscriptions: HashSet::new(),
            },
        );
    }

    /// Removes a connection, returning its transport if it was present.
    pub fn remove(&mut self, handle: ConnectionHandle) -> Option<Arc<dyn ConnectionTransport>> {
        self.connections.remove(&handle).map(|c| c.transport)
    }

    /// Replaces the subscription set of a connection wholesale.
    ///
    /// Returns `false` if the connection is not registered.
    pub fn replace(&mut self, handle: ConnectionHandle, subscriptions: HashSet<String>) -> bool {
        match self.connections.get_mut(&handle) {
            Some(conn) => {
                conn.subscriptions = subscriptions;
                true
            }
            None => false,
        }
    }

    /// Returns the sorted subscription set of a connection.
    pub fn subscriptions(&self, handle: ConnectionHandle) -> Option<Vec<String>> {
        self.connections.get(&handle).map(|c| {
            let mut subs: Vec<String> = c.subscriptions.iter().cloned().collect();
            subs.sort();
            subs
        })
    }

    /// Iterates the connections subscribed to `event_type`.
    pub fn subscribers<'a>(
        &'a self,
        event_type: &'a str,
    ) -> impl Iterator<Item = (ConnectionHandle, &'a Arc<dyn ConnectionTransport>)> + 'a {
        self.connections
            .iter()
            .filter(move |(_, c)| c.subscriptions.contains(event_type))
            .map(|(handle, c)| (*handle, &c.transport))
    }

    /// Removes every connection, returning their transports.
    pub fn drain(&mut self) -> Vec<Arc<dyn ConnectionTransport>> {
        self.connections.drain().map(|(_, c)| c.transport).collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event Bus
// ─────────────────────────────────────────────────────────────────────────────

/// Delivers published events to subscribed connections.
///
/// Thread-safe: `publish` may be called from any producer thread while
/// connections come and go.
pub struct EventBus {
    registry: Mutex<SubscriptionRegistry>,
    history: EventHistory,
    next_id: AtomicU64,
    /// Runs per-connection inbound reader tasks.
    spawner: TokioSpawner,
}

impl EventBus {
    /// Creates a bus with no connections.
    pub fn new(history: EventHistory, spawner: TokioSpawner) -> Self {
        Self {
            registry: Mutex::new(SubscriptionRegistry::new()),
            history,
            next_id: AtomicU64::new(1),
            spawner,
        }
    }

    /// Records the event in history (if whitelisted) and writes it to every
    /// connection currently subscribed to its type.
    ///
    /// Connections registered after the registry lock is taken do not see
    /// this event. A failed write is logged and does not affect delivery to
    /// other connections; a connection reporting [`TransportError::Closed`]
    /// is removed.
    pub fn publish(&self, event: Event) {
        let mut registry = self.registry.lock();

        log::debug!(
            "[Bus] Emitting event: type={}, player={:?}",
            event.event_type(),
            event.player_id()
        );
        self.history.store(&event);

        let Some(frame) = event.to_frame() else {
            log::error!("[Bus] Failed to serialize {} event", event.event_type());
            return;
        };

        let mut closed = Vec::new();
        for (handle, transport) in registry.subscribers(event.event_type()) {
            if let Err(e) = transport.send(Arc::clone(&frame)) {
                log::warn!(
                    "[Bus] Failed to emit {} to {} ({}): {}",
                    event.event_type(),
                    handle,
                    transport.peer(),
                    e
                );
                if e == TransportError::Closed {
                    closed.push(handle);
                }
            }
        }

        for handle in closed {
            if let Some(transport) = registry.remove(handle) {
                transport.close();
                log::info!(
                    "[Bus] Dropped closed connection: {} (remaining: {})",
                    handle,
                    registry.len()
                );
            }
        }
    }

    /// Registers a connection and starts its inbound reader task.
    ///
    /// The connection starts with no subscriptions. The reader consumes
    /// `{"subscriptions": [...]}` frames from `inbound` until the stream
    /// ends, the client closes, a read fails, or a frame is malformed; the
    /// connection is then disconnected. History is not pushed here; callers
    /// that want a backfill use [`EventBus::history`].
    pub fn connect<S>(
        self: &Arc<Self>,
        transport: Arc<dyn ConnectionTransport>,
        inbound: S,
    ) -> ConnectionHandle
    where
        S: Stream<Item = InboundFrame> + Send + 'static,
    {
        let handle = self.register(transport);
        let bus = Arc::clone(self);
        self.spawner
            .spawn(async move { bus.read_subscriptions(handle, inbound).await });
        handle
    }

    /// Registers a connection without a reader task.
    pub fn register(&self, transport: Arc<dyn ConnectionTransport>) -> ConnectionHandle {
        let handle = ConnectionHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut registry = self.registry.lock();
        log::info!(
            "[Bus] Connection opened: {} ({}) (total: {})",
            handle,
            transport.peer(),
            registry.len() + 1
        );
        registry.insert(handle, transport);
        handle
    }

    /// Replaces the subscription set of a connection.
    ///
    /// Returns `false` if the connection is no longer registered.
    pub fn update_subscriptions<I>(&self, handle: ConnectionHandle, subscriptions: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        let subscriptions: HashSet<String> = subscriptions.into_iter().collect();
        let mut registry = self.registry.lock();
        log::debug!(
            "[Bus] Subscriptions updated for {}: {:?}",
            handle,
            subscriptions
        );
        registry.replace(handle, subscriptions)
    }

    /// Removes a connection and releases its transport. Idempotent.
    ///
    /// Returns `true` if the connection was registered.
    pub fn disconnect(&self, handle: ConnectionHandle) -> bool {
        let mut registry = self.registry.lock();
        match registry.remove(handle) {
            Some(transport) => {
                transport.close();
                log::info!(
                    "[Bus] Connection closed: {} ({}) (remaining: {})",
                    handle,
                    transport.peer(),
                    registry.len()
                );
                true
            }
            None => false,
        }
    }

    /// Disconnects every client. Returns how many were connected.
    pub fn close_all(&self) -> usize {
        let mut registry = self.registry.lock();
        let transports = registry.drain();
        for transport in &transports {
            transport.close();
        }
        if !transports.is_empty() {
            log::info!("[Bus] Force-closed {} connection(s)", transports.len());
        }
        transports.len()
    }

    /// Point-in-time copy of the replay history, oldest first.
    pub fn history(&self) -> Vec<Event> {
        self.history.snapshot()
    }

    /// Evicts history entries older than the TTL. Returns the number removed.
    pub fn trim_history(&self) -> usize {
        self.history.trim(Utc::now())
    }

    pub fn connection_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Number of connections currently subscribed to `event_type`.
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.registry.lock().subscribers(event_type).count()
    }

    /// Current subscriptions of a connection, sorted.
    pub fn subscriptions(&self, handle: ConnectionHandle) -> Option<Vec<String>> {
        self.registry.lock().subscriptions(handle)
    }

    /// Reads subscription updates until the connection ends, then removes it.
    async fn read_subscriptions<S>(self: Arc<Self>, handle: ConnectionHandle, inbound: S)
    where
        S: Stream<Item = InboundFrame>,
    {
        let mut inbound = std::pin::pin!(inbound);

        while let Some(frame) = inbound.next().await {
            let request = match frame {
                InboundFrame::Text(text) => serde_json::from_str::<SubscriptionRequest>(&text),
                InboundFrame::Binary(data) => serde_json::from_slice::<SubscriptionRequest>(&data),
                InboundFrame::Closed { code } => {
                    if !is_expected_close(code) {
                        log::warn!("[Bus] Unexpected close from {}: code={:?}", handle, code);
                    }
                    break;
                }
                InboundFrame::Error(e) => {
                    log::warn!("[Bus] Error reading from {}: {}", handle, e);
                    break;
                }
            };

            match request {
                Ok(request) => {
                    if !self.update_subscriptions(handle, request.subscriptions) {
                        // Removed by another path (publish on a closed
                        // transport, close_all).
                        return;
                    }
                }
                Err(e) => {
                    log::warn!("[Bus] Malformed subscription frame from {}: {}", handle, e);
                    break;
                }
            }
        }

        self.disconnect(handle);
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: Event) {
        EventBus::publish(self, event);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::AtomicBool;

    /// Transport double that records every frame it is sent.
    pub struct RecordingTransport {
        peer: String,
        frames: Mutex<Vec<String>>,
        closed: AtomicBool,
        failure: Mutex<Option<TransportError>>,
    }

    impl RecordingTransport {
        pub fn new(peer: &str) -> Arc<Self> {
            Arc::new(Self {
                peer: peer.to_string(),
                frames: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
                failure: Mutex::new(None),
            })
        }

        /// Makes subsequent sends fail with `error`.
        pub fn fail_with(&self, error: TransportError) {
            *self.failure.lock() = Some(error);
        }

        pub fn frames(&self) -> Vec<serde_json::Value> {
            self.frames
                .lock()
                .iter()
                .map(|f| serde_json::from_str(f).unwrap())
                .collect()
        }

        pub fn event_types(&self) -> Vec<String> {
            self.frames()
                .iter()
                .map(|f| f["event"].as_str().unwrap().to_string())
                .collect()
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    impl ConnectionTransport for RecordingTransport {
        fn send(&self, frame: Arc<str>) -> Result<(), TransportError> {
            if let Some(error) = self.failure.lock().clone() {
                return Err(error);
            }
            self.frames.lock().push(frame.to_string());
            Ok(())
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }

        fn peer(&self) -> &str {
            &self.peer
        }
    }
}
