//! Event sink abstraction for decoupling producers from fan-out.
//!
//! Producer adapters depend on the [`EventSink`] trait rather than on the
//! concrete [`EventBus`](super::EventBus), enabling testing and alternative
//! delivery paths.

use super::Event;

/// Trait for publishing events without knowledge of transport.
///
/// Implementations must be safe to call from arbitrary producer threads.
///
/// # Example
///
/// ```ignore
/// struct MyAdapter {
///     sink: Arc<dyn EventSink>,
/// }
///
/// impl MyAdapter {
///     fn on_something(&self) {
///         self.sink.publish(Event::new(kinds::SET_STARTED, None, EventData::None));
///     }
/// }
/// ```
pub trait EventSink: Send + Sync {
    /// Publishes one event.
    fn publish(&self, event: Event);
}

/// No-op sink for testing.
///
/// Events are silently discarded.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn publish(&self, _event: Event) {}
}

/// Logging sink for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn publish(&self, event: Event) {
        tracing::debug!(
            event_type = event.event_type(),
            player_id = ?event.player_id(),
            data = ?event.data(),
            "event"
        );
    }
}
