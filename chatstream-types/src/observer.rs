//! Callback seam for push-style consumers.

use crate::stream::StreamEvent;

/// Receives the events of a stream session.
///
/// Called from the session's dispatcher task, one event at a time, in order.
/// Implementations may call back into the session (e.g. `stop`) safely.
pub trait StreamObserver: Send + Sync + 'static {
    /// Handle one event.
    fn on_event(&self, event: StreamEvent);
}

impl<F> StreamObserver for F
where
    F: Fn(StreamEvent) + Send + Sync + 'static,
{
    fn on_event(&self, event: StreamEvent) {
        self(event)
    }
}

/// Forwards events into a channel. A closed receiver drops events.
impl StreamObserver for tokio::sync::mpsc::UnboundedSender<StreamEvent> {
    fn on_event(&self, event: StreamEvent) {
        let _ = self.send(event);
    }
}
