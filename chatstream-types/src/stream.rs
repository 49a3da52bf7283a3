//! Streaming event types for incremental completions.

use std::pin::Pin;

use futures::Stream;

use crate::error::StreamError;

/// Text a caller appends when the `[DONE]` sentinel arrives.
pub const DONE_MARKER: &str = "\n";

/// How a stream ended. Delivered exactly once per stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalSignal {
    /// The connection closed without error.
    Completed,
    /// The stream failed; the transport has already been released.
    Failed(StreamError),
    /// The stream was stopped or superseded by a newer one.
    Cancelled,
}

/// An event emitted during a streaming completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental text content.
    TextDelta(String),
    /// The server sent the `[DONE]` sentinel. The connection may still be open.
    Done,
    /// The stream is over. Nothing else of that stream follows.
    ///
    /// A session that rejects a `start` reports it with a `Failed` terminal
    /// of its own; a stream already running keeps delivering events.
    Terminal(TerminalSignal),
}

impl StreamEvent {
    /// Whether this is the last event of its stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    /// Text to append for this event, if any.
    ///
    /// `Done` maps to [`DONE_MARKER`].
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::TextDelta(t) => Some(t),
            Self::Done => Some(DONE_MARKER),
            Self::Terminal(_) => None,
        }
    }
}

/// Handle to a streaming completion.
///
/// The stream is lazy, single-consumer and finite: it ends right after one
/// [`StreamEvent::Terminal`]. Dropping it closes the connection.
pub struct StreamHandle {
    /// The stream of events. Consume with `StreamExt::next()`.
    pub receiver: Pin<Box<dyn Stream<Item = StreamEvent> + Send>>,
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}
