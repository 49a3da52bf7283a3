//! The single streaming operation: request in, ordered [`StreamEvent`]s out.

use std::sync::Arc;

use chatstream_types::{StreamError, StreamEvent, StreamHandle, TerminalSignal};
use futures::{Stream, StreamExt};

use crate::decoder::{SseEvent, StreamDecoder};
use crate::error::map_http_status;
use crate::request::ChatHttpRequest;
use crate::transport::{Transport, TransportResponse};

impl From<SseEvent> for StreamEvent {
    fn from(event: SseEvent) -> Self {
        match event {
            SseEvent::TextFragment(text) => StreamEvent::TextDelta(text),
            SseEvent::Done => StreamEvent::Done,
        }
    }
}

/// Open `request` on `transport` and wrap the response into a [`StreamHandle`].
///
/// Nothing happens until the handle is polled. The stream yields the decoded
/// fragments in arrival order and ends with exactly one
/// [`StreamEvent::Terminal`]:
///
/// - [`TerminalSignal::Completed`] when the body ends cleanly,
/// - [`TerminalSignal::Failed`] with [`StreamError::BadRequest`] for a non-2xx
///   status (no fragments are yielded),
/// - [`TerminalSignal::Failed`] with [`StreamError::Unknown`] when connecting
///   or reading the body fails.
///
/// The body is dropped before a failure is yielded, so the connection is
/// already released when the caller sees it.
pub fn open_stream<T: Transport>(transport: Arc<T>, request: ChatHttpRequest) -> StreamHandle {
    StreamHandle {
        receiver: Box::pin(event_stream(transport, request)),
    }
}

/// A handle that yields a single failure, for requests that could not be built.
pub fn failed_stream(error: StreamError) -> StreamHandle {
    let event = StreamEvent::Terminal(TerminalSignal::Failed(error));
    StreamHandle {
        receiver: Box::pin(futures::stream::once(async move { event })),
    }
}

fn event_stream<T: Transport>(
    transport: Arc<T>,
    request: ChatHttpRequest,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    async_stream::stream! {
        tracing::debug!(url = %request.url, "opening completion stream");

        let TransportResponse { status, mut body } = match transport.open(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(error = %err, "failed to open completion stream");
                yield StreamEvent::Terminal(TerminalSignal::Failed(err));
                return;
            }
        };

        if !status.is_success() {
            drop(body);
            tracing::warn!(status = status.as_u16(), "completion stream rejected");
            yield StreamEvent::Terminal(TerminalSignal::Failed(map_http_status(status)));
            return;
        }

        let mut decoder = StreamDecoder::new();
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(bytes) => bytes,
                Err(err) => {
                    drop(body);
                    tracing::debug!(error = %err, "completion stream aborted");
                    yield StreamEvent::Terminal(TerminalSignal::Failed(err));
                    return;
                }
            };

            for event in decoder.parse_chunk(&chunk) {
                yield event.into();
            }
        }

        for event in decoder.finish() {
            yield event.into();
        }

        tracing::debug!("completion stream finished");
        yield StreamEvent::Terminal(TerminalSignal::Completed);
    }
}
