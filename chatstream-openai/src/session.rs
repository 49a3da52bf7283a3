//! Single-active-stream session with push-style delivery.
//!
//! A [`StreamSession`] owns at most one running stream. Starting a new one
//! cancels the previous stream first; that stream then gets
//! [`TerminalSignal::Cancelled`] before any event of the new stream reaches
//! the observer.
//!
//! Every stream runs in its own task. Events are tagged with the stream's id
//! and funneled through one dispatcher task that owns the observer. Cancelling
//! a stream marks its id, and from then on the dispatcher drops that stream's
//! queued fragments; only its `Cancelled` signal gets through. Once a terminal
//! event for an id is delivered, nothing else tagged with that id is.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chatstream_types::{
    Credential, StreamError, StreamEvent, StreamHandle, StreamObserver, TerminalSignal,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::request::RequestBuilder;
use crate::streaming::open_stream;
use crate::transport::Transport;

/// Lifecycle state of a [`StreamSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No stream has been started yet.
    Idle,
    /// A stream is running.
    Active,
    /// The last stream ended (completed, failed or cancelled).
    Terminated,
}

enum Envelope {
    /// An event of a started stream.
    Stream { id: u64, event: StreamEvent },
    /// A `start` whose request could not be built. Never had a connection.
    Rejected(StreamError),
}

struct ActiveStream {
    id: u64,
    cancel: CancellationToken,
}

struct SessionInner {
    state: StreamState,
    next_id: u64,
    active: Option<ActiveStream>,
}

/// Runs one streamed completion at a time and reports to a [`StreamObserver`].
///
/// # Example
///
/// ```no_run
/// use chatstream_openai::OpenAi;
/// use chatstream_types::StreamEvent;
///
/// # async fn run() {
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
/// let session = OpenAi::new("sk-...").session(tx);
/// session.start("Tell me a story");
/// while let Some(event) = rx.recv().await {
///     if let Some(text) = event.text() {
///         print!("{text}");
///     }
///     if event.is_terminal() {
///         break;
///     }
/// }
/// # }
/// ```
pub struct StreamSession<T: Transport> {
    transport: Arc<T>,
    builder: RequestBuilder,
    credential: Credential,
    inner: Arc<Mutex<SessionInner>>,
    events: mpsc::UnboundedSender<Envelope>,
    /// Cancelled streams whose `Cancelled` signal is not delivered yet.
    silenced: Arc<Mutex<HashSet<u64>>>,
}

impl<T: Transport> StreamSession<T> {
    /// Create an idle session.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime: the observer dispatcher is
    /// spawned here.
    pub fn new(
        transport: T,
        builder: RequestBuilder,
        credential: Credential,
        observer: impl StreamObserver,
    ) -> Self {
        let (events, rx) = mpsc::unbounded_channel();
        let silenced = Arc::new(Mutex::new(HashSet::new()));
        tokio::spawn(dispatch(rx, Arc::clone(&silenced), observer));

        Self {
            transport: Arc::new(transport),
            builder,
            credential,
            inner: Arc::new(Mutex::new(SessionInner {
                state: StreamState::Idle,
                next_id: 1,
                active: None,
            })),
            events,
            silenced,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        lock(&self.inner).state
    }

    /// Start streaming a completion for `prompt`.
    ///
    /// If the request cannot be built the observer gets
    /// `Terminal(Failed(BadEncoding))` and any running stream is left alone.
    /// That signal closes only the rejected start: events of the running
    /// stream, including its own terminal, still follow it.
    ///
    /// Otherwise a running stream is cancelled first and the new one becomes
    /// active.
    pub fn start(&self, prompt: &str) {
        let request = match self.builder.build(prompt, &self.credential) {
            Ok(request) => request,
            Err(err) => {
                tracing::debug!(error = %err, "rejecting stream start");
                let _ = self.events.send(Envelope::Rejected(err));
                return;
            }
        };

        let mut inner = lock(&self.inner);
        if let Some(previous) = inner.active.take() {
            tracing::debug!(stream = previous.id, "superseding active stream");
            cancel_stream(previous, &self.silenced, &self.events);
        }

        let id = inner.next_id;
        inner.next_id += 1;
        let cancel = CancellationToken::new();
        inner.active = Some(ActiveStream {
            id,
            cancel: cancel.clone(),
        });
        inner.state = StreamState::Active;

        tracing::debug!(stream = id, model = %self.builder.model(), "starting stream");
        let handle = open_stream(Arc::clone(&self.transport), request);
        tokio::spawn(run_stream(
            id,
            handle,
            cancel,
            Arc::clone(&self.inner),
            self.events.clone(),
        ));
    }

    /// Cancel the running stream, if any. Idempotent.
    ///
    /// The cancelled stream gets `Terminal(Cancelled)` and nothing after it.
    pub fn stop(&self) {
        let mut inner = lock(&self.inner);
        if let Some(active) = inner.active.take() {
            tracing::debug!(stream = active.id, "stopping stream");
            inner.state = StreamState::Terminated;
            cancel_stream(active, &self.silenced, &self.events);
        }
    }
}

impl<T: Transport> Drop for StreamSession<T> {
    fn drop(&mut self) {
        if let Some(active) = lock(&self.inner).active.take() {
            lock(&self.silenced).insert(active.id);
            active.cancel.cancel();
        }
    }
}

impl<T: Transport> std::fmt::Debug for StreamSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("state", &self.state())
            .field("endpoint", &self.builder.endpoint())
            .finish_non_exhaustive()
    }
}

fn lock<S>(inner: &Mutex<S>) -> MutexGuard<'_, S> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Caller holds the session lock, so the signal is queued before any event of
/// a stream started afterwards.
fn cancel_stream(
    stream: ActiveStream,
    silenced: &Mutex<HashSet<u64>>,
    events: &mpsc::UnboundedSender<Envelope>,
) {
    lock(silenced).insert(stream.id);
    stream.cancel.cancel();
    let _ = events.send(Envelope::Stream {
        id: stream.id,
        event: StreamEvent::Terminal(TerminalSignal::Cancelled),
    });
}

async fn run_stream(
    id: u64,
    mut handle: StreamHandle,
    cancel: CancellationToken,
    inner: Arc<Mutex<SessionInner>>,
    events: mpsc::UnboundedSender<Envelope>,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            next = handle.receiver.next() => match next {
                Some(event) => event,
                None => return,
            },
        };

        if event.is_terminal() {
            let mut guard = lock(&inner);
            let current = guard.active.as_ref().is_some_and(|a| a.id == id);
            if !current {
                // Already stopped or superseded; `Cancelled` was queued for it.
                return;
            }
            guard.active = None;
            guard.state = StreamState::Terminated;
            tracing::debug!(stream = id, ?event, "stream terminated");
            let _ = events.send(Envelope::Stream { id, event });
            return;
        }

        let _ = events.send(Envelope::Stream { id, event });
    }
}

async fn dispatch(
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    silenced: Arc<Mutex<HashSet<u64>>>,
    observer: impl StreamObserver,
) {
    let mut closed_through = 0;
    while let Some(envelope) = rx.recv().await {
        match envelope {
            Envelope::Rejected(err) => {
                observer.on_event(StreamEvent::Terminal(TerminalSignal::Failed(err)));
            }
            Envelope::Stream { id, event } => {
                let terminal = event.is_terminal();
                let cancelled = {
                    let mut silenced = lock(&silenced);
                    if terminal {
                        silenced.remove(&id)
                    } else {
                        silenced.contains(&id)
                    }
                };
                if id <= closed_through || (cancelled && !terminal) {
                    tracing::trace!(stream = id, "dropping event of closed stream");
                    continue;
                }
                if terminal {
                    closed_through = id;
                }
                observer.on_event(event);
            }
        }
    }
}
