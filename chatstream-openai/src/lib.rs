#![deny(missing_docs)]
//! Streamed OpenAI chat completions.
//!
//! Sends a prompt to the
//! [Chat Completions API](https://platform.openai.com/docs/api-reference/chat)
//! with `stream: true` and decodes the server-sent event body into text
//! deltas as they arrive.
//!
//! Two ways to consume a stream:
//!
//! - [`OpenAi::stream`] returns a pull-based [`StreamHandle`].
//! - [`OpenAi::session`] returns a [`StreamSession`] that keeps one stream
//!   active at a time and pushes events to a [`StreamObserver`].
//!
//! Both end every stream with exactly one [`StreamEvent::Terminal`].
//!
//! # Usage
//!
//! ```no_run
//! use chatstream_openai::OpenAi;
//! use futures::StreamExt;
//!
//! # async fn run() {
//! let client = OpenAi::new("your-api-key");
//! let mut handle = client.stream("Say hello");
//! while let Some(event) = handle.receiver.next().await {
//!     if let Some(text) = event.text() {
//!         print!("{text}");
//!     }
//! }
//! # }
//! ```

pub mod client;
pub mod decoder;
pub(crate) mod error;
pub mod request;
pub mod session;
pub mod streaming;
pub mod transport;
pub mod types;

pub use client::OpenAi;
pub use decoder::{SseEvent, StreamDecoder};
pub use request::{ChatHttpRequest, RequestBuilder};
pub use session::{StreamSession, StreamState};
pub use transport::{ByteStream, HttpTransport, Transport, TransportResponse};

// Re-export chatstream-types for convenience
pub use chatstream_types::{
    Credential, StreamError, StreamEvent, StreamHandle, StreamObserver, TerminalSignal,
};
