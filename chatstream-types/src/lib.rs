#![deny(missing_docs)]
//! Shared types for streamed chat completions.
//!
//! This crate holds the vocabulary used by `chatstream-openai`: the request
//! model ([`ChatRequest`], [`Message`], [`Role`]), the opaque [`Credential`],
//! the events a stream produces ([`StreamEvent`], [`TerminalSignal`]), the
//! error taxonomy ([`StreamError`]) and the [`StreamObserver`] callback seam.

pub mod error;
pub mod observer;
pub mod stream;
pub mod types;

pub use error::*;
pub use observer::*;
pub use stream::*;
pub use types::*;
