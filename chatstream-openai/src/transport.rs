//! The seam between stream handling and HTTP.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use chatstream_types::StreamError;
use futures::{Stream, StreamExt};

use crate::error::map_reqwest_error;
use crate::request::ChatHttpRequest;

/// Response body as a stream of raw chunks.
///
/// Dropping it closes the underlying connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// An opened response: status line plus body.
pub struct TransportResponse {
    /// HTTP status of the response.
    pub status: reqwest::StatusCode,
    /// The response body, delivered as it arrives.
    pub body: ByteStream,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Opens one HTTP response per request.
///
/// Connect failures are reported as [`StreamError::Unknown`].
pub trait Transport: Send + Sync + 'static {
    /// Send `request` and resolve once response headers have arrived.
    fn open(
        &self,
        request: ChatHttpRequest,
    ) -> impl Future<Output = Result<TransportResponse, StreamError>> + Send;
}

/// [`Transport`] backed by a shared [`reqwest::Client`].
///
/// The client has no total request timeout, so long-lived streams are never
/// cut off. Callers who need a deadline wrap the stream in their own timer.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a fresh client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing client (proxies, custom TLS, connection pool sharing).
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn open(
        &self,
        request: ChatHttpRequest,
    ) -> impl Future<Output = Result<TransportResponse, StreamError>> + Send {
        let http_client = self.client.clone();

        async move {
            let response = http_client
                .request(request.method, &request.url)
                .headers(request.headers)
                .body(request.body)
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = response.status();
            let body = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(map_reqwest_error));

            Ok(TransportResponse {
                status,
                body: Box::pin(body),
            })
        }
    }
}
