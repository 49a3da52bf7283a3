//! Internal error helpers for mapping HTTP/reqwest errors to [`StreamError`].

use chatstream_types::StreamError;

/// Map a non-success HTTP status to a [`StreamError`].
pub(crate) fn map_http_status(status: reqwest::StatusCode) -> StreamError {
    StreamError::BadRequest {
        status: status.as_u16(),
    }
}

/// Map a [`reqwest::Error`] raised while opening or reading a stream.
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> StreamError {
    if err.is_connect() {
        StreamError::Unknown(format!("connection failed: {err}"))
    } else if err.is_body() || err.is_decode() {
        StreamError::Unknown(format!("stream read error: {err}"))
    } else {
        StreamError::Unknown(err.to_string())
    }
}

/// Map a serialization failure while building a request.
pub(crate) fn map_serde_error(err: serde_json::Error) -> StreamError {
    StreamError::BadEncoding(format!("failed to serialize request: {err}"))
}
