//! Error taxonomy for streamed completions.

/// Terminal errors of a stream.
///
/// Per-line JSON failures and undecodable bytes are not errors: the decoder
/// skips them and the stream continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The request could not be built or serialized.
    #[error("bad encoding: {0}")]
    BadEncoding(String),
    /// The server answered with a non-2xx status.
    #[error("bad request: HTTP {status}")]
    BadRequest {
        /// HTTP status code of the response.
        status: u16,
    },
    /// Transport failure while the stream was open.
    #[error("unknown stream error: {0}")]
    Unknown(String),
}

/// The kind of a [`StreamError`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`StreamError::BadEncoding`].
    BadEncoding,
    /// See [`StreamError::BadRequest`].
    BadRequest,
    /// See [`StreamError::Unknown`].
    Unknown,
}

impl StreamError {
    /// The taxonomy kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadEncoding(_) => ErrorKind::BadEncoding,
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

/// Errors from loading client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("environment variable {0} not set")]
    MissingVar(String),
}
