//! OpenAI API client struct and builder.

use std::sync::Arc;

use chatstream_types::{ConfigError, Credential, DEFAULT_MODEL, StreamHandle, StreamObserver};

use crate::request::RequestBuilder;
use crate::session::StreamSession;
use crate::streaming::{failed_stream, open_stream};
use crate::transport::HttpTransport;

/// Default OpenAI API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
/// Environment variable overriding the base URL.
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
/// Environment variable overriding the model.
pub const MODEL_VAR: &str = "OPENAI_MODEL";

/// Client for streamed OpenAI chat completions.
///
/// # Example
///
/// ```no_run
/// use chatstream_openai::OpenAi;
///
/// let client = OpenAi::new("sk-...")
///     .model("gpt-4o-mini")
///     .base_url("https://api.openai.com");
/// ```
#[derive(Debug, Clone)]
pub struct OpenAi {
    /// API key, sent as a bearer token.
    pub(crate) credential: Credential,
    /// Model identifier sent with every request.
    pub(crate) model: String,
    /// API base URL (override for testing or proxies).
    pub(crate) base_url: String,
    /// Shared HTTP transport.
    pub(crate) transport: HttpTransport,
}

impl OpenAi {
    /// Create a new client with the given API key and sensible defaults.
    ///
    /// Default model: `gpt-4o-mini`.
    /// Default base URL: `https://api.openai.com`.
    pub fn new(credential: impl Into<Credential>) -> Self {
        Self {
            credential: credential.into(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            transport: HttpTransport::new(),
        }
    }

    /// Build a client from `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_MODEL`.
    ///
    /// Only the API key is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`OpenAi::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let key = lookup(API_KEY_VAR).ok_or_else(|| ConfigError::MissingVar(API_KEY_VAR.into()))?;
        let mut client = Self::new(key);
        if let Some(url) = lookup(BASE_URL_VAR).filter(|v| !v.is_empty()) {
            client = client.base_url(url);
        }
        if let Some(model) = lookup(MODEL_VAR).filter(|v| !v.is_empty()) {
            client = client.model(model);
        }
        Ok(client)
    }

    /// Override the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL.
    ///
    /// Useful for testing with a local mock server or an API proxy.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a preconfigured [`reqwest::Client`].
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.transport = HttpTransport::with_client(client);
        self
    }

    /// Build the chat completions endpoint URL.
    pub(crate) fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    /// A [`RequestBuilder`] for this client's endpoint and model.
    pub fn request_builder(&self) -> RequestBuilder {
        RequestBuilder::new(self.completions_url(), self.model.clone())
    }

    /// Stream a completion for `prompt`.
    ///
    /// The returned handle yields text deltas and ends with one terminal
    /// event. A request that cannot be built yields a single
    /// `Terminal(Failed(BadEncoding))`.
    pub fn stream(&self, prompt: &str) -> StreamHandle {
        match self.request_builder().build(prompt, &self.credential) {
            Ok(request) => open_stream(Arc::new(self.transport.clone()), request),
            Err(err) => failed_stream(err),
        }
    }

    /// Create a [`StreamSession`] reporting to `observer`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn session(&self, observer: impl StreamObserver) -> StreamSession<HttpTransport> {
        StreamSession::new(
            self.transport.clone(),
            self.request_builder(),
            self.credential.clone(),
            observer,
        )
    }
}
