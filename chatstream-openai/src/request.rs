//! Builds the HTTP request for a streamed chat completion.

use chatstream_types::{ChatRequest, Credential, StreamError};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use zeroize::Zeroizing;

use crate::error::map_serde_error;

/// A fully built request, ready for a [`Transport`](crate::transport::Transport).
///
/// The `Authorization` header is marked sensitive, so `Debug` output does not
/// reveal the credential.
#[derive(Debug, Clone)]
pub struct ChatHttpRequest {
    /// Always `POST`.
    pub method: Method,
    /// Chat completions endpoint.
    pub url: String,
    /// `Content-Type` and `Authorization`.
    pub headers: HeaderMap,
    /// Serialized [`ChatRequest`].
    pub body: Vec<u8>,
}

/// Builds [`ChatHttpRequest`]s for a fixed endpoint and model.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    endpoint: String,
    model: String,
}

impl RequestBuilder {
    /// Create a builder for `endpoint` that requests `model`.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The model requests ask for.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build a request carrying `prompt` as a single `user` message.
    ///
    /// Fails with [`StreamError::BadEncoding`] if the body cannot be serialized
    /// or the credential is not a valid header value.
    pub fn build(
        &self,
        prompt: &str,
        credential: &Credential,
    ) -> Result<ChatHttpRequest, StreamError> {
        let body = serde_json::to_vec(&ChatRequest::from_prompt(self.model.as_str(), prompt))
            .map_err(map_serde_error)?;

        let bearer = credential.with_value(|key| Zeroizing::new(format!("Bearer {key}")));
        let mut authorization = HeaderValue::from_str(&bearer)
            .map_err(|e| StreamError::BadEncoding(format!("invalid credential: {e}")))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, authorization);

        Ok(ChatHttpRequest {
            method: Method::POST,
            url: self.endpoint.clone(),
            headers,
            body,
        })
    }
}
