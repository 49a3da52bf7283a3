//! Request model and credential types.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human user.
    User,
    /// An AI assistant.
    Assistant,
    /// A system message.
    System,
}

/// A single message in a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored the message.
    pub role: Role,
    /// Plain text content.
    pub content: String,
}

impl Message {
    /// Create a `user` message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Body of a streaming chat completion request.
///
/// Built once per stream and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Ordered conversation messages.
    pub messages: Vec<Message>,
    /// Always `true`: responses are requested as an event stream.
    pub stream: bool,
}

impl ChatRequest {
    /// A streaming request with a single `user` message holding `prompt`.
    pub fn from_prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::user(prompt)],
            stream: true,
        }
    }
}

/// Opaque API credential, sent as a bearer token.
///
/// The value is zeroed on drop and never printed.
#[derive(Clone)]
pub struct Credential {
    inner: Zeroizing<String>,
}

impl Credential {
    /// Wrap a raw credential string.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: Zeroizing::new(value.into()),
        }
    }

    /// Scoped exposure of the raw value.
    pub fn with_value<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(&self.inner)
    }

    /// Returns true if the credential is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
