//! Wire types for the chat completions event stream.
//!
//! Reference: <https://platform.openai.com/docs/api-reference/chat/streaming>

use serde::Deserialize;

/// One `data:` payload of a streamed chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    /// Completion choices; only the first one is surfaced.
    pub choices: Vec<ChunkChoice>,
}

/// A choice within a [`ChatChunk`].
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    /// Incremental content for this choice.
    pub delta: ChunkDelta,
}

/// The incremental part of a choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    /// Set on the first chunk of a response.
    #[serde(default)]
    pub role: Option<String>,
    /// Text fragment, absent or null on role-only and finish chunks.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatChunk {
    /// Content of `choices[0].delta`, if any.
    #[must_use]
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
    }
}
