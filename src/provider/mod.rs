//! Gemini API client for chat-relay.
//!
//! The `generateContent` endpoint is stateless, so conversation history
//! lives client-side in a [`Conversation`] handle and is replayed on every
//! send.

mod gemini;

pub use gemini::{Conversation, GeminiClient, SendOutcome};

use thiserror::Error;

// ============================================================================
// Provider Error
// ============================================================================

/// Error from the Gemini API.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    pub status_code: Option<u16>,
}

// ============================================================================
// Conversation Messages
// ============================================================================

/// A message in a conversation, using the Gemini role vocabulary
/// ("user" / "model").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    /// Create a model message.
    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: "model".into(),
            content: content.into(),
        }
    }
}
