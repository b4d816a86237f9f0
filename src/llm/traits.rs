//! Completion client trait definitions
//!
//! Defines the core CompletionClient trait that all clients must implement.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ─────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single chat message in API wire format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Request / Reply
// ─────────────────────────────────────────────────────────────────

/// A completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Message history, system prompt first
    pub messages: Vec<ChatMessage>,

    /// Model override (None = client default)
    pub model: Option<String>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Build a request from a message list with client defaults
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Override the model for this request
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Override the temperature for this request
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Token accounting returned by the API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A completion reply
#[derive(Debug, Clone)]
pub struct CompletionReply {
    /// Assistant message text
    pub text: String,

    /// Token usage, zeroed when the API omits it
    pub usage: TokenUsage,
}

// ─────────────────────────────────────────────────────────────────
// CompletionClient Trait
// ─────────────────────────────────────────────────────────────────

/// Core trait for completion clients
///
/// The trait is object-safe so agents, judges and the HTTP server can
/// share one client behind dynamic dispatch.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Get the client name (e.g., "api", "mock")
    fn name(&self) -> &'static str;

    /// Execute a chat completion
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionReply>;
}

/// Type alias for a shared client reference
pub type SharedClient = Arc<dyn CompletionClient>;

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = ChatMessage::system("be helpful");
        assert_eq!(msg.role, MessageRole::System);
        assert_eq!(msg.content, "be helpful");

        let msg = ChatMessage::user("hi");
        assert_eq!(msg.role, MessageRole::User);

        let msg = ChatMessage::assistant("hello");
        assert_eq!(msg.role, MessageRole::Assistant);
    }

    #[test]
    fn test_role_serialization() {
        let msg = ChatMessage::user("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));
    }

    #[test]
    fn test_request_builder() {
        let req = CompletionRequest::new(vec![ChatMessage::user("hi")])
            .with_model("test-model")
            .with_temperature(0.5);

        assert_eq!(req.model.as_deref(), Some("test-model"));
        assert_eq!(req.temperature, Some(0.5));
        assert!(req.max_tokens.is_none());
    }

    #[test]
    fn test_token_usage() {
        let usage = TokenUsage::new(10, 20);
        assert_eq!(usage.total_tokens, 30);
    }
}
