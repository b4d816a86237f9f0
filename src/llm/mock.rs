//! Mock completion client for testing
//!
//! Provides a scriptable implementation of CompletionClient for unit tests.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{Error, Result};

use super::{CompletionClient, CompletionReply, CompletionRequest, TokenUsage};

// ─────────────────────────────────────────────────────────────────
// Mock Client Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for mock client behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Simulated latency per call (ms)
    pub latency_ms: u64,

    /// Fail every completion call
    pub fail_completion: bool,

    /// Fail only the Nth call (1-based)
    pub fail_on_call: Option<u32>,

    /// Fixed response text used when the script queue is empty
    pub fixed_response: Option<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            latency_ms: 0,
            fail_completion: false,
            fail_on_call: None,
            fixed_response: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Mock Client
// ─────────────────────────────────────────────────────────────────

/// Mock implementation of CompletionClient for testing
pub struct MockClient {
    config: MockConfig,
    scripted: RwLock<VecDeque<String>>,
    calls: RwLock<u32>,
}

impl MockClient {
    /// Create a new mock client with default configuration
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a new mock client with custom configuration
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            scripted: RwLock::new(VecDeque::new()),
            calls: RwLock::new(0),
        }
    }

    /// Create a mock client that replays the given replies in order,
    /// then repeats the last one
    pub fn scripted(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let client = Self::new();
        for reply in replies {
            client.push_reply(reply);
        }
        client
    }

    /// Queue a reply for the next unanswered call
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.scripted.write().push_back(reply.into());
    }

    /// Get the number of completion calls made
    pub fn call_count(&self) -> u32 {
        *self.calls.read()
    }

    /// Reset the call count
    pub fn reset_counts(&self) {
        *self.calls.write() = 0;
    }

    /// Generate a predictable response from the last user message
    fn generate_response(&self, request: &CompletionRequest) -> String {
        if let Some(ref fixed) = self.config.fixed_response {
            return fixed.clone();
        }

        let last = request
            .messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or("");
        format!("mock reply to: {}", last)
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionReply> {
        let call_number = {
            let mut calls = self.calls.write();
            *calls += 1;
            *calls
        };

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        if self.config.fail_completion {
            return Err(Error::unavailable("Mock completion failure"));
        }

        if self.config.fail_on_call == Some(call_number) {
            return Err(Error::unavailable(format!(
                "Mock failure on call {}",
                call_number
            )));
        }

        let text = {
            let mut scripted = self.scripted.write();
            match scripted.len() {
                0 => self.generate_response(&request),
                // Keep the last scripted reply as the repeating tail
                1 => scripted.front().cloned().unwrap_or_default(),
                _ => scripted.pop_front().unwrap_or_default(),
            }
        };

        let prompt_tokens = request
            .messages
            .iter()
            .map(|m| m.content.split_whitespace().count())
            .sum::<usize>() as u32;
        let completion_tokens = text.split_whitespace().count() as u32;

        Ok(CompletionReply {
            text,
            usage: TokenUsage::new(prompt_tokens, completion_tokens),
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest::new(vec![ChatMessage::user(text)])
    }

    #[tokio::test]
    async fn test_mock_completion() {
        let client = MockClient::new();
        let reply = client.complete(request("Hello")).await.unwrap();

        assert!(reply.text.contains("Hello"));
        assert!(reply.usage.total_tokens > 0);
    }

    #[tokio::test]
    async fn test_fixed_response() {
        let client = MockClient::with_config(MockConfig {
            fixed_response: Some("always this".to_string()),
            ..Default::default()
        });

        let reply = client.complete(request("anything")).await.unwrap();
        assert_eq!(reply.text, "always this");
    }

    #[tokio::test]
    async fn test_scripted_replies() {
        let client = MockClient::scripted(["first", "second"]);

        assert_eq!(client.complete(request("a")).await.unwrap().text, "first");
        assert_eq!(client.complete(request("b")).await.unwrap().text, "second");
        // Last reply repeats once the script is exhausted
        assert_eq!(client.complete(request("c")).await.unwrap().text, "second");
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let client = MockClient::with_config(MockConfig {
            fail_completion: true,
            ..Default::default()
        });

        assert!(client.complete(request("x")).await.is_err());
    }

    #[tokio::test]
    async fn test_fail_on_specific_call() {
        let client = MockClient::with_config(MockConfig {
            fail_on_call: Some(2),
            ..Default::default()
        });

        assert!(client.complete(request("1")).await.is_ok());
        assert!(client.complete(request("2")).await.is_err());
        assert!(client.complete(request("3")).await.is_ok());
    }

    #[tokio::test]
    async fn test_call_counting() {
        let client = MockClient::new();

        let _ = client.complete(request("a")).await;
        let _ = client.complete(request("b")).await;
        let _ = client.complete(request("c")).await;

        assert_eq!(client.call_count(), 3);

        client.reset_counts();
        assert_eq!(client.call_count(), 0);
    }
}
