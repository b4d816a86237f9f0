//! Hosted completion API client
//!
//! Implements CompletionClient by making HTTP calls to an
//! OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LlmSettings;
use crate::error::{Error, Result};

use super::{ChatMessage, CompletionClient, CompletionReply, CompletionRequest, TokenUsage};

// ─────────────────────────────────────────────────────────────────
// API wire types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────
// API Client
// ─────────────────────────────────────────────────────────────────

/// HTTP client for the hosted completion API
pub struct ApiClient {
    settings: LlmSettings,
    client: Client,
    total_requests: RwLock<u64>,
    total_tokens: RwLock<u64>,
}

impl ApiClient {
    /// Create a new API client with the given settings
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %settings.base_url,
            model = %settings.model,
            "Completion API client created"
        );

        Ok(Self {
            settings,
            client,
            total_requests: RwLock::new(0),
            total_tokens: RwLock::new(0),
        })
    }

    /// Total completion requests served so far
    pub fn total_requests(&self) -> u64 {
        *self.total_requests.read()
    }

    /// Total tokens consumed so far
    pub fn total_tokens(&self) -> u64 {
        *self.total_tokens.read()
    }

    /// Build the authorization header value (if API key is set)
    fn auth_header(&self) -> Option<String> {
        if self.settings.api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", self.settings.api_key))
        }
    }

    /// Classify an HTTP error status into a domain error
    fn status_error(status: reqwest::StatusCode, body: String) -> Error {
        match status.as_u16() {
            401 | 403 => Error::AuthFailed { message: body },
            429 => Error::RateLimited { message: body },
            s if s >= 500 => Error::Unavailable {
                message: format!("API error {}: {}", status, body),
            },
            _ => Error::InvalidRequest {
                message: format!("API error {}: {}", status, body),
            },
        }
    }
}

#[async_trait]
impl CompletionClient for ApiClient {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionReply> {
        let model = request.model.as_deref().unwrap_or(&self.settings.model);

        let request_body = ChatCompletionRequest {
            model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let url = format!("{}/chat/completions", self.settings.base_url);
        let mut last_error: Option<Error> = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(500 * 2u64.pow(attempt - 1));
                debug!(attempt, ?backoff, "Retrying after error");
                tokio::time::sleep(backoff).await;
            }

            let mut req = self.client.post(&url).json(&request_body);
            if let Some(ref auth) = self.auth_header() {
                req = req.header("Authorization", auth);
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed = response
                            .json::<ChatCompletionResponse>()
                            .await
                            .map_err(|e| Error::MalformedReply {
                                message: format!("Failed to parse API response: {}", e),
                            })?;

                        *self.total_requests.write() += 1;

                        let choice =
                            parsed.choices.first().ok_or_else(|| Error::MalformedReply {
                                message: "No choices in API response".to_string(),
                            })?;

                        let text = choice.message.content.clone().ok_or_else(|| {
                            Error::MalformedReply {
                                message: "Empty message content in API response".to_string(),
                            }
                        })?;

                        let usage = if let Some(u) = parsed.usage {
                            *self.total_tokens.write() += u.total_tokens as u64;
                            TokenUsage::new(u.prompt_tokens, u.completion_tokens)
                        } else {
                            TokenUsage::default()
                        };

                        return Ok(CompletionReply { text, usage });
                    } else if status.as_u16() == 429 || status.is_server_error() {
                        // Retryable error
                        let body = response.text().await.unwrap_or_default();
                        warn!(status = %status, attempt, "Retryable API error: {}", body);
                        last_error = Some(Self::status_error(status, body));
                    } else {
                        // Non-retryable error
                        let body = response.text().await.unwrap_or_default();
                        return Err(Self::status_error(status, body));
                    }
                }
                Err(e) => {
                    if e.is_timeout() {
                        warn!(attempt, error = %e, "Request timed out");
                        last_error = Some(Error::CompletionTimeout {
                            timeout_secs: self.settings.timeout_secs,
                        });
                    } else if e.is_connect() {
                        warn!(attempt, error = %e, "Retryable connection error");
                        last_error = Some(Error::Unavailable {
                            message: format!("Connection error: {}", e),
                        });
                    } else {
                        return Err(Error::Unavailable {
                            message: format!("Request error: {}", e),
                        });
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Unavailable {
            message: "All retry attempts exhausted".to_string(),
        }))
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
