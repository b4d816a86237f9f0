//! Error types for simchat
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Retryable / fatal classification
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::profile::AgentRole;

/// Result type alias for simchat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoNotFound = 203,

    // Completion-capability errors (3xx)
    RateLimited = 300,
    Unavailable = 301,
    CompletionTimeout = 302,
    InvalidRequest = 303,
    AuthFailed = 304,
    MalformedReply = 305,

    // Profile errors (4xx)
    UnknownProfile = 400,
    ProfileInvalid = 401,

    // Conversation errors (5xx)
    AgentCallFailed = 500,
    ConversationState = 501,

    // Persistence errors (6xx)
    TranscriptWrite = 600,
    TranscriptRead = 601,
    TranscriptParse = 602,

    // Judge errors (7xx)
    JudgePassFailed = 700,
    AllJudgesFailed = 701,
    JudgeParse = 702,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Completion-capability errors
            400..=499 => 40, // Profile errors
            500..=599 => 50, // Conversation errors
            600..=699 => 60, // Persistence errors
            700..=799 => 70, // Judge errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for simchat
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration error (parse or validation)
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Completion-Capability Errors
    // ─────────────────────────────────────────────────────────────

    /// The API rejected the request with 429
    #[error("Completion API rate limited: {message}")]
    RateLimited { message: String },

    /// The API returned a 5xx or could not be reached
    #[error("Completion API unavailable: {message}")]
    Unavailable { message: String },

    /// The call exceeded its timeout
    #[error("Completion call timed out after {timeout_secs}s")]
    CompletionTimeout { timeout_secs: u64 },

    /// The API rejected the request as malformed (4xx)
    #[error("Completion API rejected request: {message}")]
    InvalidRequest { message: String },

    /// Authentication with the API failed
    #[error("Completion API authentication failed: {message}")]
    AuthFailed { message: String },

    /// The API reply body could not be interpreted
    #[error("Malformed completion reply: {message}")]
    MalformedReply { message: String },

    // ─────────────────────────────────────────────────────────────
    // Profile Errors
    // ─────────────────────────────────────────────────────────────

    /// Profile name not in the closed registry set
    #[error("Unknown profile '{name}'. Run 'simchat profile list' to see available profiles")]
    UnknownProfile { name: String },

    /// Bundled or loaded profile failed validation
    #[error("Invalid profile '{name}': {reason}")]
    ProfileInvalid { name: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Conversation Errors
    // ─────────────────────────────────────────────────────────────

    /// An agent call failed mid-conversation
    #[error("{speaker} agent call failed at turn {turn_index}: {source}")]
    AgentCallFailed {
        speaker: AgentRole,
        turn_index: usize,
        #[source]
        source: Box<Error>,
    },

    /// Orchestrator driven through an invalid state transition
    #[error("Invalid conversation state: {0}")]
    ConversationState(String),

    // ─────────────────────────────────────────────────────────────
    // Persistence Errors
    // ─────────────────────────────────────────────────────────────

    /// Transcript write failure
    #[error("Failed to write transcript {path}: {message}")]
    TranscriptWrite { path: PathBuf, message: String },

    /// Transcript read failure
    #[error("Failed to read transcript {path}: {message}")]
    TranscriptRead { path: PathBuf, message: String },

    /// Transcript JSON did not parse back into a conversation
    #[error("Failed to parse transcript {path}: {message}")]
    TranscriptParse { path: PathBuf, message: String },

    // ─────────────────────────────────────────────────────────────
    // Judge Errors
    // ─────────────────────────────────────────────────────────────

    /// A single judge pass failed
    #[error("Judge pass '{judge}' failed: {source}")]
    JudgePassFailed {
        judge: String,
        #[source]
        source: Box<Error>,
    },

    /// Every judge pass failed; no synthesis possible
    #[error("All {count} judge passes failed")]
    AllJudgesFailed { count: usize, errors: Vec<String> },

    /// Judge reply did not contain the expected JSON assessment
    #[error("Judge reply could not be parsed: {message}")]
    JudgeParse { message: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                _ => ErrorCode::IoRead,
            },

            Error::RateLimited { .. } => ErrorCode::RateLimited,
            Error::Unavailable { .. } => ErrorCode::Unavailable,
            Error::CompletionTimeout { .. } => ErrorCode::CompletionTimeout,
            Error::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            Error::AuthFailed { .. } => ErrorCode::AuthFailed,
            Error::MalformedReply { .. } => ErrorCode::MalformedReply,

            Error::UnknownProfile { .. } => ErrorCode::UnknownProfile,
            Error::ProfileInvalid { .. } => ErrorCode::ProfileInvalid,

            Error::AgentCallFailed { .. } => ErrorCode::AgentCallFailed,
            Error::ConversationState(_) => ErrorCode::ConversationState,

            Error::TranscriptWrite { .. } => ErrorCode::TranscriptWrite,
            Error::TranscriptRead { .. } => ErrorCode::TranscriptRead,
            Error::TranscriptParse { .. } => ErrorCode::TranscriptParse,

            Error::JudgePassFailed { .. } => ErrorCode::JudgePassFailed,
            Error::AllJudgesFailed { .. } => ErrorCode::AllJudgesFailed,
            Error::JudgeParse { .. } => ErrorCode::JudgeParse,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error is transient (safe for the caller to retry the
    /// whole conversation or judge pass)
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimited { .. }
            | Error::Unavailable { .. }
            | Error::CompletionTimeout { .. }
            | Error::Io(_)
            | Error::IoRead { .. }
            | Error::IoWrite { .. } => true,
            Error::AgentCallFailed { source, .. } => source.is_retryable(),
            Error::JudgePassFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Check if the error is fatal (process should exit)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::Config(_)
                | Error::AuthFailed { .. }
                | Error::Internal(_)
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => {
                Some("Run 'simchat config init' to create a default configuration file.")
            }
            Error::Config(_) => Some(
                "Check your configuration file syntax. Run 'simchat config validate' to see details.",
            ),
            Error::RateLimited { .. } => {
                Some("The completion API is throttling requests. Wait and re-run, or lower the batch size.")
            }
            Error::Unavailable { .. } => {
                Some("The completion API is unreachable. Check your network and the [llm] base_url setting.")
            }
            Error::CompletionTimeout { .. } => {
                Some("Increase [llm] timeout_secs or try a smaller max_turns.")
            }
            Error::AuthFailed { .. } => {
                Some("Verify your API key. Set the LLAMA_API_KEY environment variable or [llm] api_key.")
            }
            Error::UnknownProfile { .. } => {
                Some("Run 'simchat profile list' to see the bundled persona and service profiles.")
            }
            Error::TranscriptWrite { .. } => {
                Some("Check that [storage] transcript_dir exists and is writable.")
            }
            Error::AllJudgesFailed { .. } => {
                Some("All judge passes failed; check API connectivity and re-run the judge command.")
            }
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!("\x1b[31mError [{}]\x1b[0m: {}\n", code.as_str(), self);

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        let code = self.code();
        format!("[{}] {}", code.as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors (for ergonomic error creation)
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Create an unknown-profile error
    pub fn unknown_profile(name: impl Into<String>) -> Self {
        Error::UnknownProfile { name: name.into() }
    }

    /// Create a rate-limit error
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Error::RateLimited {
            message: message.into(),
        }
    }

    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Error::Unavailable {
            message: message.into(),
        }
    }

    /// Create an invalid-request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Error::InvalidRequest {
            message: message.into(),
        }
    }

    /// Wrap an agent call failure with its speaker and turn position
    pub fn agent_call(speaker: AgentRole, turn_index: usize, source: Error) -> Self {
        Error::AgentCallFailed {
            speaker,
            turn_index,
            source: Box::new(source),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
