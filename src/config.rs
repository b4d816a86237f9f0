//! Configuration system for simchat
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (SIMCHAT_* prefix, plus LLAMA_API_KEY)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Main simchat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimchatConfig {
    /// HTTP server settings
    pub server: ServerSettings,

    /// Hosted completion API settings
    pub llm: LlmSettings,

    /// Conversation simulation settings
    pub conversation: ConversationSettings,

    /// Judge settings
    pub judge: JudgeSettings,

    /// Transcript storage paths
    pub storage: StorageSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address for the HTTP server
    pub host: String,

    /// Listen port
    pub port: u16,
}

/// Hosted completion API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// API base URL
    pub base_url: String,

    /// API key (overridden by the LLAMA_API_KEY environment variable)
    pub api_key: String,

    /// Model identifier sent with every completion request
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries on transient failures (429, 5xx)
    pub max_retries: u32,
}

/// Conversation simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationSettings {
    /// Number of rounds per simulated conversation (each round is one
    /// persona turn plus one service turn)
    pub default_max_turns: usize,

    /// Seed message sent to the persona agent to open the conversation.
    /// It is never recorded as a turn.
    pub opening_prompt: String,

    /// Phrases that end the conversation early when they appear in a reply
    /// (case-insensitive substring match)
    pub closing_phrases: Vec<String>,

    /// Give the service agent one final reply after the persona says goodbye
    pub final_reply: bool,

    /// Delay between agent calls in milliseconds (0 = none)
    pub turn_delay_ms: u64,
}

/// Judge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeSettings {
    /// Maximum judge passes running concurrently in mixture mode
    pub max_concurrency: usize,

    /// Model identifier for judge calls (empty = use [llm] model)
    pub model: String,
}

/// Transcript storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory where conversation transcripts are written
    pub transcript_dir: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for SimchatConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            llm: LlmSettings::default(),
            conversation: ConversationSettings::default(),
            judge: JudgeSettings::default(),
            storage: StorageSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.llama.com/v1".to_string(),
            api_key: String::new(),
            model: "Llama-4-Maverick-17B-128E-Instruct-FP8".to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            default_max_turns: 10,
            opening_prompt: "Hello, I need some help.".to_string(),
            closing_phrases: vec!["thank you, goodbye.".to_string()],
            final_reply: true,
            turn_delay_ms: 0,
        }
    }
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            model: String::new(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            transcript_dir: "~/.simchat/conversations".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json_format: false,
        }
    }
}

impl SimchatConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        let config_file = Self::find_config_file(config_path)?;
        if let Some(path) = config_file {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
            config = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let expanded = shellexpand::tilde(path);
            let path = PathBuf::from(expanded.as_ref());
            if path.exists() {
                return Ok(Some(path));
            } else {
                return Err(Error::ConfigNotFound { path });
            }
        }

        // Search in standard locations
        let search_paths = [
            // Current directory
            PathBuf::from("simchat.toml"),
            PathBuf::from("config.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("simchat").join("config.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".simchat").join("config.toml"))
                .unwrap_or_default(),
            // System config (Linux)
            PathBuf::from("/etc/simchat/config.toml"),
        ];

        for path in &search_paths {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Server settings
        if let Ok(val) = std::env::var("SIMCHAT_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("SIMCHAT_PORT") {
            if let Ok(n) = val.parse() {
                self.server.port = n;
            }
        }

        // Completion API settings. LLAMA_API_KEY is the conventional
        // credential variable and wins over the file value.
        if let Ok(val) = std::env::var("SIMCHAT_LLM_BASE_URL") {
            self.llm.base_url = val;
        }
        if let Ok(val) = std::env::var("LLAMA_API_KEY") {
            self.llm.api_key = val;
        }
        if let Ok(val) = std::env::var("SIMCHAT_LLM_MODEL") {
            self.llm.model = val;
        }
        if let Ok(val) = std::env::var("SIMCHAT_LLM_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.llm.timeout_secs = n;
            }
        }
        if let Ok(val) = std::env::var("SIMCHAT_LLM_MAX_RETRIES") {
            if let Ok(n) = val.parse() {
                self.llm.max_retries = n;
            }
        }

        // Conversation settings
        if let Ok(val) = std::env::var("SIMCHAT_MAX_TURNS") {
            if let Ok(n) = val.parse() {
                self.conversation.default_max_turns = n;
            }
        }
        if let Ok(val) = std::env::var("SIMCHAT_TURN_DELAY_MS") {
            if let Ok(n) = val.parse() {
                self.conversation.turn_delay_ms = n;
            }
        }

        // Judge settings
        if let Ok(val) = std::env::var("SIMCHAT_JUDGE_CONCURRENCY") {
            if let Ok(n) = val.parse() {
                self.judge.max_concurrency = n;
            }
        }
        if let Ok(val) = std::env::var("SIMCHAT_JUDGE_MODEL") {
            self.judge.model = val;
        }

        // Storage settings
        if let Ok(val) = std::env::var("SIMCHAT_TRANSCRIPT_DIR") {
            self.storage.transcript_dir = val;
        }

        // Logging settings
        if let Ok(val) = std::env::var("SIMCHAT_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("SIMCHAT_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("SIMCHAT_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.storage.transcript_dir = expand_path(&self.storage.transcript_dir);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate API base URL
        if self.llm.base_url.is_empty() {
            return Err(Error::Config("LLM base_url cannot be empty".to_string()));
        }
        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://") {
            return Err(Error::Config(
                "LLM base_url must start with http:// or https://".to_string(),
            ));
        }

        // Validate model
        if self.llm.model.is_empty() {
            return Err(Error::Config("LLM model cannot be empty".to_string()));
        }

        // Validate conversation bounds
        if self.conversation.default_max_turns == 0 {
            return Err(Error::Config(
                "default_max_turns must be at least 1".to_string(),
            ));
        }
        // An empty closing_phrases list is allowed; it disables natural-end
        // detection and conversations run to the turn budget.

        // Validate judge concurrency
        if self.judge.max_concurrency == 0 {
            return Err(Error::Config(
                "judge max_concurrency must be at least 1".to_string(),
            ));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Get the transcript directory as a PathBuf
    pub fn transcript_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.transcript_dir)
    }

    /// Model to use for judge calls
    pub fn judge_model(&self) -> &str {
        if self.judge.model.is_empty() {
            &self.llm.model
        } else {
            &self.judge.model
        }
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<()> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".simchat")
                .join("config.toml")
        });

    // Check if file exists
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    // Create parent directories
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
    }

    // Generate default config with comments
    let config_content = generate_default_config();

    // Write the file
    fs::write(&config_path, config_content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

    println!("Configuration file created: {}", config_path.display());
    Ok(())
}

/// Validate a configuration file and report the result
pub fn validate_config(path: Option<&str>) -> Result<()> {
    let config = SimchatConfig::load(path)?;
    config.validate()?;
    println!("Configuration is valid.");
    println!("  LLM endpoint:   {}", config.llm.base_url);
    println!("  Model:          {}", config.llm.model);
    println!("  Transcript dir: {}", config.storage.transcript_dir);
    Ok(())
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# simchat configuration

[server]
# Bind address for the HTTP server
host = "127.0.0.1"

# Listen port
port = 8080

[llm]
# Hosted completion API base URL
base_url = "https://api.llama.com/v1"

# API key (the LLAMA_API_KEY environment variable takes precedence)
api_key = ""

# Model identifier sent with every request
model = "Llama-4-Maverick-17B-128E-Instruct-FP8"

# Request timeout in seconds
timeout_secs = 60

# Maximum retries on transient failures
max_retries = 2

[conversation]
# Number of rounds per simulated conversation
default_max_turns = 10

# Seed message used to open each simulation (never recorded as a turn)
opening_prompt = "Hello, I need some help."

# Phrases that end the conversation early (case-insensitive substring match)
closing_phrases = ["thank you, goodbye."]

# Give the service agent one final reply after the persona says goodbye
final_reply = true

# Delay between agent calls in milliseconds
turn_delay_ms = 0

[judge]
# Maximum judge passes running concurrently in mixture mode
max_concurrency = 4

# Model for judge calls (empty = use [llm] model)
model = ""

[storage]
# Directory where conversation transcripts are written
transcript_dir = "~/.simchat/conversations"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.simchat/logs/simchat.log"

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
