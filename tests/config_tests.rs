//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides
//! through the compiled binary.

use std::fs;
use std::path::PathBuf;

use predicates::prelude::*;
use tempfile::TempDir;

/// Test fixture for configuration testing
struct ConfigFixture {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        Self {
            temp_dir,
            config_path,
        }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    fn validate_cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("simchat").unwrap();
        cmd.current_dir(self.temp_dir.path())
            .arg("config")
            .arg("validate")
            .arg("--config")
            .arg(self.path());
        cmd
    }
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_minimal_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[server]

[llm]

[conversation]

[judge]

[storage]

[logging]
"#,
    );

    fixture.validate_cmd().assert().success();
}

#[test]
fn test_full_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[server]
host = "0.0.0.0"
port = 3000

[llm]
base_url = "https://api.example.com/v1"
api_key = "test-key-001"
model = "test-model"
timeout_secs = 30
max_retries = 1

[conversation]
default_max_turns = 5
opening_prompt = "Hi, I have a question."
closing_phrases = ["thank you, goodbye.", "bye now"]
final_reply = false
turn_delay_ms = 100

[judge]
max_concurrency = 2
model = "judge-model"

[storage]
transcript_dir = "/tmp/simchat-test/conversations"

[logging]
level = "debug"
file = "/tmp/simchat-test/simchat.log"
json_format = false
"#,
    );

    fixture
        .validate_cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("https://api.example.com/v1"))
        .stdout(predicate::str::contains("test-model"));
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_base_url() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
base_url = "ftp://api.example.com"
"#,
    );

    fixture
        .validate_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("base_url"));
}

#[test]
fn test_zero_max_turns() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[conversation]
default_max_turns = 0
"#,
    );

    fixture
        .validate_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("default_max_turns"));
}

// Clearing the closing phrases turns natural-end detection off rather
// than being a configuration error.
#[test]
fn test_empty_closing_phrases_allowed() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[conversation]
closing_phrases = []
"#,
    );

    fixture.validate_cmd().assert().success();
}

#[test]
fn test_zero_judge_concurrency() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[judge]
max_concurrency = 0
"#,
    );

    fixture
        .validate_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_concurrency"));
}

#[test]
fn test_invalid_log_level() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[logging]
level = "chatty"
"#,
    );

    fixture
        .validate_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("log level"));
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[server\nport = not-a-number");

    fixture
        .validate_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse"));
}

#[test]
fn test_explicit_missing_config_path() {
    let dir = TempDir::new().unwrap();

    assert_cmd::Command::cargo_bin("simchat")
        .unwrap()
        .current_dir(dir.path())
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg("/nonexistent/simchat.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E100"));
}

// ─────────────────────────────────────────────────────────────────
// Environment Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_overrides_file_value() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
model = "file-model"
"#,
    );

    assert_cmd::Command::cargo_bin("simchat")
        .unwrap()
        .current_dir(fixture.temp_dir.path())
        .env("SIMCHAT_LLM_MODEL", "env-model")
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("env-model"));
}

#[test]
fn test_env_override_must_still_validate() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[llm]
base_url = "https://api.example.com/v1"
"#,
    );

    assert_cmd::Command::cargo_bin("simchat")
        .unwrap()
        .current_dir(fixture.temp_dir.path())
        .env("SIMCHAT_LLM_BASE_URL", "not-a-url")
        .arg("config")
        .arg("validate")
        .arg("--config")
        .arg(fixture.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("base_url"));
}
