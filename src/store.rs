//! Transcript persistence
//!
//! Conversations are written once as pretty-printed JSON and never
//! updated in place. Filenames carry both participant slugs and a
//! timestamp; collisions within the same second get a numeric suffix.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info};

use crate::conversation::Conversation;
use crate::error::{Error, Result};

/// Append-once store for conversation transcripts.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    root: PathBuf,
}

impl TranscriptStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory transcripts are written under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist a conversation under the store root.
    pub fn save(&self, conversation: &Conversation) -> Result<PathBuf> {
        self.save_in(&self.root, conversation)
    }

    /// Persist a conversation under an arbitrary directory.
    ///
    /// Creates the directory if needed and never overwrites an existing
    /// file: a same-second filename collision gets a `-N` suffix.
    pub fn save_in(&self, dir: &Path, conversation: &Conversation) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| Error::TranscriptWrite {
            path: dir.to_path_buf(),
            message: format!("failed to create transcript directory: {}", e),
        })?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let stem = format!(
            "conversation_{}_{}_{}",
            conversation.participants.user, conversation.participants.service, stamp
        );

        let mut path = dir.join(format!("{}.json", stem));
        let mut attempt = 1;
        while path.exists() {
            path = dir.join(format!("{}-{}.json", stem, attempt));
            attempt += 1;
        }

        let json =
            serde_json::to_string_pretty(conversation).map_err(|e| Error::TranscriptWrite {
                path: path.clone(),
                message: format!("failed to serialize conversation: {}", e),
            })?;

        fs::write(&path, json).map_err(|e| Error::TranscriptWrite {
            path: path.clone(),
            message: e.to_string(),
        })?;

        info!(
            path = %path.display(),
            turns = conversation.turn_count(),
            "Saved transcript"
        );
        Ok(path)
    }

    /// Read a transcript back from disk.
    pub fn load(&self, path: &Path) -> Result<Conversation> {
        let data = fs::read_to_string(path).map_err(|e| Error::TranscriptRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        serde_json::from_str(&data).map_err(|e| Error::TranscriptParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Create a fresh timestamped subdirectory for a batch run.
    pub fn batch_dir(&self) -> Result<PathBuf> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let mut dir = self.root.join(format!("batch_{}", stamp));
        let mut attempt = 1;
        while dir.exists() {
            dir = self.root.join(format!("batch_{}-{}", stamp, attempt));
            attempt += 1;
        }

        fs::create_dir_all(&dir).map_err(|e| Error::TranscriptWrite {
            path: dir.clone(),
            message: format!("failed to create batch directory: {}", e),
        })?;

        debug!(path = %dir.display(), "Created batch directory");
        Ok(dir)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;
    use crate::conversation::{Participants, TerminatedReason, Turn};
    use crate::profile::{AgentRole, ProfileName};

    fn sample_conversation() -> Conversation {
        Conversation {
            id: Uuid::new_v4(),
            participants: Participants {
                user: ProfileName::FrustratedCustomer,
                service: ProfileName::SupportRep,
            },
            max_turns: 3,
            terminated_reason: TerminatedReason::NaturalEnd,
            started_at: Utc::now(),
            ended_at: Utc::now(),
            turns: vec![
                Turn::new(0, AgentRole::UserPersona, "My order is late!".to_string()),
                Turn::new(1, AgentRole::Service, "Let me check.".to_string()),
            ],
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = TranscriptStore::new(dir.path());
        let conv = sample_conversation();

        let path = store.save(&conv).unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("conversation_frustrated-customer_support-rep_"));
        assert!(name.ends_with(".json"));

        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded.id, conv.id);
        assert_eq!(loaded.turn_count(), 2);
        assert_eq!(loaded.terminated_reason, TerminatedReason::NaturalEnd);
    }

    #[test]
    fn test_same_second_saves_get_distinct_files() {
        let dir = TempDir::new().unwrap();
        let store = TranscriptStore::new(dir.path());
        let conv = sample_conversation();

        let first = store.save(&conv).unwrap();
        let second = store.save(&conv).unwrap();
        let third = store.save(&conv).unwrap();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert!(first.exists() && second.exists() && third.exists());
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let store = TranscriptStore::new(dir.path());

        let err = store.load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::TranscriptRead { .. }));
    }

    #[test]
    fn test_load_malformed_json_errors() {
        let dir = TempDir::new().unwrap();
        let store = TranscriptStore::new(dir.path());

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = store.load(&path).unwrap_err();
        assert!(matches!(err, Error::TranscriptParse { .. }));
    }

    #[test]
    fn test_batch_dirs_are_unique() {
        let dir = TempDir::new().unwrap();
        let store = TranscriptStore::new(dir.path());

        let a = store.batch_dir().unwrap();
        let b = store.batch_dir().unwrap();

        assert!(a.is_dir() && b.is_dir());
        assert_ne!(a, b);
    }
}
