//! Transcript data model.
//!
//! A conversation is a bounded sequence of strictly alternating turns
//! between the user persona and the service agent, plus the metadata
//! needed to replay or judge it later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::{AgentRole, ProfileName};

// ─────────────────────────────────────────────────────────────────
// Turn
// ─────────────────────────────────────────────────────────────────

/// A single recorded message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Zero-based position in the transcript.
    pub index: usize,

    /// Which agent produced this turn.
    pub speaker: AgentRole,

    /// Message text.
    pub text: String,

    /// When the turn was recorded (ISO-8601).
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(index: usize, speaker: AgentRole, text: impl Into<String>) -> Self {
        Self {
            index,
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Termination
// ─────────────────────────────────────────────────────────────────

/// Why a conversation stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TerminatedReason {
    /// The turn budget was exhausted.
    MaxTurnsReached,

    /// An agent used a closing phrase.
    NaturalEnd,

    /// An agent call failed mid-conversation.
    Error {
        speaker: AgentRole,
        turn_index: usize,
        message: String,
    },
}

impl TerminatedReason {
    pub fn is_error(&self) -> bool {
        matches!(self, TerminatedReason::Error { .. })
    }
}

// ─────────────────────────────────────────────────────────────────
// Participants & Conversation
// ─────────────────────────────────────────────────────────────────

/// The pair of profiles that held a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participants {
    /// User persona profile.
    pub user: ProfileName,

    /// Service profile.
    pub service: ProfileName,
}

/// A complete conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: Uuid,

    /// Who took part.
    pub participants: Participants,

    /// Configured round budget (each round is one persona turn plus one
    /// service turn, so a completed conversation holds at most
    /// `2 * max_turns` turns).
    pub max_turns: usize,

    /// Why the conversation stopped.
    pub terminated_reason: TerminatedReason,

    /// When the conversation started.
    pub started_at: DateTime<Utc>,

    /// When the conversation ended.
    pub ended_at: DateTime<Utc>,

    /// The recorded turns, in order.
    pub turns: Vec<Turn>,
}

impl Conversation {
    /// Number of recorded turns.
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Turns spoken by a given role.
    pub fn turns_by(&self, role: AgentRole) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(move |t| t.speaker == role)
    }

    /// Render the transcript as plain text for judging or display.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for turn in &self.turns {
            out.push_str(&format!("[{}] {}\n", turn.speaker, turn.text));
        }
        out
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_conversation() -> Conversation {
        Conversation {
            id: Uuid::new_v4(),
            participants: Participants {
                user: ProfileName::FrustratedCustomer,
                service: ProfileName::SupportRep,
            },
            max_turns: 2,
            terminated_reason: TerminatedReason::MaxTurnsReached,
            started_at: Utc::now(),
            ended_at: Utc::now(),
            turns: vec![
                Turn::new(0, AgentRole::UserPersona, "Where is my order?"),
                Turn::new(1, AgentRole::Service, "Let me check."),
                Turn::new(2, AgentRole::UserPersona, "Hurry up."),
                Turn::new(3, AgentRole::Service, "It ships tomorrow."),
            ],
        }
    }

    #[test]
    fn test_turns_by_role() {
        let conv = sample_conversation();
        assert_eq!(conv.turns_by(AgentRole::UserPersona).count(), 2);
        assert_eq!(conv.turns_by(AgentRole::Service).count(), 2);
    }

    #[test]
    fn test_render_text() {
        let conv = sample_conversation();
        let text = conv.render_text();
        assert!(text.contains("[UserPersona] Where is my order?"));
        assert!(text.contains("[Service] It ships tomorrow."));
    }

    #[test]
    fn test_terminated_reason_serialization() {
        let reason = TerminatedReason::Error {
            speaker: AgentRole::Service,
            turn_index: 3,
            message: "API unavailable".to_string(),
        };
        let json = serde_json::to_string(&reason).unwrap();
        assert!(json.contains("\"kind\":\"error\""));
        assert!(json.contains("\"turn_index\":3"));

        let parsed: TerminatedReason = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_error());

        let json = serde_json::to_string(&TerminatedReason::NaturalEnd).unwrap();
        assert!(json.contains("natural-end"));
    }

    #[test]
    fn test_conversation_json_roundtrip() {
        let conv = sample_conversation();
        let json = serde_json::to_string_pretty(&conv).unwrap();
        let parsed: Conversation = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id, conv.id);
        assert_eq!(parsed.turn_count(), 4);
        assert_eq!(parsed.participants.user, ProfileName::FrustratedCustomer);
        assert_eq!(parsed.terminated_reason, TerminatedReason::MaxTurnsReached);
    }
}
