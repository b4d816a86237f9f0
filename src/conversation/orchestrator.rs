//! Conversation orchestrator
//!
//!  Drives a strictly alternating exchange between a persona agent and a
//! service agent, enforcing the turn budget and the closing-phrase policy,
//! and producing a transcript even when an agent call fails mid-run.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::Agent;
use crate::config::ConversationSettings;
use crate::error::{Error, Result};
use crate::profile::AgentRole;

use super::types::{Conversation, Participants, TerminatedReason, Turn};

// ─────────────────────────────────────────────────────────────────
// End Policy
// ─────────────────────────────────────────────────────────────────

/// Decides when a reply ends the conversation early.
#[derive(Debug, Clone)]
pub struct EndPolicy {
    closing_phrases: Vec<String>,

    /// Give the service agent one final reply after the persona closes.
    pub final_reply: bool,
}

impl EndPolicy {
    pub fn new(closing_phrases: Vec<String>, final_reply: bool) -> Self {
        let closing_phrases = closing_phrases
            .into_iter()
            .map(|p| p.to_lowercase())
            .collect();
        Self {
            closing_phrases,
            final_reply,
        }
    }

    /// Case-insensitive substring match against the configured phrases.
    pub fn matches(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.closing_phrases.iter().any(|p| lower.contains(p))
    }
}

// ─────────────────────────────────────────────────────────────────
// Orchestrator Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for one orchestrated conversation.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Round budget; the transcript holds at most `2 * max_turns` turns.
    pub max_turns: usize,

    /// Seed message for the persona's first call. Never recorded.
    pub opening_prompt: String,

    /// Early-termination policy.
    pub end_policy: EndPolicy,

    /// Pause between agent calls.
    pub turn_delay: Duration,
}

impl OrchestratorConfig {
    /// Build from the configured conversation settings, optionally
    /// overriding the round budget.
    pub fn from_settings(settings: &ConversationSettings, max_turns: Option<usize>) -> Self {
        Self {
            max_turns: max_turns.unwrap_or(settings.default_max_turns),
            opening_prompt: settings.opening_prompt.clone(),
            end_policy: EndPolicy::new(settings.closing_phrases.clone(), settings.final_reply),
            turn_delay: Duration::from_millis(settings.turn_delay_ms),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────

/// Lifecycle of an orchestrated conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// Turn observer invoked as each turn is recorded.
pub type TurnObserver = Box<dyn Fn(&Turn) + Send + Sync>;

/// Drives one conversation between a persona agent and a service agent.
pub struct Orchestrator {
    persona: Agent,
    service: Agent,
    config: OrchestratorConfig,
    state: ConversationState,
    observer: Option<TurnObserver>,
}

impl Orchestrator {
    /// Create an orchestrator, checking the agents play opposite roles.
    pub fn new(persona: Agent, service: Agent, config: OrchestratorConfig) -> Result<Self> {
        if persona.role() != AgentRole::UserPersona {
            return Err(Error::ConversationState(format!(
                "persona agent has role {}",
                persona.role()
            )));
        }
        if service.role() != AgentRole::Service {
            return Err(Error::ConversationState(format!(
                "service agent has role {}",
                service.role()
            )));
        }

        Ok(Self {
            persona,
            service,
            config,
            state: ConversationState::NotStarted,
            observer: None,
        })
    }

    /// Observe turns as they are recorded (used for live CLI output).
    pub fn with_observer(mut self, observer: TurnObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// Run the conversation to completion.
    ///
    /// Always returns a transcript: an agent failure mid-run stops the
    /// exchange and is recorded in `terminated_reason` with the turns
    /// gathered so far.
    pub async fn run(&mut self) -> Result<Conversation> {
        if self.state != ConversationState::NotStarted {
            return Err(Error::ConversationState(
                "orchestrator already ran".to_string(),
            ));
        }
        self.state = ConversationState::Running;

        let participants = Participants {
            user: self.persona.profile_name(),
            service: self.service.profile_name(),
        };

        info!(
            persona = %participants.user,
            service = %participants.service,
            max_turns = self.config.max_turns,
            "Starting conversation"
        );

        let started_at = Utc::now();
        let turn_budget = 2 * self.config.max_turns;
        let mut turns: Vec<Turn> = Vec::with_capacity(turn_budget);

        let reason = loop {
            if turns.len() >= turn_budget {
                break TerminatedReason::MaxTurnsReached;
            }

            // The persona opens; thereafter speakers strictly alternate.
            let speaker = if turns.len() % 2 == 0 {
                AgentRole::UserPersona
            } else {
                AgentRole::Service
            };

            if !turns.is_empty() && !self.config.turn_delay.is_zero() {
                tokio::time::sleep(self.config.turn_delay).await;
            }

            let text = match self.call_agent(speaker, &turns).await {
                Ok(text) => text,
                Err(e) => break self.fail(speaker, turns.len(), e),
            };

            let closes = self.config.end_policy.matches(&text);
            self.record(&mut turns, speaker, text);

            if closes {
                match speaker {
                    // The persona said goodbye; optionally let the service
                    // agent sign off before ending.
                    AgentRole::UserPersona if self.config.end_policy.final_reply => {
                        if !self.config.turn_delay.is_zero() {
                            tokio::time::sleep(self.config.turn_delay).await;
                        }
                        match self.call_agent(AgentRole::Service, &turns).await {
                            Ok(text) => {
                                self.record(&mut turns, AgentRole::Service, text);
                                break TerminatedReason::NaturalEnd;
                            }
                            Err(e) => break self.fail(AgentRole::Service, turns.len(), e),
                        }
                    }
                    _ => break TerminatedReason::NaturalEnd,
                }
            }
        };

        self.state = if reason.is_error() {
            ConversationState::Failed
        } else {
            ConversationState::Completed
        };

        info!(
            turns = turns.len(),
            reason = ?reason,
            "Conversation finished"
        );

        Ok(Conversation {
            id: Uuid::new_v4(),
            participants,
            max_turns: self.config.max_turns,
            terminated_reason: reason,
            started_at,
            ended_at: Utc::now(),
            turns,
        })
    }

    /// Invoke the agent for the given side.
    async fn call_agent(&self, speaker: AgentRole, turns: &[Turn]) -> Result<String> {
        let agent = match speaker {
            AgentRole::UserPersona => &self.persona,
            AgentRole::Service => &self.service,
        };
        agent.reply(turns, &self.config.opening_prompt).await
    }

    /// Append a turn and notify the observer.
    fn record(&self, turns: &mut Vec<Turn>, speaker: AgentRole, text: String) {
        let turn = Turn::new(turns.len(), speaker, text);
        if let Some(ref observer) = self.observer {
            observer(&turn);
        }
        turns.push(turn);
    }

    /// Build the error termination reason for a failed agent call.
    fn fail(&self, speaker: AgentRole, turn_index: usize, error: Error) -> TerminatedReason {
        warn!(
            speaker = %speaker,
            turn_index,
            error = %error,
            "Agent call failed, ending conversation"
        );
        TerminatedReason::Error {
            speaker,
            turn_index,
            message: error.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::{MockClient, MockConfig};
    use crate::profile::{ProfileName, ProfileRegistry};

    fn agents(client: Arc<MockClient>) -> (Agent, Agent) {
        let registry = ProfileRegistry::new().unwrap();
        let persona = Agent::new(
            registry.get(ProfileName::FrustratedCustomer).clone(),
            client.clone(),
        );
        let service = Agent::new(registry.get(ProfileName::SupportRep).clone(), client);
        (persona, service)
    }

    fn config(max_turns: usize) -> OrchestratorConfig {
        OrchestratorConfig {
            max_turns,
            opening_prompt: "Hello, I need some help.".to_string(),
            end_policy: EndPolicy::new(vec!["thank you, goodbye.".to_string()], true),
            turn_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_end_policy_matching() {
        let policy = EndPolicy::new(vec!["thank you, goodbye.".to_string()], true);

        assert!(policy.matches("Thank you, goodbye."));
        assert!(policy.matches("Great, that works. THANK YOU, GOODBYE."));
        assert!(!policy.matches("thanks, bye"));
        assert!(!policy.matches("goodbye"));
    }

    #[test]
    fn test_end_policy_empty_list_never_matches() {
        // No phrases configured means natural-end detection is off.
        let policy = EndPolicy::new(vec![], true);

        assert!(!policy.matches("thank you, goodbye."));
        assert!(!policy.matches(""));
    }

    #[tokio::test]
    async fn test_full_conversation_hits_turn_budget() {
        // No closing phrases in the script, so the budget ends it.
        let client = Arc::new(MockClient::scripted(["just another message"]));
        let (persona, service) = agents(client.clone());

        let mut orch = Orchestrator::new(persona, service, config(3)).unwrap();
        assert_eq!(orch.state(), ConversationState::NotStarted);

        let conv = orch.run().await.unwrap();

        assert_eq!(orch.state(), ConversationState::Completed);
        assert_eq!(conv.turn_count(), 6);
        assert_eq!(conv.terminated_reason, TerminatedReason::MaxTurnsReached);
        assert_eq!(client.call_count(), 6);

        // Strict alternation, persona first
        for (i, turn) in conv.turns.iter().enumerate() {
            assert_eq!(turn.index, i);
            let expected = if i % 2 == 0 {
                AgentRole::UserPersona
            } else {
                AgentRole::Service
            };
            assert_eq!(turn.speaker, expected);
        }
    }

    #[tokio::test]
    async fn test_persona_goodbye_gets_final_service_reply() {
        let client = Arc::new(MockClient::scripted([
            "My order is late!",                       // persona
            "Let me check that for you.",              // service
            "That fixed it. Thank you, goodbye.",      // persona closes
            "Happy to help, have a great day!",        // service final reply
        ]));
        let (persona, service) = agents(client);

        let mut orch = Orchestrator::new(persona, service, config(10)).unwrap();
        let conv = orch.run().await.unwrap();

        assert_eq!(conv.terminated_reason, TerminatedReason::NaturalEnd);
        assert_eq!(conv.turn_count(), 4);
        assert_eq!(conv.turns[3].speaker, AgentRole::Service);
        assert_eq!(conv.turns[3].text, "Happy to help, have a great day!");
    }

    #[tokio::test]
    async fn test_service_goodbye_ends_immediately() {
        let client = Arc::new(MockClient::scripted([
            "My order is late!",
            "All sorted. Thank you, goodbye.", // service closes
        ]));
        let (persona, service) = agents(client.clone());

        let mut orch = Orchestrator::new(persona, service, config(10)).unwrap();
        let conv = orch.run().await.unwrap();

        assert_eq!(conv.terminated_reason, TerminatedReason::NaturalEnd);
        assert_eq!(conv.turn_count(), 2);
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_mid_conversation_keeps_partial_transcript() {
        // Calls 1 and 2 succeed; call 3 (persona, turn index 2) fails.
        let client = Arc::new(MockClient::with_config(MockConfig {
            fail_on_call: Some(3),
            fixed_response: Some("still talking".to_string()),
            ..Default::default()
        }));
        let (persona, service) = agents(client);

        let mut orch = Orchestrator::new(persona, service, config(5)).unwrap();
        let conv = orch.run().await.unwrap();

        assert_eq!(orch.state(), ConversationState::Failed);
        assert_eq!(conv.turn_count(), 2);
        match conv.terminated_reason {
            TerminatedReason::Error {
                speaker,
                turn_index,
                ..
            } => {
                assert_eq!(speaker, AgentRole::UserPersona);
                assert_eq!(turn_index, 2);
            }
            ref other => panic!("expected error termination, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_final_reply_when_disabled() {
        let client = Arc::new(MockClient::scripted(["Thank you, goodbye."]));
        let (persona, service) = agents(client.clone());

        let mut cfg = config(10);
        cfg.end_policy = EndPolicy::new(vec!["thank you, goodbye.".to_string()], false);

        let mut orch = Orchestrator::new(persona, service, cfg).unwrap();
        let conv = orch.run().await.unwrap();

        assert_eq!(conv.terminated_reason, TerminatedReason::NaturalEnd);
        assert_eq!(conv.turn_count(), 1);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_role_mismatch_rejected() {
        let registry = ProfileRegistry::new().unwrap();
        let client: Arc<MockClient> = Arc::new(MockClient::new());

        // Both agents built from service profiles
        let a = Agent::new(registry.get(ProfileName::SupportRep).clone(), client.clone());
        let b = Agent::new(registry.get(ProfileName::TechSupport).clone(), client);

        assert!(Orchestrator::new(a, b, config(3)).is_err());
    }

    #[tokio::test]
    async fn test_rerun_rejected() {
        let client = Arc::new(MockClient::scripted(["Thank you, goodbye."]));
        let (persona, service) = agents(client);

        let mut orch = Orchestrator::new(persona, service, config(2)).unwrap();
        let _ = orch.run().await.unwrap();
        assert!(orch.run().await.is_err());
    }
}
