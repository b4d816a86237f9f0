//! Conversation agents
//!
//! An agent binds a prompt profile to a completion client and turns the
//! recorded conversation into the message history the API expects.

use tracing::debug;

use crate::conversation::Turn;
use crate::error::Result;
use crate::llm::{ChatMessage, CompletionRequest, SharedClient};
use crate::profile::{AgentRole, ProfileName, PromptProfile};

/// One side of a simulated conversation.
pub struct Agent {
    profile: PromptProfile,
    client: SharedClient,
    model: Option<String>,
}

impl Agent {
    /// Create an agent from a profile and a shared client.
    pub fn new(profile: PromptProfile, client: SharedClient) -> Self {
        Self {
            profile,
            client,
            model: None,
        }
    }

    /// Use a specific model for this agent's calls.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Which side of the conversation this agent plays.
    pub fn role(&self) -> AgentRole {
        self.profile.role
    }

    /// The bundled profile backing this agent.
    pub fn profile_name(&self) -> ProfileName {
        self.profile.name
    }

    /// Generate this agent's next message.
    ///
    /// `turns` is the recorded conversation so far; each agent sees its own
    /// past turns as assistant messages and the other side's as user
    /// messages. `opener` seeds the very first call when nothing has been
    /// recorded yet, and is never part of the transcript.
    pub async fn reply(&self, turns: &[Turn], opener: &str) -> Result<String> {
        let mut messages = vec![ChatMessage::system(self.profile.system_prompt())];

        if turns.is_empty() {
            messages.push(ChatMessage::user(opener));
        } else {
            for turn in turns {
                if turn.speaker == self.role() {
                    messages.push(ChatMessage::assistant(&turn.text));
                } else {
                    messages.push(ChatMessage::user(&turn.text));
                }
            }
        }

        debug!(
            agent = %self.profile.name,
            role = %self.role(),
            history_len = turns.len(),
            "Generating agent reply"
        );

        let mut request = CompletionRequest::new(messages);
        if let Some(ref model) = self.model {
            request = request.with_model(model.clone());
        }

        let reply = self.client.complete(request).await?;
        Ok(reply.text)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::conversation::Turn;
    use crate::llm::MockClient;
    use crate::profile::ProfileRegistry;

    fn persona_agent(client: Arc<MockClient>) -> Agent {
        let registry = ProfileRegistry::new().unwrap();
        Agent::new(
            registry.get(ProfileName::FrustratedCustomer).clone(),
            client,
        )
    }

    fn service_agent(client: Arc<MockClient>) -> Agent {
        let registry = ProfileRegistry::new().unwrap();
        Agent::new(registry.get(ProfileName::SupportRep).clone(), client)
    }

    #[tokio::test]
    async fn test_first_reply_uses_opener() {
        let client = Arc::new(MockClient::scripted(["My delivery is late!"]));
        let agent = persona_agent(client.clone());

        let text = agent.reply(&[], "Hello, I need some help.").await.unwrap();
        assert_eq!(text, "My delivery is late!");
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reply_with_history() {
        let client = Arc::new(MockClient::scripted(["Let me check your order."]));
        let agent = service_agent(client);

        let turns = vec![Turn::new(0, AgentRole::UserPersona, "Where is my order?")];
        let text = agent.reply(&turns, "unused").await.unwrap();
        assert_eq!(text, "Let me check your order.");
    }

    #[tokio::test]
    async fn test_role_accessors() {
        let client = Arc::new(MockClient::new());
        let agent = persona_agent(client);

        assert_eq!(agent.role(), AgentRole::UserPersona);
        assert_eq!(agent.profile_name(), ProfileName::FrustratedCustomer);
    }
}
