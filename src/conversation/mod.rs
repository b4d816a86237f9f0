//! Conversation simulation module
//!
//! Defines the transcript data model and the orchestrator that drives a
//! turn-by-turn exchange between a persona agent and a service agent.

mod orchestrator;
mod types;

pub use orchestrator::{ConversationState, EndPolicy, Orchestrator, OrchestratorConfig};
pub use types::*;
