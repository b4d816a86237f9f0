//! Batch runner
//!
//! Runs the bundled persona catalog against a service profile, one
//! conversation per pair, sequentially in catalog order. A failing pair
//! is recorded and the batch moves on; every transcript lands in a
//! shared `batch_{timestamp}/` folder.

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agent::Agent;
use crate::config::ConversationSettings;
use crate::conversation::{Conversation, Orchestrator, OrchestratorConfig};
use crate::error::Result;
use crate::llm::SharedClient;
use crate::profile::{ProfileName, ProfileRegistry};
use crate::store::TranscriptStore;

// ─────────────────────────────────────────────────────────────────
// Report Types
// ─────────────────────────────────────────────────────────────────

/// Outcome of one persona/service pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub profile: ProfileName,
    pub service: ProfileName,
    pub success: bool,
    pub message: String,
    pub turn_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_filepath: Option<String>,
}

/// Aggregate over one catalog sweep, results in catalog order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<BatchItem>,
    pub total_runs: usize,
    pub successful_runs: usize,
    pub total_turns: usize,
    pub batch_timestamp: String,
    pub batch_folder: String,
}

// ─────────────────────────────────────────────────────────────────
// Batch Runner
// ─────────────────────────────────────────────────────────────────

/// Sequentially drives one conversation per catalog pair.
pub struct BatchRunner<'a> {
    registry: &'a ProfileRegistry,
    client: SharedClient,
    settings: ConversationSettings,
    store: TranscriptStore,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        registry: &'a ProfileRegistry,
        client: SharedClient,
        settings: ConversationSettings,
        store: TranscriptStore,
    ) -> Self {
        Self {
            registry,
            client,
            settings,
            store,
        }
    }

    /// Run the catalog once.
    ///
    /// `service` replaces every pair's default service profile when set;
    /// `max_turns` overrides the configured round budget.
    pub async fn run(
        &self,
        service: Option<ProfileName>,
        max_turns: Option<usize>,
    ) -> Result<BatchReport> {
        let batch_timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let batch_folder = self.store.batch_dir()?;
        let catalog = self.registry.batch_catalog();

        info!(
            pairs = catalog.len(),
            folder = %batch_folder.display(),
            "Starting batch run"
        );

        let mut results = Vec::with_capacity(catalog.len());
        let mut successful_runs = 0;
        let mut total_turns = 0;

        for pair in &catalog {
            let service_name = service.unwrap_or(pair.service);
            let item = self
                .run_pair(pair.persona, service_name, max_turns, &batch_folder)
                .await;

            if item.success {
                successful_runs += 1;
            } else {
                warn!(
                    persona = %item.profile,
                    service = %item.service,
                    message = %item.message,
                    "Batch pair failed"
                );
            }
            total_turns += item.turn_count;
            results.push(item);
        }

        info!(
            successful = successful_runs,
            total = results.len(),
            turns = total_turns,
            "Batch run finished"
        );

        Ok(BatchReport {
            total_runs: results.len(),
            successful_runs,
            total_turns,
            batch_timestamp,
            batch_folder: batch_folder.display().to_string(),
            results,
        })
    }

    /// One pair, fully isolated: any failure becomes a report item.
    async fn run_pair(
        &self,
        persona: ProfileName,
        service: ProfileName,
        max_turns: Option<usize>,
        batch_folder: &std::path::Path,
    ) -> BatchItem {
        match self
            .run_conversation(persona, service, max_turns, batch_folder)
            .await
        {
            Ok((conversation, saved_filepath)) => {
                let failed = conversation.terminated_reason.is_error();
                BatchItem {
                    profile: persona,
                    service,
                    success: !failed,
                    message: describe_outcome(&conversation),
                    turn_count: conversation.turn_count(),
                    saved_filepath: Some(saved_filepath),
                }
            }
            Err(e) => BatchItem {
                profile: persona,
                service,
                success: false,
                message: e.to_string(),
                turn_count: 0,
                saved_filepath: None,
            },
        }
    }

    async fn run_conversation(
        &self,
        persona: ProfileName,
        service: ProfileName,
        max_turns: Option<usize>,
        batch_folder: &std::path::Path,
    ) -> Result<(Conversation, String)> {
        let persona_agent = Agent::new(self.registry.get(persona).clone(), self.client.clone());
        let service_agent = Agent::new(self.registry.get(service).clone(), self.client.clone());

        let config = OrchestratorConfig::from_settings(&self.settings, max_turns);
        let mut orchestrator = Orchestrator::new(persona_agent, service_agent, config)?;
        let conversation = orchestrator.run().await?;

        let path = self.store.save_in(batch_folder, &conversation)?;
        Ok((conversation, path.display().to_string()))
    }
}

fn describe_outcome(conversation: &Conversation) -> String {
    use crate::conversation::TerminatedReason;

    match &conversation.terminated_reason {
        TerminatedReason::NaturalEnd => {
            format!("completed after {} turns", conversation.turn_count())
        }
        TerminatedReason::MaxTurnsReached => {
            format!("reached turn budget at {} turns", conversation.turn_count())
        }
        TerminatedReason::Error {
            speaker, message, ..
        } => format!("{} agent failed: {}", speaker, message),
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
