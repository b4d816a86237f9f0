//! Judge execution
//!
//! Single mode runs one overall rubric pass. Mixture mode fans the
//! rubric catalog out with bounded concurrency, then makes one
//! synthesis call over whichever assessments survived.

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::conversation::Conversation;
use crate::error::{Error, Result};
use crate::llm::{ChatMessage, CompletionRequest, SharedClient};

use super::rubric::{Rubric, OVERALL_RUBRIC, RUBRICS};
use super::verdict::{
    AgentAnalysis, Assessment, JudgeMode, JudgeVerdict, MixtureSummary, Synthesis,
};

const JUDGE_SYSTEM_PROMPT: &str = "You are a strict quality-assurance judge \
for customer service conversations. You respond with a single JSON object \
and nothing else.";

/// Runs rubric passes over a finished transcript.
pub struct Judge {
    client: SharedClient,
    model: Option<String>,
    max_concurrency: usize,
}

impl Judge {
    pub fn new(client: SharedClient, model: Option<String>, max_concurrency: usize) -> Self {
        Self {
            client,
            model,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Analyze a transcript in the requested mode.
    pub async fn analyze(&self, conversation: &Conversation, mixture: bool) -> Result<JudgeVerdict> {
        if mixture {
            self.analyze_mixture(conversation).await
        } else {
            self.analyze_single(conversation).await
        }
    }

    /// One overall rubric pass.
    async fn analyze_single(&self, conversation: &Conversation) -> Result<JudgeVerdict> {
        info!(conversation = %conversation.id, "Running single-pass judge");

        let analysis = self.run_pass(&OVERALL_RUBRIC, conversation).await?;
        Ok(JudgeVerdict {
            success: true,
            mode: JudgeMode::Single { analysis },
        })
    }

    /// Concurrent rubric fan-out plus one synthesis call.
    ///
    /// Synthesis runs over the successful subset; only a clean sweep of
    /// failures yields `success = false`.
    async fn analyze_mixture(&self, conversation: &Conversation) -> Result<JudgeVerdict> {
        info!(
            conversation = %conversation.id,
            rubrics = RUBRICS.len(),
            max_concurrency = self.max_concurrency,
            "Running mixture-of-agents judge"
        );

        // Rubrics are iterated by value so the pass futures stay free of
        // borrowed-item lifetimes and the verdict future stays nameable.
        let mut outcomes: Vec<(usize, std::result::Result<Assessment, String>)> =
            stream::iter(RUBRICS.iter().copied().enumerate())
                .map(|(idx, rubric)| async move {
                    let outcome = self
                        .run_pass(&rubric, conversation)
                        .await
                        .map_err(|e| format!("{}: {}", rubric.name, e));
                    (idx, outcome)
                })
                .buffer_unordered(self.max_concurrency)
                .collect()
                .await;

        // Report in catalog order, not completion order.
        outcomes.sort_by_key(|(idx, _)| *idx);

        let total_agents = RUBRICS.len();
        let mut agent_analyses = Vec::new();
        let mut errors = Vec::new();
        for (idx, outcome) in outcomes {
            match outcome {
                Ok(assessment) => agent_analyses.push(AgentAnalysis {
                    rubric: RUBRICS[idx].name.to_string(),
                    assessment,
                }),
                Err(message) => {
                    warn!(rubric = RUBRICS[idx].name, error = %message, "Judge pass failed");
                    errors.push(message);
                }
            }
        }

        if agent_analyses.is_empty() {
            return Ok(JudgeVerdict {
                success: false,
                mode: JudgeMode::Mixture {
                    agent_analyses,
                    synthesis: None,
                    summary: MixtureSummary {
                        successful_agents: 0,
                        total_agents,
                        errors,
                    },
                },
            });
        }

        let synthesis = self.run_synthesis(conversation, &agent_analyses).await?;
        let successful_agents = agent_analyses.len();

        Ok(JudgeVerdict {
            success: true,
            mode: JudgeMode::Mixture {
                agent_analyses,
                synthesis: Some(synthesis),
                summary: MixtureSummary {
                    successful_agents,
                    total_agents,
                    errors,
                },
            },
        })
    }

    /// One rubric pass: prompt, completion, JSON extraction.
    async fn run_pass(&self, rubric: &Rubric, conversation: &Conversation) -> Result<Assessment> {
        debug!(rubric = rubric.name, "Running judge pass");

        let prompt = rubric_prompt(rubric, conversation);
        let reply = self.complete(prompt).await.map_err(|e| Error::JudgePassFailed {
            judge: rubric.name.to_string(),
            source: Box::new(e),
        })?;

        extract_json(&reply)
    }

    /// Synthesis barrier over the surviving assessments.
    async fn run_synthesis(
        &self,
        conversation: &Conversation,
        analyses: &[AgentAnalysis],
    ) -> Result<Synthesis> {
        debug!(analyses = analyses.len(), "Running judge synthesis");

        let prompt = synthesis_prompt(conversation, analyses)
            .map_err(|e| Error::JudgeParse { message: e.to_string() })?;
        let reply = self.complete(prompt).await.map_err(|e| Error::JudgePassFailed {
            judge: "synthesis".to_string(),
            source: Box::new(e),
        })?;

        extract_json(&reply)
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let messages = vec![
            ChatMessage::system(JUDGE_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];
        let mut request = CompletionRequest::new(messages);
        if let Some(ref model) = self.model {
            request = request.with_model(model);
        }

        let reply = self.client.complete(request).await?;
        Ok(reply.text)
    }
}

// ─────────────────────────────────────────────────────────────────
// Prompt assembly and reply parsing
// ─────────────────────────────────────────────────────────────────

fn rubric_prompt(rubric: &Rubric, conversation: &Conversation) -> String {
    format!(
        "Evaluate the service representative in the transcript below, \
         focusing on {focus}.\n\n\
         TRANSCRIPT ({turns} turns, persona '{user}' vs service '{service}'):\n\
         {transcript}\n\
         Respond with exactly one JSON object of the form:\n\
         {{\"scores\": {{\"<criterion>\": <1-10>, ...}}, \"grade\": \"<A-F>\", \
         \"summary\": \"<two or three sentences>\"}}",
        focus = rubric.focus,
        turns = conversation.turn_count(),
        user = conversation.participants.user,
        service = conversation.participants.service,
        transcript = conversation.render_text(),
    )
}

fn synthesis_prompt(
    conversation: &Conversation,
    analyses: &[AgentAnalysis],
) -> serde_json::Result<String> {
    let mut sections = String::new();
    for analysis in analyses {
        sections.push_str(&format!(
            "### {} judge\n{}\n\n",
            analysis.rubric,
            serde_json::to_string_pretty(&analysis.assessment)?
        ));
    }

    Ok(format!(
        "Independent judges assessed one customer service conversation \
         ({turns} turns). Combine their assessments into a single composite \
         verdict.\n\n{sections}\
         Respond with exactly one JSON object of the form:\n\
         {{\"scores\": {{\"<criterion>\": <1-10>, ...}}, \"grade\": \"<A-F>\", \
         \"executive_summary\": \"<one short paragraph>\"}}",
        turns = conversation.turn_count(),
        sections = sections,
    ))
}

/// Pull the JSON object out of a judge reply.
///
/// Accepts a bare object, a fenced ```json block, or an object embedded
/// in surrounding prose.
fn extract_json<T: serde::de::DeserializeOwned>(reply: &str) -> Result<T> {
    let body = match reply.find("```") {
        Some(start) => {
            let after = &reply[start + 3..];
            let after = after.strip_prefix("json").unwrap_or(after);
            match after.find("```") {
                Some(end) => &after[..end],
                None => after,
            }
        }
        None => reply,
    };

    let start = body.find('{');
    let end = body.rfind('}');
    let object = match (start, end) {
        (Some(s), Some(e)) if s < e => &body[s..=e],
        _ => {
            return Err(Error::JudgeParse {
                message: format!("no JSON object in reply: {:.80}", reply),
            })
        }
    };

    serde_json::from_str(object).map_err(|e| Error::JudgeParse {
        message: e.to_string(),
    })
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::conversation::{Participants, TerminatedReason, Turn};
    use crate::llm::MockClient;
    use crate::profile::{AgentRole, ProfileName};

    const GOOD_ASSESSMENT: &str =
        r#"{"scores": {"empathy": 8, "clarity": 7}, "grade": "B", "summary": "Solid handling."}"#;
    const GOOD_SYNTHESIS: &str =
        r#"{"scores": {"overall": 7.5}, "grade": "B", "executive_summary": "Good service overall."}"#;

    fn conversation() -> Conversation {
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
                Turn::new(1, AgentRole::Service, "Let me look into that.".to_string()),
            ],
        }
    }

    #[test]
    fn test_extract_json_variants() {
        let a: Assessment = extract_json(GOOD_ASSESSMENT).unwrap();
        assert_eq!(a.grade, "B");

        let fenced = format!("Here is my verdict:\n```json\n{}\n```\n", GOOD_ASSESSMENT);
        let a: Assessment = extract_json(&fenced).unwrap();
        assert_eq!(a.grade, "B");

        let embedded = format!("Sure! {} Hope that helps.", GOOD_ASSESSMENT);
        let a: Assessment = extract_json(&embedded).unwrap();
        assert_eq!(a.scores["empathy"], 8.0);

        let err = extract_json::<Assessment>("no json here").unwrap_err();
        assert!(matches!(err, Error::JudgeParse { .. }));
    }

    #[tokio::test]
    async fn test_single_pass_verdict() {
        let client = Arc::new(MockClient::scripted([GOOD_ASSESSMENT]));
        let judge = Judge::new(client.clone(), None, 4);

        let verdict = judge.analyze(&conversation(), false).await.unwrap();

        assert!(verdict.success);
        assert_eq!(client.call_count(), 1);
        match verdict.mode {
            JudgeMode::Single { analysis } => assert_eq!(analysis.grade, "B"),
            other => panic!("expected single mode, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mixture_all_passes_succeed() {
        let client = Arc::new(MockClient::scripted([
            GOOD_ASSESSMENT,
            GOOD_ASSESSMENT,
            GOOD_ASSESSMENT,
            GOOD_ASSESSMENT,
            GOOD_SYNTHESIS,
        ]));
        let judge = Judge::new(client.clone(), None, 2);

        let verdict = judge.analyze(&conversation(), true).await.unwrap();

        assert!(verdict.success);
        assert_eq!(client.call_count(), 5);
        match verdict.mode {
            JudgeMode::Mixture {
                agent_analyses,
                synthesis,
                summary,
            } => {
                let names: Vec<&str> =
                    agent_analyses.iter().map(|a| a.rubric.as_str()).collect();
                assert_eq!(
                    names,
                    vec!["empathy", "accuracy", "resolution", "professionalism"]
                );
                assert_eq!(summary.successful_agents, 4);
                assert_eq!(summary.total_agents, 4);
                assert!(summary.errors.is_empty());
                assert_eq!(synthesis.unwrap().grade, "B");
            }
            other => panic!("expected mixture mode, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mixture_partial_failure_still_synthesizes() {
        // Two passes come back unparseable, two succeed, then synthesis.
        let client = Arc::new(MockClient::scripted([
            GOOD_ASSESSMENT,
            "I refuse to answer in JSON.",
            GOOD_ASSESSMENT,
            "still not json",
            GOOD_SYNTHESIS,
        ]));
        // Serial fan-out keeps the scripted replies aligned with passes.
        let judge = Judge::new(client.clone(), None, 1);

        let verdict = judge.analyze(&conversation(), true).await.unwrap();

        assert!(verdict.success);
        match verdict.mode {
            JudgeMode::Mixture {
                agent_analyses,
                synthesis,
                summary,
            } => {
                assert_eq!(summary.successful_agents, 2);
                assert_eq!(summary.total_agents, 4);
                assert_eq!(summary.errors.len(), 2);
                assert_eq!(agent_analyses.len(), 2);
                assert!(synthesis.is_some());
            }
            other => panic!("expected mixture mode, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mixture_all_failures_skips_synthesis() {
        let client = Arc::new(MockClient::scripted(["nothing useful"]));
        let judge = Judge::new(client.clone(), None, 4);

        let verdict = judge.analyze(&conversation(), true).await.unwrap();

        assert!(!verdict.success);
        // No synthesis call was made.
        assert_eq!(client.call_count(), 4);
        match verdict.mode {
            JudgeMode::Mixture {
                agent_analyses,
                synthesis,
                summary,
            } => {
                assert!(agent_analyses.is_empty());
                assert!(synthesis.is_none());
                assert_eq!(summary.successful_agents, 0);
                assert_eq!(summary.errors.len(), 4);
            }
            other => panic!("expected mixture mode, got {:?}", other),
        }
    }
}
