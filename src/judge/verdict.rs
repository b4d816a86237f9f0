//! Judge verdict types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Structured assessment parsed out of one judge reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assessment {
    /// Per-criterion scores on a 1-10 scale.
    pub scores: BTreeMap<String, f64>,
    /// Letter grade (A through F).
    pub grade: String,
    /// Short free-form rationale.
    pub summary: String,
}

/// Composite result of the synthesis pass over the surviving assessments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Synthesis {
    pub scores: BTreeMap<String, f64>,
    pub grade: String,
    pub executive_summary: String,
}

/// One rubric judge's contribution, keyed by rubric name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentAnalysis {
    pub rubric: String,
    pub assessment: Assessment,
}

/// Accounting for a mixture run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MixtureSummary {
    pub successful_agents: usize,
    pub total_agents: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// How the verdict was produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum JudgeMode {
    Single {
        analysis: Assessment,
    },
    Mixture {
        /// Assessments in rubric-catalog order; failed passes are absent.
        agent_analyses: Vec<AgentAnalysis>,
        /// Missing when every rubric pass failed.
        #[serde(skip_serializing_if = "Option::is_none")]
        synthesis: Option<Synthesis>,
        summary: MixtureSummary,
    },
}

/// Verdict over one transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JudgeVerdict {
    pub success: bool,
    #[serde(flatten)]
    pub mode: JudgeMode,
}

impl JudgeVerdict {
    /// True when the verdict came from a mixture run.
    pub fn is_mixture(&self) -> bool {
        matches!(self.mode, JudgeMode::Mixture { .. })
    }
}
