//! Core types for the profile system.
//!
//! Profiles are bundled TOML documents describing one side of a simulated
//! conversation: a user persona with a personality and scenario, or a
//! service agent with its operating instructions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Agent Role
// ─────────────────────────────────────────────────────────────────

/// Which side of the conversation an agent plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    /// Simulated customer driving the conversation.
    UserPersona,
    /// Service agent responding to the persona.
    Service,
}

impl AgentRole {
    /// Slug used in transcripts and wire formats.
    pub fn slug(&self) -> &'static str {
        match self {
            AgentRole::UserPersona => "user-persona",
            AgentRole::Service => "service",
        }
    }

    /// The other side of the conversation.
    pub fn other(&self) -> AgentRole {
        match self {
            AgentRole::UserPersona => AgentRole::Service,
            AgentRole::Service => AgentRole::UserPersona,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::UserPersona => write!(f, "UserPersona"),
            AgentRole::Service => write!(f, "Service"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Profile Name
// ─────────────────────────────────────────────────────────────────

/// The closed set of bundled profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileName {
    /// Customer upset about delayed materials for a renovation.
    FrustratedCustomer,
    /// Elderly customer struggling with a new power tool.
    ConfusedElderly,
    /// First-time DIYer worried about getting a project wrong.
    AnxiousDiyer,
    /// Contractor under deadline pressure on a commercial job.
    DemandingContractor,
    /// Homeowner mid-way through a stalled home improvement.
    FrustratedHomeowner,
    /// General customer support representative.
    SupportRep,
    /// Technical product support specialist.
    TechSupport,
}

impl ProfileName {
    /// Slug used in file paths, CLI args, and transcripts.
    pub fn slug(&self) -> &'static str {
        match self {
            ProfileName::FrustratedCustomer => "frustrated-customer",
            ProfileName::ConfusedElderly => "confused-elderly",
            ProfileName::AnxiousDiyer => "anxious-diyer",
            ProfileName::DemandingContractor => "demanding-contractor",
            ProfileName::FrustratedHomeowner => "frustrated-homeowner",
            ProfileName::SupportRep => "support-rep",
            ProfileName::TechSupport => "tech-support",
        }
    }

    /// All bundled profiles.
    pub fn all() -> &'static [ProfileName] {
        &[
            ProfileName::FrustratedCustomer,
            ProfileName::ConfusedElderly,
            ProfileName::AnxiousDiyer,
            ProfileName::DemandingContractor,
            ProfileName::FrustratedHomeowner,
            ProfileName::SupportRep,
            ProfileName::TechSupport,
        ]
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for ProfileName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "frustrated-customer" => Ok(ProfileName::FrustratedCustomer),
            "confused-elderly" => Ok(ProfileName::ConfusedElderly),
            "anxious-diyer" => Ok(ProfileName::AnxiousDiyer),
            "demanding-contractor" => Ok(ProfileName::DemandingContractor),
            "frustrated-homeowner" => Ok(ProfileName::FrustratedHomeowner),
            "support-rep" => Ok(ProfileName::SupportRep),
            "tech-support" => Ok(ProfileName::TechSupport),
            _ => Err(format!("Unknown profile '{}'", s)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Prompt Profile (loaded from TOML)
// ─────────────────────────────────────────────────────────────────

/// Full prompt profile, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptProfile {
    /// Which bundled profile this is.
    pub name: ProfileName,

    /// Which side of the conversation this profile plays.
    pub role: AgentRole,

    /// Short human-readable description.
    pub description: String,

    /// Base instructions that open the system prompt.
    pub base_prompt: String,

    /// Personality traits rendered into the system prompt.
    #[serde(default)]
    pub personality: String,

    /// Roleplay scenario rendered into the system prompt.
    #[serde(default)]
    pub scenario: String,
}

impl PromptProfile {
    /// Render the full system prompt: base instructions, then personality,
    /// then scenario. Empty sections are skipped.
    pub fn system_prompt(&self) -> String {
        let mut prompt = self.base_prompt.trim_end().to_string();

        if !self.personality.is_empty() {
            prompt.push_str("\n\nPERSONALITY:\n");
            prompt.push_str(self.personality.trim());
        }

        if !self.scenario.is_empty() {
            prompt.push_str("\n\nROLEPLAY SCENARIO:\n");
            prompt.push_str(self.scenario.trim());
        }

        prompt
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
