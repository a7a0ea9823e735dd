//! Content pipeline: the workflow state, the typed delta each stage returns, and the
//! shared context stages run against.
//!
//! Stages never mutate the state they are handed. Each one borrows the current
//! `WorkflowState`, does its model/news calls, and returns its own update type. The
//! controller in `crate::workflow` folds those updates back with `WorkflowState::apply`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use common::PipelineConfig;

use crate::llm::LlmProvider;
use crate::news::NewsDigest;
use crate::publish::PublishOutcome;

pub mod critique;
pub mod draft;
pub mod package;
pub mod refine;
pub mod research;

pub use critique::{critique, EditorVerdict};
pub use draft::{draft, Tone};
pub use package::{package, FinalMetadata};
pub use refine::refine;
pub use research::{research, SearchPlan, LOW_CONFIDENCE_NOTICE};

/// Editor's view of how much work a draft still needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    MinorPolish,
    MajorRewrite,
    Perfect,
}

/// The record threaded through one workflow run
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowState {
    /// Caller topic, replaced by Research with the refined keyword query
    pub topic: String,
    pub research_summary: String,
    pub angles: Vec<String>,
    pub draft: String,
    /// Pending editor feedback; empty unless a refine pass is due
    pub critique: String,
    pub revision_count: u32,
    pub is_approved: bool,
    pub score: Option<u8>,
    pub feedback_type: Option<FeedbackType>,
    /// Last editor feedback, kept once the revision loop is over
    pub critique_notes: String,
    pub final_metadata: Option<FinalMetadata>,
    pub publish: Option<PublishOutcome>,
}

impl WorkflowState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Merge a stage's delta. Every field a stage owns is written explicitly;
    /// fields it does not own are left alone.
    pub fn apply(&mut self, update: StageUpdate) {
        match update {
            StageUpdate::Research(u) => {
                self.topic = u.topic;
                self.research_summary = u.research_summary;
                self.angles = u.angles;
            }
            StageUpdate::Draft(u) => {
                self.draft = u.draft;
                self.revision_count = u.revision_count;
            }
            StageUpdate::Critique(u) => {
                self.is_approved = u.is_approved;
                self.score = Some(u.score);
                self.critique = u.critique;
                self.feedback_type = Some(u.feedback_type);
            }
            StageUpdate::Refine(u) => {
                self.draft = u.draft;
                self.revision_count = u.revision_count;
                self.critique = u.critique;
            }
            StageUpdate::Package(u) => {
                self.final_metadata = Some(u.final_metadata);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResearchUpdate {
    pub topic: String,
    pub research_summary: String,
    pub angles: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DraftUpdate {
    pub draft: String,
    pub revision_count: u32,
}

#[derive(Debug, Clone)]
pub struct CritiqueUpdate {
    pub is_approved: bool,
    pub score: u8,
    pub critique: String,
    pub feedback_type: FeedbackType,
}

#[derive(Debug, Clone)]
pub struct RefineUpdate {
    pub draft: String,
    pub revision_count: u32,
    pub critique: String,
}

#[derive(Debug, Clone)]
pub struct PackageUpdate {
    pub final_metadata: FinalMetadata,
}

#[derive(Debug, Clone)]
pub enum StageUpdate {
    Research(ResearchUpdate),
    Draft(DraftUpdate),
    Critique(CritiqueUpdate),
    Refine(RefineUpdate),
    Package(PackageUpdate),
}

impl From<ResearchUpdate> for StageUpdate {
    fn from(u: ResearchUpdate) -> Self {
        StageUpdate::Research(u)
    }
}

impl From<DraftUpdate> for StageUpdate {
    fn from(u: DraftUpdate) -> Self {
        StageUpdate::Draft(u)
    }
}

impl From<CritiqueUpdate> for StageUpdate {
    fn from(u: CritiqueUpdate) -> Self {
        StageUpdate::Critique(u)
    }
}

impl From<RefineUpdate> for StageUpdate {
    fn from(u: RefineUpdate) -> Self {
        StageUpdate::Refine(u)
    }
}

impl From<PackageUpdate> for StageUpdate {
    fn from(u: PackageUpdate) -> Self {
        StageUpdate::Package(u)
    }
}

/// Phrases the writer is told never to use
pub const DEFAULT_DRAFT_BANNED_PHRASES: &[&str] = &[
    "Delve",
    "Tapestry",
    "Game-changer",
    "Revolutionary",
    "In conclusion",
    "Buzzword",
    "Beacon",
];

/// Phrases the editor checks for locally before consulting the model
pub const DEFAULT_EDITOR_BANNED_PHRASES: &[&str] = &[
    "delve",
    "tapestry",
    "ever-evolving",
    "landscape",
    "game-changer",
    "moreover",
    "in conclusion",
];

/// Tunables for the stages and the revision loop
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_revisions: u32,
    pub min_digest_chars: usize,
    pub excerpt_chars: usize,
    pub draft_banned_phrases: Vec<String>,
    pub editor_banned_phrases: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_revisions: 2,
            min_digest_chars: 50,
            excerpt_chars: 4000,
            draft_banned_phrases: DEFAULT_DRAFT_BANNED_PHRASES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            editor_banned_phrases: DEFAULT_EDITOR_BANNED_PHRASES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        let defaults = Self::default();
        Self {
            max_revisions: config.max_revisions.unwrap_or(defaults.max_revisions),
            min_digest_chars: config.min_digest_chars.unwrap_or(defaults.min_digest_chars),
            excerpt_chars: config.excerpt_chars.unwrap_or(defaults.excerpt_chars),
            draft_banned_phrases: config
                .draft_banned_phrases
                .clone()
                .unwrap_or(defaults.draft_banned_phrases),
            editor_banned_phrases: config
                .editor_banned_phrases
                .clone()
                .unwrap_or(defaults.editor_banned_phrases),
        }
    }
}

/// Collaborators every stage runs against
#[derive(Clone)]
pub struct StageContext {
    /// Structured and evaluation calls
    pub fast: Arc<dyn LlmProvider>,
    /// Synthesis and long-form writing
    pub creative: Arc<dyn LlmProvider>,
    pub news: Arc<dyn NewsDigest>,
    pub settings: PipelineSettings,
}
