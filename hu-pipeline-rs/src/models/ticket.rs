use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::models::suite::GeneratedTestsRecord;

/// Display text stored in the refined fields while refinement runs
pub const REFINING_PLACEHOLDER: &str = "🤖 Refinando con IA... Por favor espera.";

/// Prefix of the display text stored when refinement failed
pub const REFINEMENT_ERROR_PREFIX: &str = "❌ Error refinando";

/// Lifecycle status of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Pending,
    Accepted,
    Rejected,
}

impl TicketStatus {
    /// Allowed edges: Pending→Accepted, Pending→Rejected, Rejected→Pending
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        matches!(
            (self, next),
            (TicketStatus::Pending, TicketStatus::Accepted)
                | (TicketStatus::Pending, TicketStatus::Rejected)
                | (TicketStatus::Rejected, TicketStatus::Pending)
        )
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Accepted => "accepted",
            TicketStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

impl FromStr for TicketStatus {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TicketStatus::Pending),
            "accepted" => Ok(TicketStatus::Accepted),
            "rejected" => Ok(TicketStatus::Rejected),
            other => Err(PipelineError::validation(format!("unknown status '{}'", other))),
        }
    }
}

/// Language the refinement is produced in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::Es => "es",
            Language::En => "en",
        })
    }
}

impl FromStr for Language {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "es" => Ok(Language::Es),
            "en" => Ok(Language::En),
            other => Err(PipelineError::validation(format!(
                "unsupported language '{}', expected es or en",
                other
            ))),
        }
    }
}

/// Where the refined content stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ContentState {
    InProgress,
    Ready,
    Failed { reason: String },
}

impl ContentState {
    /// Classify display text written by older stores that only kept the marker strings
    pub fn from_legacy_text(text: &str) -> Option<ContentState> {
        let trimmed = text.trim();
        if trimmed.contains(REFINING_PLACEHOLDER) {
            Some(ContentState::InProgress)
        } else if trimmed.starts_with(REFINEMENT_ERROR_PREFIX) {
            Some(ContentState::Failed {
                reason: trimmed
                    .trim_start_matches(REFINEMENT_ERROR_PREFIX)
                    .trim_start_matches(':')
                    .trim()
                    .to_string(),
            })
        } else {
            None
        }
    }
}

/// Refined text in its two renditions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinedContent {
    pub plain: String,
    pub structured: String,
}

impl RefinedContent {
    pub fn same(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            plain: text.clone(),
            structured: text,
        }
    }
}

/// Outcome of pushing refined content to the tracker on approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrackerSync {
    /// The tracker reported a new revision
    Confirmed,
    /// The write returned without a revision bump
    Unconfirmed,
    Failed { reason: String },
}

/// Fields read from the tracker when a ticket is first fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSnapshot {
    pub tracker_id: String,
    pub title: String,
    pub description: String,
    pub acceptance_criteria: String,
    pub feature: String,
    pub module: String,
    pub work_item_type: String,
    pub state: String,
    pub priority: Option<String>,
}

/// A requirement ticket (HU) owned by a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub project_id: Uuid,
    pub tracker_id: String,
    pub title: String,
    pub description: String,
    pub acceptance_criteria: String,
    pub feature: String,
    pub module: String,
    pub language: Language,
    pub status: TicketStatus,
    pub content_state: ContentState,
    pub refined: RefinedContent,
    pub generated_tests: Option<GeneratedTestsRecord>,
    pub last_feedback: Option<String>,
    pub tracker_sync: Option<TrackerSync>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// New Pending ticket whose refinement has not finished yet
    pub fn from_snapshot(project_id: Uuid, snapshot: TicketSnapshot, language: Language) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            tracker_id: snapshot.tracker_id,
            title: snapshot.title,
            description: snapshot.description,
            acceptance_criteria: snapshot.acceptance_criteria,
            feature: snapshot.feature,
            module: snapshot.module,
            language,
            status: TicketStatus::Pending,
            content_state: ContentState::InProgress,
            refined: RefinedContent::same(REFINING_PLACEHOLDER),
            generated_tests: None,
            last_feedback: None,
            tracker_sync: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Move to `next`, enforcing the allowed status edges
    pub fn transition(&mut self, next: TicketStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(PipelineError::validation(format!(
                "ticket {} cannot move from {} to {}",
                self.tracker_id, self.status, next
            )));
        }
        self.status = next;
        self.touch();
        Ok(())
    }

    pub fn mark_refining(&mut self) {
        self.content_state = ContentState::InProgress;
        self.refined = RefinedContent::same(REFINING_PLACEHOLDER);
        self.touch();
    }

    pub fn mark_refined(&mut self, content: RefinedContent) {
        self.content_state = ContentState::Ready;
        self.refined = content;
        self.touch();
    }

    pub fn mark_refinement_failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.refined = RefinedContent::same(format!("{}: {}", REFINEMENT_ERROR_PREFIX, reason));
        self.content_state = ContentState::Failed { reason };
        self.touch();
    }

    /// Refined content that downstream stages may consume.
    ///
    /// Rejects tickets whose refinement is running or failed, empty content,
    /// and content still carrying one of the display markers.
    pub fn ready_content(&self) -> Result<&RefinedContent> {
        match &self.content_state {
            ContentState::InProgress => {
                return Err(PipelineError::validation(format!(
                    "ticket {} is still being refined",
                    self.tracker_id
                )))
            }
            ContentState::Failed { reason } => {
                return Err(PipelineError::validation(format!(
                    "ticket {} has no usable refinement: {}",
                    self.tracker_id, reason
                )))
            }
            ContentState::Ready => {}
        }

        if self.refined.plain.trim().is_empty() {
            return Err(PipelineError::validation(format!(
                "ticket {} has empty refined content",
                self.tracker_id
            )));
        }

        if ContentState::from_legacy_text(&self.refined.plain).is_some() {
            return Err(PipelineError::validation(format!(
                "ticket {} refined content is not final",
                self.tracker_id
            )));
        }

        Ok(&self.refined)
    }
}
