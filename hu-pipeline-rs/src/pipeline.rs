//! Pipeline coordinator
//!
//! Sequences the stages for one owner's active project:
//!
//! - `create_ticket`: fetch from the tracker, persist, refine
//! - `approve`: accept refined content and push it to the tracker
//! - `reject`: record feedback and re-refine
//! - `generate_and_upload_tests`: generate a classified suite and import it
//!
//! Every operation returns an [`OperationResult`]; stages that fail after a
//! usable value exists are reported as partial success instead of errors.

use std::sync::Arc;

use chrono::Utc;
use connector_sdk::CompletionProvider;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::factory::{ConnectorFactory, Connectors};
use crate::models::{
    Bucket, ClassifiedTestSuite, GeneratedTestsRecord, GenerationSummary, Language, Project,
    Ticket, TicketStatus, TrackerSync, UploadResult,
};
use crate::normalizer::ContentNormalizer;
use crate::outcome::OperationResult;
use crate::prompts::StoryFields;
use crate::refinement::RefinementGenerator;
use crate::settings::PipelineSettings;
use crate::store::{ProjectStore, TicketFilter, TicketStore};
use crate::testgen::TestGenerator;
use crate::tracker::{parse_tracker_id, IssueTrackerClient};
use crate::uploader::TestUploader;

/// What `generate_and_upload_tests` produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRunReport {
    pub ticket_id: Uuid,
    pub tracker_id: String,
    pub target_path: String,
    pub generation: GenerationSummary,
    pub suite: ClassifiedTestSuite,
    /// Absent when the upload could not start
    pub upload: Option<UploadResult>,
}

/// Runs pipeline operations against one project
pub struct PipelineCoordinator {
    project: Project,
    tickets: Arc<dyn TicketStore>,
    tracker: IssueTrackerClient,
    refiner: RefinementGenerator,
    generator: TestGenerator,
    uploader: TestUploader,
}

impl PipelineCoordinator {
    /// Wire the stages for `project` around already-built connectors
    pub fn new(
        project: Project,
        connectors: Connectors,
        tickets: Arc<dyn TicketStore>,
        provider: Arc<dyn CompletionProvider>,
        settings: &PipelineSettings,
    ) -> Self {
        let normalizer = ContentNormalizer::new(Arc::clone(&provider), settings.normalizer);

        Self {
            tracker: IssueTrackerClient::new(connectors.tracker, normalizer),
            refiner: RefinementGenerator::new(
                Arc::clone(&provider),
                settings.refinement.clone(),
                settings.translation,
            ),
            generator: TestGenerator::new(Arc::clone(&provider), settings.generation.clone()),
            uploader: TestUploader::new(connectors.importer, settings.upload.clone()),
            project,
            tickets,
        }
    }

    /// Coordinator for the owner's active project, read once
    pub async fn for_active_project(
        owner_id: &str,
        projects: &dyn ProjectStore,
        tickets: Arc<dyn TicketStore>,
        factory: &dyn ConnectorFactory,
        provider: Arc<dyn CompletionProvider>,
        settings: &PipelineSettings,
    ) -> Result<Self> {
        let project = projects.active_for_owner(owner_id).await?.ok_or_else(|| {
            PipelineError::validation(format!("owner {} has no active project", owner_id))
        })?;
        let connectors = factory.connect(&project)?;

        info!(project = %project.name, owner_id, "Pipeline ready");
        Ok(Self::new(project, connectors, tickets, provider, settings))
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Fetch a ticket from the tracker, store it and refine it.
    ///
    /// A refinement failure leaves the stored ticket in the Failed content
    /// state and is reported as partial success.
    #[instrument(skip(self), fields(project = %self.project.name))]
    pub async fn create_ticket(&self, tracker_id: &str, language: Language) -> OperationResult<Ticket> {
        OperationResult::settle(self.create_ticket_inner(tracker_id, language).await)
    }

    async fn create_ticket_inner(
        &self,
        tracker_id: &str,
        language: Language,
    ) -> Result<OperationResult<Ticket>> {
        if tracker_id.trim().is_empty() {
            return Err(PipelineError::validation("tracker id must not be empty"));
        }
        let tracker_id = parse_tracker_id(tracker_id)?.to_string();

        if self
            .tickets
            .find_by_tracker_id(self.project.id, &tracker_id)
            .await?
            .is_some()
        {
            return Err(PipelineError::validation(format!(
                "ticket {} already exists in project {}",
                tracker_id, self.project.name
            )));
        }

        let snapshot = self.tracker.fetch_ticket(&tracker_id).await?;
        let mut ticket = self
            .tickets
            .insert(Ticket::from_snapshot(self.project.id, snapshot, language))
            .await?;

        let story = StoryFields {
            title: &ticket.title,
            description: &ticket.description,
            acceptance_criteria: &ticket.acceptance_criteria,
            feature: &ticket.feature,
            module: &ticket.module,
        };
        let refined = self.refiner.refine(&story, language).await;

        let mut failures = Vec::new();
        match refined {
            Ok(content) => ticket.mark_refined(content),
            Err(e) => {
                error!(tracker_id = %ticket.tracker_id, error = %e, "Refinement failed");
                ticket.mark_refinement_failed(e.to_string());
                failures.push(e.to_string());
            }
        }

        if let Err(e) = self.tickets.update(&ticket).await {
            error!(tracker_id = %ticket.tracker_id, error = %e, "Could not store refinement");
            failures.push(e.to_string());
        }

        info!(tracker_id = %ticket.tracker_id, id = %ticket.id, "Ticket created");
        Ok(OperationResult::partial(ticket, failures))
    }

    #[instrument(skip(self), fields(project = %self.project.name))]
    pub async fn list_tickets(&self, filter: &TicketFilter) -> OperationResult<Vec<Ticket>> {
        match self.tickets.list(self.project.id, filter).await {
            Ok(tickets) => OperationResult::Succeeded(tickets),
            Err(e) => OperationResult::Failed(e),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_ticket(&self, id: Uuid) -> OperationResult<Ticket> {
        match self.load(id).await {
            Ok(ticket) => OperationResult::Succeeded(ticket),
            Err(e) => OperationResult::Failed(e),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_ticket(&self, id: Uuid) -> OperationResult<()> {
        OperationResult::settle(self.delete_ticket_inner(id).await)
    }

    async fn delete_ticket_inner(&self, id: Uuid) -> Result<OperationResult<()>> {
        let ticket = self.load(id).await?;
        if !self.tickets.delete(ticket.id).await? {
            return Err(PipelineError::not_found(format!("ticket {}", id)));
        }
        info!(tracker_id = %ticket.tracker_id, "Ticket deleted");
        Ok(OperationResult::Succeeded(()))
    }

    /// Accept the refined content and push it to the tracker.
    ///
    /// The local acceptance commits even when the tracker push fails; the
    /// outcome is recorded in `tracker_sync` and reported as partial success.
    #[instrument(skip(self))]
    pub async fn approve(&self, id: Uuid) -> OperationResult<Ticket> {
        OperationResult::settle(self.approve_inner(id).await)
    }

    async fn approve_inner(&self, id: Uuid) -> Result<OperationResult<Ticket>> {
        let mut ticket = self.load(id).await?;
        let content = ticket.ready_content()?.clone();
        ticket.transition(TicketStatus::Accepted)?;

        let sync = match self
            .tracker
            .push_refined_content(&ticket.tracker_id, &content.plain, &content.structured)
            .await
        {
            Ok(true) => TrackerSync::Confirmed,
            Ok(false) => TrackerSync::Unconfirmed,
            Err(e) => {
                warn!(tracker_id = %ticket.tracker_id, error = %e, "Tracker sync failed, acceptance kept");
                TrackerSync::Failed {
                    reason: e.to_string(),
                }
            }
        };

        ticket.tracker_sync = Some(sync.clone());
        self.tickets.update(&ticket).await?;

        let failures = match sync {
            TrackerSync::Confirmed => Vec::new(),
            TrackerSync::Unconfirmed => vec!["tracker did not confirm a new revision".to_string()],
            TrackerSync::Failed { reason } => vec![format!("tracker sync failed: {}", reason)],
        };

        info!(tracker_id = %ticket.tracker_id, "Ticket accepted");
        Ok(OperationResult::partial(ticket, failures))
    }

    /// Reject with feedback and re-refine; a Rejected ticket may be rejected again to retry
    #[instrument(skip(self, feedback))]
    pub async fn reject(&self, id: Uuid, feedback: &str) -> OperationResult<Ticket> {
        OperationResult::settle(self.reject_inner(id, feedback).await)
    }

    async fn reject_inner(&self, id: Uuid, feedback: &str) -> Result<OperationResult<Ticket>> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(PipelineError::validation("rejection feedback must not be empty"));
        }

        let mut ticket = self.load(id).await?;
        match ticket.status {
            TicketStatus::Pending => ticket.transition(TicketStatus::Rejected)?,
            TicketStatus::Rejected => info!(tracker_id = %ticket.tracker_id, "Retrying re-refinement"),
            TicketStatus::Accepted => {
                return Err(PipelineError::validation(format!(
                    "ticket {} is already accepted",
                    ticket.tracker_id
                )))
            }
        }

        let previous = match ticket.ready_content() {
            Ok(content) => content.plain.clone(),
            Err(_) => original_story(&ticket),
        };

        ticket.last_feedback = Some(feedback.to_string());
        ticket.mark_refining();
        self.tickets.update(&ticket).await?;

        match self.refiner.re_refine(feedback, &previous, ticket.language).await {
            Ok(content) => {
                ticket.mark_refined(content);
                ticket.transition(TicketStatus::Pending)?;
                self.tickets.update(&ticket).await?;
                info!(tracker_id = %ticket.tracker_id, "Ticket re-refined");
                Ok(OperationResult::Succeeded(ticket))
            }
            Err(e) => {
                error!(tracker_id = %ticket.tracker_id, error = %e, "Re-refinement failed");
                ticket.mark_refinement_failed(e.to_string());
                let mut failures = vec![e.to_string()];
                if let Err(store_err) = self.tickets.update(&ticket).await {
                    failures.push(store_err.to_string());
                }
                Ok(OperationResult::partial(ticket, failures))
            }
        }
    }

    /// Generate a classified suite from the refined content and import it.
    ///
    /// Generation failure aborts before any upload. Upload failures, including
    /// authentication, still report the generated suite.
    #[instrument(skip(self))]
    pub async fn generate_and_upload_tests(
        &self,
        id: Uuid,
        target_path: &str,
    ) -> OperationResult<TestRunReport> {
        OperationResult::settle(self.generate_and_upload_inner(id, target_path).await)
    }

    async fn generate_and_upload_inner(
        &self,
        id: Uuid,
        target_path: &str,
    ) -> Result<OperationResult<TestRunReport>> {
        let mut ticket = self.load(id).await?;
        let content = ticket.ready_content()?.clone();

        let generated = self
            .generator
            .generate_tests(&content.plain, target_path, &ticket.tracker_id)
            .await?;

        ticket.generated_tests = Some(GeneratedTestsRecord {
            suite: generated.suite.clone(),
            summary: generated.summary,
            target_path: target_path.to_string(),
            generated_at: Utc::now(),
        });
        ticket.touch();
        if let Err(e) = self.tickets.update(&ticket).await {
            warn!(tracker_id = %ticket.tracker_id, error = %e, "Could not store generated tests");
        }

        let mut failures = Vec::new();
        let upload = match self.uploader.upload_classified(&generated.suite).await {
            Ok(result) => {
                for bucket in Bucket::ALL {
                    if let Some(b) = result.bucket(bucket).filter(|b| b.attempted && !b.success) {
                        failures.push(format!("{} upload failed: {}", bucket, b.message));
                    }
                }
                Some(result)
            }
            Err(e) => {
                failures.push(e.to_string());
                None
            }
        };

        let report = TestRunReport {
            ticket_id: ticket.id,
            tracker_id: ticket.tracker_id.clone(),
            target_path: target_path.to_string(),
            generation: generated.summary,
            suite: generated.suite,
            upload,
        };
        Ok(OperationResult::partial(report, failures))
    }

    /// A ticket of this project
    async fn load(&self, id: Uuid) -> Result<Ticket> {
        self.tickets
            .get(id)
            .await?
            .filter(|ticket| ticket.project_id == self.project.id)
            .ok_or_else(|| PipelineError::not_found(format!("ticket {}", id)))
    }
}

/// Story as fetched, used when no refined content is available to revise
fn original_story(ticket: &Ticket) -> String {
    let mut text = format!("{}\n\n{}", ticket.title, ticket.description);
    if !ticket.acceptance_criteria.trim().is_empty() {
        text.push_str("\n\n");
        text.push_str(&ticket.acceptance_criteria);
    }
    text
}
