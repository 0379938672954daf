//! Issue tracker contract used by the pipeline
//!
//! Wraps a [`WorkItemTracker`] transport with ticket-level semantics: id
//! validation, plain-text extraction, feature/module resolution and the
//! revision-guarded push of approved content.

use std::sync::Arc;

use chrono::Utc;
use connector_sdk::azure_devops::{fields, PatchOperation};
use connector_sdk::WorkItemTracker;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::error::{PipelineError, Result};
use crate::models::TicketSnapshot;
use crate::normalizer::ContentNormalizer;
use crate::taxonomy::resolve_feature_module;

/// Tags written on approval
pub const APPROVAL_TAGS: &str = "QA-Refinado;Aprobado;HTML-Formatted";

static TAG: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"<[^>]+>").ok());
static LINE_BREAK: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>|</p>|</div>|</li>|</h\d>").ok());

/// Numeric work item id from a tracker id such as `"129"` or `"HU-129"`
pub fn parse_tracker_id(tracker_id: &str) -> Result<u64> {
    let trimmed = tracker_id.trim();
    let digits = trimmed
        .strip_prefix("HU-")
        .or_else(|| trimmed.strip_prefix("hu-"))
        .unwrap_or(trimmed);

    digits.parse::<u64>().map_err(|_| {
        PipelineError::validation(format!("tracker id must be numeric, got '{}'", tracker_id))
    })
}

/// Tracker markup reduced to plain text
pub fn strip_markup(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let text = match LINE_BREAK.as_ref() {
        Some(re) => re.replace_all(html, "\n").into_owned(),
        None => html.to_string(),
    };
    let text = match TAG.as_ref() {
        Some(re) => re.replace_all(&text, "").into_owned(),
        None => text,
    };

    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ticket-level access to the issue tracker
#[derive(Clone)]
pub struct IssueTrackerClient {
    transport: Arc<dyn WorkItemTracker>,
    normalizer: ContentNormalizer,
}

impl IssueTrackerClient {
    pub fn new(transport: Arc<dyn WorkItemTracker>, normalizer: ContentNormalizer) -> Self {
        Self {
            transport,
            normalizer,
        }
    }

    /// Fetch a work item as a ticket snapshot
    #[instrument(skip(self))]
    pub async fn fetch_ticket(&self, tracker_id: &str) -> Result<TicketSnapshot> {
        let id = parse_tracker_id(tracker_id)?;

        let item = self
            .transport
            .query_work_item(id)
            .await?
            .ok_or_else(|| PipelineError::not_found(format!("no work item with id {}", id)))?;

        let taxonomy = resolve_feature_module(&item.fields);
        let snapshot = TicketSnapshot {
            tracker_id: id.to_string(),
            title: item.field_text(fields::TITLE).unwrap_or_default(),
            description: strip_markup(&item.field_text(fields::DESCRIPTION).unwrap_or_default()),
            acceptance_criteria: strip_markup(
                &item.field_text(fields::ACCEPTANCE_CRITERIA).unwrap_or_default(),
            ),
            feature: taxonomy.feature,
            module: taxonomy.module,
            work_item_type: item
                .field_text(fields::WORK_ITEM_TYPE)
                .unwrap_or_else(|| "User Story".to_string()),
            state: item
                .field_text(fields::STATE)
                .unwrap_or_else(|| "New".to_string()),
            priority: item
                .field_text(fields::PRIORITY)
                .filter(|p| !p.trim().is_empty()),
        };

        info!(
            id,
            title = %snapshot.title,
            feature = %snapshot.feature,
            module = %snapshot.module,
            description_chars = snapshot.description.len(),
            "Fetched work item"
        );

        Ok(snapshot)
    }

    /// Write approved content back to the tracker.
    ///
    /// Returns whether the tracker reported a new revision. A stale revision
    /// surfaces as [`PipelineError::Conflict`] and is not retried here.
    #[instrument(skip(self, refined, structured))]
    pub async fn push_refined_content(
        &self,
        tracker_id: &str,
        refined: &str,
        structured: &str,
    ) -> Result<bool> {
        let id = parse_tracker_id(tracker_id)?;

        let source = if refined.trim().is_empty() { structured } else { refined };
        let markup = self.normalizer.normalize(source).await;

        let current = self.transport.get_work_item(id).await?;
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

        let operations = vec![
            PatchOperation::test_revision(current.rev),
            PatchOperation::replace_field(fields::DESCRIPTION, markup.description),
            PatchOperation::replace_field(fields::ACCEPTANCE_CRITERIA, markup.acceptance_criteria),
            PatchOperation::add_field(fields::TAGS, APPROVAL_TAGS),
            PatchOperation::add_field(
                fields::HISTORY,
                format!(
                    "<p><strong>Historia de usuario refinada y aprobada por QA.</strong></p><p>Fecha: {}</p>",
                    timestamp
                ),
            ),
        ];

        let updated = self.transport.patch_work_item(id, &operations).await?;
        let confirmed = updated.rev > current.rev;

        if confirmed {
            info!(id, from = current.rev, to = updated.rev, "Tracker content updated");
        } else {
            warn!(id, rev = current.rev, "Tracker accepted the patch without a new revision");
        }

        Ok(confirmed)
    }
}
