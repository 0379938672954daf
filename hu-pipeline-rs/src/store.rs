//! Storage collaborators
//!
//! The pipeline persists tickets and reads projects through these traits.
//! The in-memory implementations back the binary and the tests.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::models::{Project, Ticket, TicketStatus};

/// Criteria for listing tickets; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    /// Case-insensitive substring of the title
    pub title_contains: Option<String>,
    pub tracker_id: Option<String>,
    pub feature_contains: Option<String>,
    pub module_contains: Option<String>,
}

fn contains_ci(haystack: &str, needle: &Option<String>) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.status.map_or(true, |status| ticket.status == status)
            && self
                .tracker_id
                .as_deref()
                .map_or(true, |id| ticket.tracker_id == id.trim())
            && contains_ci(&ticket.title, &self.title_contains)
            && contains_ci(&ticket.feature, &self.feature_contains)
            && contains_ci(&ticket.module, &self.module_contains)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Store a new ticket; a tracker id already present in the project is rejected
    async fn insert(&self, ticket: Ticket) -> Result<Ticket>;

    /// Replace a stored ticket
    async fn update(&self, ticket: &Ticket) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Ticket>>;

    async fn find_by_tracker_id(&self, project_id: Uuid, tracker_id: &str) -> Result<Option<Ticket>>;

    /// Tickets of a project matching `filter`, newest first
    async fn list(&self, project_id: Uuid, filter: &TicketFilter) -> Result<Vec<Ticket>>;

    /// Whether a ticket was removed
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn insert(&self, project: Project) -> Result<Project>;

    async fn get(&self, id: Uuid) -> Result<Option<Project>>;

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Project>>;

    async fn active_for_owner(&self, owner_id: &str) -> Result<Option<Project>>;

    /// Make `id` the owner's only active project
    async fn activate(&self, owner_id: &str, id: Uuid) -> Result<Project>;
}

/// Tickets held in insertion order
#[derive(Debug, Default, Clone)]
pub struct InMemoryTicketStore {
    tickets: Arc<RwLock<Vec<Ticket>>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn insert(&self, ticket: Ticket) -> Result<Ticket> {
        let mut tickets = self.tickets.write().await;

        if tickets
            .iter()
            .any(|t| t.project_id == ticket.project_id && t.tracker_id == ticket.tracker_id)
        {
            return Err(PipelineError::validation(format!(
                "ticket {} already exists in this project",
                ticket.tracker_id
            )));
        }

        tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn update(&self, ticket: &Ticket) -> Result<()> {
        let mut tickets = self.tickets.write().await;
        let slot = tickets
            .iter_mut()
            .find(|t| t.id == ticket.id)
            .ok_or_else(|| PipelineError::not_found(format!("ticket {}", ticket.id)))?;
        *slot = ticket.clone();
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Ticket>> {
        let tickets = self.tickets.read().await;
        Ok(tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn find_by_tracker_id(&self, project_id: Uuid, tracker_id: &str) -> Result<Option<Ticket>> {
        let tickets = self.tickets.read().await;
        Ok(tickets
            .iter()
            .find(|t| t.project_id == project_id && t.tracker_id == tracker_id)
            .cloned())
    }

    async fn list(&self, project_id: Uuid, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let tickets = self.tickets.read().await;
        let mut found: Vec<Ticket> = tickets
            .iter()
            .rev()
            .filter(|t| t.project_id == project_id && filter.matches(t))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tickets = self.tickets.write().await;
        let before = tickets.len();
        tickets.retain(|t| t.id != id);
        Ok(tickets.len() < before)
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryProjectStore {
    projects: Arc<RwLock<Vec<Project>>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn insert(&self, project: Project) -> Result<Project> {
        let mut projects = self.projects.write().await;
        if projects.iter().any(|p| p.id == project.id) {
            return Err(PipelineError::validation(format!("project {} already exists", project.id)));
        }
        // A project inserted as active takes over from its siblings
        if project.is_active {
            for sibling in projects.iter_mut().filter(|p| p.owner_id == project.owner_id) {
                sibling.is_active = false;
            }
        }
        projects.push(project.clone());
        Ok(project)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Project>> {
        let projects = self.projects.read().await;
        Ok(projects.iter().find(|p| p.id == id).cloned())
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Project>> {
        let projects = self.projects.read().await;
        Ok(projects.iter().filter(|p| p.owner_id == owner_id).cloned().collect())
    }

    async fn active_for_owner(&self, owner_id: &str) -> Result<Option<Project>> {
        let projects = self.projects.read().await;
        Ok(projects
            .iter()
            .find(|p| p.owner_id == owner_id && p.is_active)
            .cloned())
    }

    async fn activate(&self, owner_id: &str, id: Uuid) -> Result<Project> {
        let mut projects = self.projects.write().await;

        if !projects.iter().any(|p| p.id == id && p.owner_id == owner_id) {
            return Err(PipelineError::not_found(format!(
                "project {} of owner {}",
                id, owner_id
            )));
        }

        let mut activated = None;
        for project in projects.iter_mut().filter(|p| p.owner_id == owner_id) {
            project.is_active = project.id == id;
            if project.is_active {
                activated = Some(project.clone());
            }
        }

        info!(%id, owner_id, "Project activated");
        activated.ok_or_else(|| PipelineError::storage("activated project vanished"))
    }
}
