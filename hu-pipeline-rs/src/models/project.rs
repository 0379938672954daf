use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Credentials for the project's issue tracker
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerCredentials {
    pub token: String,
    pub organization: String,
    pub project: String,
}

impl fmt::Debug for TrackerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerCredentials")
            .field("token", &"[REDACTED]")
            .field("organization", &self.organization)
            .field("project", &self.project)
            .finish()
    }
}

/// Credentials for the project's test-management system
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSystemCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for TestSystemCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSystemCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// A tenant configuration. At most one project per owner is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub tracker: TrackerCredentials,
    pub test_system: TestSystemCredentials,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// New inactive project
    pub fn new(
        owner_id: impl Into<String>,
        name: impl Into<String>,
        tracker: TrackerCredentials,
        test_system: TestSystemCredentials,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            name: name.into(),
            tracker,
            test_system,
            is_active: false,
            created_at: Utc::now(),
        }
    }
}
