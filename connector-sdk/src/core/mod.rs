//! Core abstractions for the connector SDK
//!
//! The pipeline never holds a concrete client. It depends on these
//! capability traits, which the HTTP clients in `services` implement and
//! which tests replace with deterministic stand-ins:
//!
//! - `CompletionProvider`: prompt in, text out
//! - `WorkItemTracker`: read and revision-guarded patch of work items
//! - `TestImporter`: token acquisition and bulk import of tests
//! - `ClientBuilder`: builder for the underlying HTTP client

pub mod builder;
pub use builder::ClientBuilder;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::services::azure_devops::{PatchOperation, WorkItem};
use crate::services::xray::{ImportReceipt, XrayTest};

/// A single non-streaming completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Overrides the client's default timeout when set
    pub timeout: Option<Duration>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: 1024,
            temperature: 0.7,
            timeout: None,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Text completion capability
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete `request.prompt`, returning the model's text verbatim
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// Work item access on the issue tracker
#[async_trait]
pub trait WorkItemTracker: Send + Sync {
    /// Batch query for one id with all fields expanded; `None` when the tracker returns no items
    async fn query_work_item(&self, id: u64) -> Result<Option<WorkItem>>;

    /// Read a single work item including its current revision
    async fn get_work_item(&self, id: u64) -> Result<WorkItem>;

    /// Apply a JSON-patch document and return the updated item
    async fn patch_work_item(&self, id: u64, operations: &[PatchOperation]) -> Result<WorkItem>;
}

/// Test-management import capability
#[async_trait]
pub trait TestImporter: Send + Sync {
    /// Exchange client credentials for a bearer token
    async fn authenticate(&self) -> Result<String>;

    /// Submit one batch of tests as a single import job
    async fn import_tests(
        &self,
        token: &str,
        tests: &[XrayTest],
        timeout: Duration,
    ) -> Result<ImportReceipt>;
}
