//! # Connector SDK
//!
//! Typed integrations for the external systems the HU refinement pipeline
//! talks to.
//!
//! This crate provides:
//!
//! - Capability traits the pipeline depends on instead of concrete clients
//! - An OpenAI-compatible chat-completions client (OpenRouter by default)
//! - An Azure DevOps work-item client with revision-guarded patches
//! - An XRay client for authentication and bulk test import
//! - A normalized error taxonomy with HTTP error mapping
//! - Retry primitives with linear backoff and progressive timeouts
//! - Configuration providers backed by the environment or memory
//!
//! ## Architecture
//!
//! - `CompletionProvider`: turns a prompt into text
//! - `WorkItemTracker`: reads and patches tracker work items
//! - `TestImporter`: authenticates against and imports into the test system
//! - `RetryExecutor`: attempt loop used by callers that need retries
//! - `ServiceError`: error type shared by every client

pub mod core;
pub use core::{ClientBuilder, CompletionProvider, CompletionRequest, TestImporter, WorkItemTracker};

pub mod services;
pub use services::{azure_devops, openrouter, xray};

pub mod error;
pub use error::{ErrorContext, Result, ServiceError};

pub mod resilience;
pub use resilience::{Attempt, Backoff, RetryExecutor, RetryPolicy, StepBackoff};

pub mod config;
pub use config::{ConfigProvider, ConfigProviderExt, ServiceConfig};

pub mod util;

#[cfg(test)]
mod tests;
