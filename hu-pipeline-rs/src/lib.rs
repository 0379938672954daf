//! # HU Pipeline
//!
//! Refinement and test pipeline for requirement tickets (HUs) kept in an
//! issue tracker.
//!
//! A ticket moves through these stages:
//!
//! - Fetched from the tracker and stored under the owner's active project
//! - Refined by a language model into a plain and a Markdown rendition
//! - Approved (content pushed back to the tracker) or rejected with feedback
//!   and re-refined
//! - Turned into a test suite classified as critical, important or optional,
//!   which is imported into the test system one tier at a time
//!
//! ## Architecture
//!
//! - `PipelineCoordinator`: operation entry points returning `OperationResult`
//! - `IssueTrackerClient`: ticket fetch and approved-content push
//! - `RefinementGenerator`: refinement, translation and re-refinement
//! - `TestGenerator`: scenario extraction, generation and classification
//! - `TestUploader`: sequential tier import with in-progress handling
//! - `TicketStore` / `ProjectStore`: persistence collaborators

pub mod error;
pub use error::{PipelineError, Result};

pub mod logging;
pub use logging::{init_logging, LoggingConfig};

pub mod settings;
pub use settings::PipelineSettings;

pub mod models;
pub mod taxonomy;
pub mod prompts;
pub mod normalizer;
pub mod tracker;
pub mod refinement;
pub mod testgen;
pub mod uploader;

pub mod store;
pub use store::{InMemoryProjectStore, InMemoryTicketStore, ProjectStore, TicketFilter, TicketStore};

pub mod factory;
pub use factory::{ConnectorFactory, Connectors, HttpConnectorFactory};

pub mod outcome;
pub use outcome::{OperationReport, OperationResult};

pub mod pipeline;
pub use pipeline::{PipelineCoordinator, TestRunReport};

#[cfg(test)]
pub(crate) mod test_support;
