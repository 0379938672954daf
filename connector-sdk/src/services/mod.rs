//! Service-specific client implementations
//!
//! This module contains client implementations for specific external services.

pub mod azure_devops;
pub mod openrouter;
pub mod xray;
mod common;

pub use common::UserAgent;
