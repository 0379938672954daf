//! Pipeline error taxonomy
//!
//! Transport failures arrive as `connector_sdk::ServiceError` and are folded
//! into the variants below at the component boundary.

use connector_sdk::ServiceError;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Caller input or ticket state does not allow the operation
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The tracker or test system answered with a non-success status
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// The connection failed or timed out before any answer
    #[error("Transport error: {0}")]
    Transport(String),

    /// Stale revision on a revision-guarded write
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Refinement error: {0}")]
    Refinement(String),

    #[error("Test generation failed after {attempts} attempt(s): {cause}")]
    Generation { attempts: u32, cause: String },

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        PipelineError::NotFound(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        PipelineError::Storage(message.into())
    }

    /// Short machine-friendly category, used in logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::Upstream { .. } => "upstream",
            PipelineError::Transport(_) => "transport",
            PipelineError::Conflict(_) => "conflict",
            PipelineError::Refinement(_) => "refinement",
            PipelineError::Generation { .. } => "generation",
            PipelineError::Upload(_) => "upload",
            PipelineError::Storage(_) => "storage",
            PipelineError::Configuration(_) => "configuration",
        }
    }
}

impl From<ServiceError> for PipelineError {
    fn from(err: ServiceError) -> Self {
        let message = err.root().to_string();
        match err.root() {
            ServiceError::NotFound(_) => PipelineError::NotFound(message),
            ServiceError::Conflict(_) => PipelineError::Conflict(message),
            ServiceError::Configuration(_) => PipelineError::Configuration(message),
            ServiceError::Network(_) | ServiceError::Timeout(_) => PipelineError::Transport(message),
            _ => match err.status_code() {
                Some(status) => PipelineError::Upstream { status, message },
                None => PipelineError::Upstream { status: 0, message },
            },
        }
    }
}
