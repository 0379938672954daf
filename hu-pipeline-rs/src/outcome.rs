//! Result type returned by every coordinator operation

use serde::Serialize;

use crate::error::{PipelineError, Result};

/// Outcome of a pipeline operation.
///
/// `PartiallySucceeded` carries a usable value together with the stages
/// that failed after it was produced, e.g. a ticket whose refinement failed
/// or a generated suite whose upload did not go through.
#[derive(Debug)]
pub enum OperationResult<T> {
    Succeeded(T),
    PartiallySucceeded { value: T, failures: Vec<String> },
    Failed(PipelineError),
}

impl<T> OperationResult<T> {
    /// `Succeeded` when `failures` is empty
    pub fn partial(value: T, failures: Vec<String>) -> Self {
        if failures.is_empty() {
            OperationResult::Succeeded(value)
        } else {
            OperationResult::PartiallySucceeded { value, failures }
        }
    }

    /// Collapse an operation body whose early exits are errors
    pub fn settle(result: Result<OperationResult<T>>) -> Self {
        result.unwrap_or_else(OperationResult::Failed)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Succeeded(_))
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, OperationResult::PartiallySucceeded { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, OperationResult::Failed(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            OperationResult::Succeeded(value) | OperationResult::PartiallySucceeded { value, .. } => {
                Some(value)
            }
            OperationResult::Failed(_) => None,
        }
    }

    pub fn failures(&self) -> &[String] {
        match self {
            OperationResult::PartiallySucceeded { failures, .. } => failures,
            _ => &[],
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            OperationResult::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// The value, partial or not; the error otherwise
    pub fn into_result(self) -> Result<T> {
        match self {
            OperationResult::Succeeded(value) | OperationResult::PartiallySucceeded { value, .. } => {
                Ok(value)
            }
            OperationResult::Failed(err) => Err(err),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> OperationResult<U> {
        match self {
            OperationResult::Succeeded(value) => OperationResult::Succeeded(f(value)),
            OperationResult::PartiallySucceeded { value, failures } => {
                OperationResult::PartiallySucceeded {
                    value: f(value),
                    failures,
                }
            }
            OperationResult::Failed(err) => OperationResult::Failed(err),
        }
    }

    pub fn report(&self) -> OperationReport<'_, T> {
        let status = match self {
            OperationResult::Succeeded(_) => "succeeded",
            OperationResult::PartiallySucceeded { .. } => "partially_succeeded",
            OperationResult::Failed(_) => "failed",
        };

        OperationReport {
            status,
            value: self.value(),
            failures: self.failures(),
            error: self.error().map(|err| ErrorReport {
                kind: err.kind(),
                message: err.to_string(),
            }),
        }
    }
}

/// Serializable view of an [`OperationResult`]
#[derive(Debug, Serialize)]
pub struct OperationReport<'a, T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'a T>,
    #[serde(skip_serializing_if = "no_failures")]
    pub failures: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

fn no_failures(failures: &&[String]) -> bool {
    failures.is_empty()
}

#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_without_failures_is_success() {
        assert!(OperationResult::partial(1, vec![]).is_success());
        let partial = OperationResult::partial(1, vec!["upload".to_string()]);
        assert!(partial.is_partial());
        assert_eq!(partial.failures().to_vec(), vec!["upload".to_string()]);
        assert_eq!(partial.into_result().unwrap(), 1);
    }

    #[test]
    fn test_settle_and_report() {
        let failed: OperationResult<u32> =
            OperationResult::settle(Err(PipelineError::validation("feedback is required")));
        assert!(failed.is_failure());
        assert_eq!(
            serde_json::to_value(failed.report()).unwrap(),
            json!({
                "status": "failed",
                "error": { "kind": "validation", "message": "Validation error: feedback is required" }
            })
        );

        let partial = OperationResult::partial("ticket", vec!["tracker sync failed".to_string()]);
        assert_eq!(
            serde_json::to_value(partial.map(str::len).report()).unwrap(),
            json!({ "status": "partially_succeeded", "value": 6, "failures": ["tracker sync failed"] })
        );
    }
}
