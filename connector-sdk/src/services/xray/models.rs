//! XRay bulk import data models
//!
//! Shapes follow the XRay cloud bulk test import format, so a generated
//! test serializes directly into the import request body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reference by key (`{"key": "..."}`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct KeyRef {
    pub key: String,
}

/// Reference by name (`{"name": "..."}`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NameRef {
    pub name: String,
}

/// Jira fields of the test issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct XrayTestFields {
    pub summary: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub project: KeyRef,

    #[serde(default)]
    pub issuetype: NameRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<NameRef>,

    /// Any additional Jira fields supplied by the generator
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One manual step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct XrayStep {
    pub action: String,

    #[serde(default)]
    pub data: String,

    #[serde(default)]
    pub result: String,
}

/// A test in bulk import shape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XrayTest {
    pub testtype: String,

    pub fields: XrayTestFields,

    #[serde(default)]
    pub steps: Vec<XrayStep>,

    /// Repository folder the test is filed under
    #[serde(rename = "testPath")]
    pub test_path: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub xray_test_sets: Vec<String>,
}

/// Result of an accepted import request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportReceipt {
    /// Asynchronous import job id, when the service returns one
    pub job_id: Option<String>,

    /// Raw response body
    pub raw: Value,
}

impl ImportReceipt {
    pub fn from_body(raw: Value) -> Self {
        let job_id = raw
            .get("jobId")
            .and_then(|id| id.as_str().map(str::to_string).or_else(|| Some(id.to_string())))
            .filter(|id| id != "null");
        Self { job_id, raw }
    }
}
