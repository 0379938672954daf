//! Azure DevOps work item data models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reference names of the work item fields the pipeline reads or writes
pub mod fields {
    pub const TITLE: &str = "System.Title";
    pub const DESCRIPTION: &str = "System.Description";
    pub const ACCEPTANCE_CRITERIA: &str = "Microsoft.VSTS.Common.AcceptanceCriteria";
    pub const WORK_ITEM_TYPE: &str = "System.WorkItemType";
    pub const STATE: &str = "System.State";
    pub const PRIORITY: &str = "Microsoft.VSTS.Common.Priority";
    pub const AREA_PATH: &str = "System.AreaPath";
    pub const TAGS: &str = "System.Tags";
    pub const VALUE_AREA: &str = "Microsoft.VSTS.Common.ValueArea";
    pub const HISTORY: &str = "System.History";
}

/// A single work item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    pub id: u64,

    /// Revision counter, bumped on every successful write
    #[serde(default)]
    pub rev: u64,

    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl WorkItem {
    /// A field rendered as text; numbers are formatted, missing or null fields are `None`
    pub fn field_text(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Response of the batch work item query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemBatch {
    #[serde(default)]
    pub count: u64,

    #[serde(default)]
    pub value: Vec<WorkItem>,
}

/// JSON-patch operation kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
    Test,
}

/// One entry of a JSON-patch document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    pub value: Value,
}

impl PatchOperation {
    /// Guard the document on the expected revision
    pub fn test_revision(rev: u64) -> Self {
        Self {
            op: PatchOp::Test,
            path: "/rev".to_string(),
            value: Value::from(rev),
        }
    }

    /// Replace a field's value
    pub fn replace_field(field: &str, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOp::Replace,
            path: format!("/fields/{}", field),
            value: value.into(),
        }
    }

    /// Add (or overwrite) a field's value
    pub fn add_field(field: &str, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOp::Add,
            path: format!("/fields/{}", field),
            value: value.into(),
        }
    }
}
