use std::fmt;

use chrono::{DateTime, Utc};
use connector_sdk::xray::XrayTest;
use serde::{Deserialize, Serialize};

/// Priority tier of a generated test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Critical,
    Important,
    Optional,
}

impl Bucket {
    /// Upload and reporting order
    pub const ALL: [Bucket; 3] = [Bucket::Critical, Bucket::Important, Bucket::Optional];

    /// Folder appended to the target repository path
    pub fn path_suffix(self) -> &'static str {
        match self {
            Bucket::Critical => "Criticos",
            Bucket::Important => "Importantes",
            Bucket::Optional => "Opcionales",
        }
    }

    /// JSON keys accepted for this bucket in model output
    pub fn keys(self) -> [&'static str; 2] {
        match self {
            Bucket::Critical => ["critical", "criticos"],
            Bucket::Important => ["important", "importantes"],
            Bucket::Optional => ["optional", "opcionales"],
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keys()[0])
    }
}

/// Generated tests split into the three tiers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedTestSuite {
    pub critical: Vec<XrayTest>,
    pub important: Vec<XrayTest>,
    pub optional: Vec<XrayTest>,
}

impl ClassifiedTestSuite {
    pub fn bucket(&self, bucket: Bucket) -> &[XrayTest] {
        match bucket {
            Bucket::Critical => &self.critical,
            Bucket::Important => &self.important,
            Bucket::Optional => &self.optional,
        }
    }

    pub fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<XrayTest> {
        match bucket {
            Bucket::Critical => &mut self.critical,
            Bucket::Important => &mut self.important,
            Bucket::Optional => &mut self.optional,
        }
    }

    pub fn total(&self) -> usize {
        self.critical.len() + self.important.len() + self.optional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Per-tier counts of a generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub total: usize,
    pub critical: usize,
    pub important: usize,
    pub optional: usize,
    /// Model calls needed to obtain a valid suite
    pub attempts: u32,
}

impl GenerationSummary {
    pub fn of(suite: &ClassifiedTestSuite, attempts: u32) -> Self {
        Self {
            total: suite.total(),
            critical: suite.critical.len(),
            important: suite.important.len(),
            optional: suite.optional.len(),
            attempts,
        }
    }
}

/// Output of the test generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSuite {
    pub suite: ClassifiedTestSuite,
    pub summary: GenerationSummary,
}

/// Generated tests as persisted on the ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTestsRecord {
    pub suite: ClassifiedTestSuite,
    pub summary: GenerationSummary,
    pub target_path: String,
    pub generated_at: DateTime<Utc>,
}
