use serde::{Deserialize, Serialize};

use crate::models::suite::Bucket;

/// What happened to one tier during upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketUpload {
    pub bucket: Bucket,
    /// False for empty tiers, which are skipped
    pub attempted: bool,
    pub success: bool,
    pub message: String,
    /// Tests in the tier
    pub count: usize,
    /// Import requests issued for the tier
    pub attempts: u32,
    pub job_id: Option<String>,
}

impl BucketUpload {
    pub fn skipped(bucket: Bucket) -> Self {
        Self {
            bucket,
            attempted: false,
            success: false,
            message: "no tests in this tier".to_string(),
            count: 0,
            attempts: 0,
            job_id: None,
        }
    }
}

/// Test counts aggregated over attempted tiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub total_tests: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Result of uploading a classified suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub buckets: Vec<BucketUpload>,
    pub summary: UploadSummary,
}

impl UploadResult {
    pub fn from_buckets(buckets: Vec<BucketUpload>) -> Self {
        let summary = buckets
            .iter()
            .filter(|b| b.attempted)
            .fold(UploadSummary::default(), |mut acc, b| {
                acc.total_tests += b.count;
                if b.success {
                    acc.succeeded += b.count;
                } else {
                    acc.failed += b.count;
                }
                acc
            });

        Self { buckets, summary }
    }

    pub fn bucket(&self, bucket: Bucket) -> Option<&BucketUpload> {
        self.buckets.iter().find(|b| b.bucket == bucket)
    }

    pub fn all_succeeded(&self) -> bool {
        self.summary.failed == 0
    }

    pub fn none_succeeded(&self) -> bool {
        self.summary.succeeded == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempted(bucket: Bucket, success: bool, count: usize) -> BucketUpload {
        BucketUpload {
            bucket,
            attempted: true,
            success,
            message: String::new(),
            count,
            attempts: 1,
            job_id: None,
        }
    }

    #[test]
    fn test_summary_counts_tests_of_attempted_tiers() {
        let result = UploadResult::from_buckets(vec![
            attempted(Bucket::Critical, true, 3),
            attempted(Bucket::Important, false, 2),
            BucketUpload::skipped(Bucket::Optional),
        ]);

        assert_eq!(
            result.summary,
            UploadSummary {
                total_tests: 5,
                succeeded: 3,
                failed: 2
            }
        );
        assert!(!result.all_succeeded());
        assert!(!result.none_succeeded());
        assert!(!result.bucket(Bucket::Optional).unwrap().attempted);
    }
}
