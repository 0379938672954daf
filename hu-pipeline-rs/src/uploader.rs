//! Test-system uploader
//!
//! Imports a classified suite one tier at a time. The test system refuses
//! overlapping import jobs, so tiers are spaced out and an "import already in
//! progress" rejection waits longer than an ordinary transient failure.

use std::sync::Arc;
use std::time::Duration;

use connector_sdk::xray::{ImportReceipt, XrayTest};
use connector_sdk::{Backoff, ServiceError, StepBackoff, TestImporter};
use tracing::{error, info, instrument, warn};

use crate::error::{PipelineError, Result};
use crate::models::{Bucket, BucketUpload, ClassifiedTestSuite, UploadResult};
use crate::settings::UploadSettings;

#[derive(Clone)]
pub struct TestUploader {
    importer: Arc<dyn TestImporter>,
    settings: UploadSettings,
}

impl TestUploader {
    pub fn new(importer: Arc<dyn TestImporter>, settings: UploadSettings) -> Self {
        Self { importer, settings }
    }

    /// Upload every non-empty tier, critical first.
    ///
    /// Fails only when authentication fails; per-tier failures are reported
    /// in the returned [`UploadResult`].
    #[instrument(skip_all, fields(total = suite.total()))]
    pub async fn upload_classified(&self, suite: &ClassifiedTestSuite) -> Result<UploadResult> {
        if suite.is_empty() {
            info!("Nothing to upload");
            return Ok(UploadResult::from_buckets(
                Bucket::ALL.into_iter().map(BucketUpload::skipped).collect(),
            ));
        }

        let token = self.importer.authenticate().await.map_err(|e| {
            error!(error = %e, "Test system authentication failed");
            PipelineError::Upload(format!("authentication failed: {}", e))
        })?;

        let mut buckets = Vec::with_capacity(Bucket::ALL.len());
        let mut spacing = self.settings.bucket_spacing.start();
        let mut uploads = 0;

        for bucket in Bucket::ALL {
            // One step per tier position after the first, uploaded or not
            let pause = match bucket {
                Bucket::Critical => None,
                _ => spacing.next_backoff(),
            };

            let tests = suite.bucket(bucket);
            if tests.is_empty() {
                buckets.push(BucketUpload::skipped(bucket));
                continue;
            }

            if let Some(pause) = pause.filter(|_| uploads > 0) {
                info!(%bucket, ?pause, "Waiting before next import job");
                tokio::time::sleep(pause).await;
            }

            buckets.push(self.upload_bucket(&token, bucket, tests).await);
            uploads += 1;
        }

        let result = UploadResult::from_buckets(buckets);
        info!(
            succeeded = result.summary.succeeded,
            failed = result.summary.failed,
            "Upload finished"
        );
        Ok(result)
    }

    async fn upload_bucket(&self, token: &str, bucket: Bucket, tests: &[XrayTest]) -> BucketUpload {
        let max_attempts = self.settings.max_attempts.max(1);
        let count = tests.len();
        let mut in_progress_wait = self.settings.in_progress_wait.start();
        let mut transient_wait = self.settings.transient_wait.start();
        let mut attempt = 1;

        loop {
            match self.import(token, tests).await {
                Ok(receipt) => {
                    info!(%bucket, count, attempt, job_id = ?receipt.job_id, "Tier imported");
                    return BucketUpload {
                        bucket,
                        attempted: true,
                        success: true,
                        message: format!("{} tests imported", count),
                        count,
                        attempts: attempt,
                        job_id: receipt.job_id,
                    };
                }
                Err(err) => match wait_after(&err, &mut in_progress_wait, &mut transient_wait) {
                    Some(pause) if attempt < max_attempts => {
                        warn!(%bucket, attempt, ?pause, error = %err, "Import failed, retrying");
                        tokio::time::sleep(pause).await;
                        attempt += 1;
                    }
                    _ => {
                        error!(%bucket, attempt, error = %err, "Tier import failed");
                        return BucketUpload {
                            bucket,
                            attempted: true,
                            success: false,
                            message: err.to_string(),
                            count,
                            attempts: attempt,
                            job_id: None,
                        };
                    }
                },
            }
        }
    }

    async fn import(&self, token: &str, tests: &[XrayTest]) -> connector_sdk::Result<ImportReceipt> {
        let timeout = self.settings.import_timeout;
        tokio::time::timeout(timeout, self.importer.import_tests(token, tests, timeout))
            .await
            .map_err(|_| ServiceError::timeout(format!("import exceeded {:?}", timeout)))?
    }
}

/// Pause before retrying after `err`; `None` when the failure is terminal for the tier.
///
/// Both schedules advance on every failure, so the n-th retry waits the
/// n-th step of whichever schedule matches the failure.
fn wait_after(
    err: &ServiceError,
    in_progress_wait: &mut StepBackoff,
    transient_wait: &mut StepBackoff,
) -> Option<Duration> {
    let in_progress = in_progress_wait.next_backoff();
    let transient = transient_wait.next_backoff();
    match err.root() {
        ServiceError::ImportInProgress(_) => in_progress,
        _ if err.is_retryable() => transient,
        _ => None,
    }
}
