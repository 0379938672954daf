//! Test generator
//!
//! Builds the generation prompt from the scenarios of a refined story, asks
//! the model for a classified suite and retries bad answers under the
//! configured [`RetryPolicy`](connector_sdk::RetryPolicy).

pub mod classify;
pub mod scenarios;

use std::sync::Arc;

use connector_sdk::{Attempt, CompletionProvider, CompletionRequest, RetryExecutor, ServiceError};
use tracing::{info, instrument, warn};

use crate::error::{PipelineError, Result};
use crate::models::{ClassifiedTestSuite, GeneratedSuite, GenerationSummary};
use crate::prompts;
use crate::settings::GenerationSettings;

pub use classify::{bucket_path, classify_answer, positional_split};
pub use scenarios::{extract_scenarios, reduce_input, ScenarioSet};

#[derive(Clone)]
pub struct TestGenerator {
    provider: Arc<dyn CompletionProvider>,
    settings: GenerationSettings,
}

impl TestGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    /// Generate and classify tests for `refined`, filed under `target_path`
    #[instrument(skip(self, refined), fields(refined_chars = refined.len()))]
    pub async fn generate_tests(
        &self,
        refined: &str,
        target_path: &str,
        ticket_id: &str,
    ) -> Result<GeneratedSuite> {
        let target_path = target_path.trim().trim_end_matches('/');
        if target_path.is_empty() {
            return Err(PipelineError::validation("target path must not be empty"));
        }
        if refined.trim().is_empty() {
            return Err(PipelineError::validation("refined content must not be empty"));
        }

        let source = reduce_input(refined, self.settings.fallback_chars);
        let prompt = prompts::test_generation(&source, target_path, ticket_id);
        let executor = RetryExecutor::new(self.settings.retry.clone());

        let outcome = executor
            .execute(|attempt| self.attempt(prompt.clone(), target_path, attempt))
            .await;

        match outcome {
            Ok((suite, attempts)) => {
                let summary = GenerationSummary::of(&suite, attempts);
                info!(
                    total = summary.total,
                    critical = summary.critical,
                    important = summary.important,
                    optional = summary.optional,
                    attempts,
                    "Test suite generated"
                );
                Ok(GeneratedSuite { suite, summary })
            }
            Err(exhausted) => {
                warn!(attempts = exhausted.attempts, error = %exhausted.source, "Test generation gave up");
                Err(PipelineError::Generation {
                    attempts: exhausted.attempts,
                    cause: exhausted.source.to_string(),
                })
            }
        }
    }

    async fn attempt(
        &self,
        prompt: String,
        target_path: &str,
        attempt: Attempt,
    ) -> connector_sdk::Result<ClassifiedTestSuite> {
        let request = CompletionRequest::new(prompt)
            .max_tokens(self.settings.max_tokens)
            .temperature(self.settings.temperature)
            .timeout(attempt.timeout);

        let answer = tokio::time::timeout(attempt.timeout, self.provider.complete(request))
            .await
            .map_err(|_| {
                ServiceError::timeout(format!(
                    "attempt {} exceeded {:?}",
                    attempt.number, attempt.timeout
                ))
            })??;

        classify_answer(&answer, target_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PipelineSettings;
    use crate::test_support::{refined_text, test_json, ScriptedProvider};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    fn generator(provider: Arc<dyn CompletionProvider>) -> TestGenerator {
        TestGenerator::new(provider, PipelineSettings::default().generation)
    }

    fn suite_answer() -> String {
        json!({
            "critical": [test_json("Registro exitoso"), test_json("Redirección al dashboard")],
            "important": [test_json("Cuenta existente")],
            "optional": [test_json("Proveedor caído")]
        })
        .to_string()
    }

    /// Records when each call starts
    struct TimedProvider {
        inner: Arc<ScriptedProvider>,
        starts: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl CompletionProvider for TimedProvider {
        async fn complete(&self, request: CompletionRequest) -> connector_sdk::Result<String> {
            self.starts.lock().unwrap().push(Instant::now());
            self.inner.complete(request).await
        }
    }

    #[tokio::test]
    async fn test_generates_classified_suite() {
        let provider = ScriptedProvider::new(vec![Ok(suite_answer())]);
        let generated = assert_ok!(
            generator(provider.clone())
                .generate_tests(&refined_text(), "DEUN/Login/", "129")
                .await
        );

        assert_eq!(generated.summary.total, 4);
        assert_eq!(generated.summary.critical, 2);
        assert_eq!(generated.summary.attempts, 1);
        assert_eq!(generated.suite.important[0].test_path, "DEUN/Login/Importantes");

        let request = provider.requests.lock().unwrap()[0].clone();
        assert_eq!(request.max_tokens, 8000);
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.timeout, Some(Duration::from_secs(60)));
        assert!(request.prompt.contains("### CRITICAL"));
        assert!(request.prompt.contains("DEUN/Login"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failures_then_success() {
        let scripted = ScriptedProvider::new(vec![
            Err(ServiceError::network("connection reset")),
            Err(ServiceError::timeout("read timed out")),
            Ok(suite_answer()),
        ]);
        let provider = Arc::new(TimedProvider {
            inner: scripted.clone(),
            starts: Mutex::new(Vec::new()),
        });

        let generated = assert_ok!(
            generator(provider.clone())
                .generate_tests(&refined_text(), "DEUN/Login", "129")
                .await
        );
        assert_eq!(generated.summary.attempts, 3);
        assert_eq!(generated.summary.total, 4);

        let starts = provider.starts.lock().unwrap();
        let before_second = starts[1] - starts[0];
        let before_third = starts[2] - starts[1];
        assert_eq!(before_second, Duration::from_secs(3));
        assert_eq!(before_third, Duration::from_secs(6));
        assert!(before_third > before_second);

        let timeouts: Vec<_> = scripted
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.timeout)
            .collect();
        assert_eq!(
            timeouts,
            vec![
                Some(Duration::from_secs(60)),
                Some(Duration::from_secs(90)),
                Some(Duration::from_secs(120)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_answers_exhaust_attempts() {
        let provider = ScriptedProvider::new(vec![
            Ok("Lo siento, no puedo".to_string()),
            Ok("[]".to_string()),
            Ok(json!({ "critical": [{ "testtype": "Manual" }] }).to_string()),
        ]);

        let err = assert_err!(
            generator(provider.clone())
                .generate_tests(&refined_text(), "DEUN/Login", "129")
                .await
        );
        match err {
            PipelineError::Generation { attempts, cause } => {
                assert_eq!(attempts, 3);
                assert!(cause.contains("fields"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_configuration_error_stops_immediately() {
        let provider = ScriptedProvider::new(vec![Err(ServiceError::configuration("missing api key"))]);
        let err = assert_err!(
            generator(provider.clone())
                .generate_tests(&refined_text(), "DEUN/Login", "129")
                .await
        );
        assert!(matches!(err, PipelineError::Generation { attempts: 1, .. }));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_target_path_is_rejected() {
        let provider = ScriptedProvider::new(vec![]);
        let err = assert_err!(generator(provider.clone()).generate_tests("texto", " / ", "129").await);
        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(provider.calls(), 0);
    }
}
