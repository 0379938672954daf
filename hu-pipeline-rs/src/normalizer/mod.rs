//! Content normalizer
//!
//! Turns refined free text into the two markup fields the tracker expects.
//! One model call is tried first; anything it gets wrong falls back to the
//! deterministic builder in [`heuristic`], so normalization never fails.

pub mod heuristic;

use std::sync::Arc;

use connector_sdk::util::{extract_json_fragment, strip_code_fences, truncate_string};
use connector_sdk::{CompletionProvider, CompletionRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::prompts;
use crate::settings::ModelCall;

pub use heuristic::{normalize_heuristic, Vocabulary};

/// Markup for the tracker's description and acceptance-criteria fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedContent {
    pub description: String,
    pub acceptance_criteria: String,
}

impl NormalizedContent {
    /// Both halves carry the markup the tracker renders
    fn looks_formatted(&self) -> bool {
        (self.description.contains("<p>") || self.description.contains("<strong>"))
            && (self.acceptance_criteria.contains("<h3>") || self.acceptance_criteria.contains("<p>"))
    }
}

/// Normalizer backed by a completion provider
#[derive(Clone)]
pub struct ContentNormalizer {
    provider: Arc<dyn CompletionProvider>,
    call: ModelCall,
}

impl ContentNormalizer {
    pub fn new(provider: Arc<dyn CompletionProvider>, call: ModelCall) -> Self {
        Self { provider, call }
    }

    /// Normalize `raw`; never fails
    pub async fn normalize(&self, raw: &str) -> NormalizedContent {
        if raw.trim().is_empty() {
            return heuristic::placeholder();
        }

        match self.normalize_with_model(raw).await {
            Some(content) => {
                info!(
                    description_chars = content.description.len(),
                    criteria_chars = content.acceptance_criteria.len(),
                    "Normalized content with model"
                );
                content
            }
            None => {
                warn!("Model normalization unusable, using heuristic markup");
                normalize_heuristic(raw)
            }
        }
    }

    /// Single model attempt; `None` on any transport, parse or shape problem
    pub async fn normalize_with_model(&self, raw: &str) -> Option<NormalizedContent> {
        let request = CompletionRequest::new(prompts::normalization(raw))
            .max_tokens(self.call.max_tokens)
            .temperature(self.call.temperature)
            .timeout(self.call.timeout);

        let answer = match self.provider.complete(request).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Normalization call failed");
                return None;
            }
        };

        let content = parse_normalized(&answer)?;
        if !content.looks_formatted() {
            debug!(preview = %truncate_string(&answer, 200), "Normalization answer lacks markup");
            return None;
        }

        Some(content)
    }
}

/// Parse the model's JSON object, tolerating code fences and surrounding prose
pub(crate) fn parse_normalized(answer: &str) -> Option<NormalizedContent> {
    let body = strip_code_fences(answer);

    let parsed = serde_json::from_str::<NormalizedContent>(body).or_else(|e| {
        extract_json_fragment(body, '{', '}')
            .ok_or(e)
            .and_then(serde_json::from_str::<NormalizedContent>)
    });

    match parsed {
        Ok(content) => Some(NormalizedContent {
            description: content.description.trim().to_string(),
            acceptance_criteria: content.acceptance_criteria.trim().to_string(),
        }),
        Err(e) => {
            debug!(error = %e, "Normalization answer is not the expected JSON object");
            None
        }
    }
}
