//! Refinement generator
//!
//! One model call per refinement. English refinements translate their input
//! first and, when the answer still carries Spanish section headers, the
//! answer as well. Translation problems never fail the refinement.

use std::sync::Arc;

use connector_sdk::util::{extract_json_fragment, strip_code_fences};
use connector_sdk::{CompletionProvider, CompletionRequest, ServiceError};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{PipelineError, Result};
use crate::models::{Language, RefinedContent};
use crate::prompts::{self, StoryFields, MARKDOWN_MARKERS, PLAIN_MARKERS, SPANISH_SECTION_HEADERS};
use crate::settings::{ModelCall, RefinementSettings};

/// Owned copy of the story fields, used for translation round-trips
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct StoryText {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    acceptance_criteria: String,
    #[serde(default)]
    feature: String,
    #[serde(default)]
    module: String,
}

impl StoryText {
    fn from_fields(story: &StoryFields<'_>) -> Self {
        Self {
            title: story.title.to_string(),
            description: story.description.to_string(),
            acceptance_criteria: story.acceptance_criteria.to_string(),
            feature: story.feature.to_string(),
            module: story.module.to_string(),
        }
    }

    fn as_fields(&self) -> StoryFields<'_> {
        StoryFields {
            title: &self.title,
            description: &self.description,
            acceptance_criteria: &self.acceptance_criteria,
            feature: &self.feature,
            module: &self.module,
        }
    }
}

fn refinement_error(err: ServiceError) -> PipelineError {
    PipelineError::Refinement(err.to_string())
}

/// Produces refined ticket text through a completion provider
#[derive(Clone)]
pub struct RefinementGenerator {
    provider: Arc<dyn CompletionProvider>,
    settings: RefinementSettings,
    translation: ModelCall,
}

impl RefinementGenerator {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        settings: RefinementSettings,
        translation: ModelCall,
    ) -> Self {
        Self {
            provider,
            settings,
            translation,
        }
    }

    /// Refine a ticket. The same text is returned as plain and structured rendition.
    #[instrument(skip_all, fields(title = %story.title, %language))]
    pub async fn refine(&self, story: &StoryFields<'_>, language: Language) -> Result<RefinedContent> {
        if story.title.trim().chars().count() < self.settings.min_title_chars {
            return Err(PipelineError::validation(format!(
                "title must have at least {} characters",
                self.settings.min_title_chars
            )));
        }

        let prompt = match language {
            Language::Es => prompts::refinement(story, Language::Es),
            Language::En => {
                let translated = self.translate_story(story).await;
                prompts::refinement(&translated.as_fields(), Language::En)
            }
        };

        let mut text = self.complete(prompt).await?;

        if language == Language::En && has_spanish_sections(&text) {
            warn!("English refinement came back with Spanish sections, translating");
            if let Some(translated) = self.translate_text(&text).await {
                text = translated;
            }
        }

        let text = text.trim().to_string();
        let char_count = text.chars().count();
        if char_count < self.settings.min_output_chars {
            warn!(
                chars = char_count,
                floor = self.settings.min_output_chars,
                "Refinement too short, using filler template"
            );
            return Ok(RefinedContent::same(prompts::short_output_filler(
                story.title,
                &text,
                language,
            )));
        }

        info!(chars = char_count, "Refinement completed");
        Ok(RefinedContent::same(text))
    }

    /// Revise a rejected refinement, changing only what the feedback criticizes
    #[instrument(skip_all, fields(%language, feedback_chars = feedback.len()))]
    pub async fn re_refine(
        &self,
        feedback: &str,
        previous: &str,
        language: Language,
    ) -> Result<RefinedContent> {
        let answer = self
            .complete(prompts::re_refinement(feedback, previous, language))
            .await?;

        let content = split_renditions(&answer);
        info!(
            plain_chars = content.plain.len(),
            structured_chars = content.structured.len(),
            "Re-refinement completed"
        );
        Ok(content)
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let request = CompletionRequest::new(prompt)
            .max_tokens(self.settings.call.max_tokens)
            .temperature(self.settings.call.temperature)
            .timeout(self.settings.call.timeout);

        self.provider.complete(request).await.map_err(refinement_error)
    }

    fn translation_request(&self, prompt: String) -> CompletionRequest {
        CompletionRequest::new(prompt)
            .max_tokens(self.translation.max_tokens)
            .temperature(self.translation.temperature)
            .timeout(self.translation.timeout)
    }

    /// Story fields in English, or the originals when translation fails
    async fn translate_story(&self, story: &StoryFields<'_>) -> StoryText {
        let original = StoryText::from_fields(story);

        let payload = match serde_json::to_string_pretty(&original) {
            Ok(payload) => payload,
            Err(_) => return original,
        };

        let answer = match self
            .provider
            .complete(self.translation_request(prompts::fields_translation_to_english(&payload)))
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Story translation failed, refining untranslated input");
                return original;
            }
        };

        let body = strip_code_fences(&answer);
        let parsed = serde_json::from_str::<StoryText>(body).or_else(|e| {
            extract_json_fragment(body, '{', '}')
                .ok_or(e)
                .and_then(serde_json::from_str::<StoryText>)
        });

        match parsed {
            Ok(translated) if !translated.title.trim().is_empty() => translated,
            _ => {
                warn!("Story translation answer unusable, refining untranslated input");
                original
            }
        }
    }

    async fn translate_text(&self, text: &str) -> Option<String> {
        match self
            .provider
            .complete(self.translation_request(prompts::translation_to_english(text)))
            .await
        {
            Ok(answer) if !answer.trim().is_empty() => Some(answer),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Answer translation failed, keeping original text");
                None
            }
        }
    }
}

fn has_spanish_sections(text: &str) -> bool {
    let upper = text.to_uppercase();
    SPANISH_SECTION_HEADERS.iter().any(|header| upper.contains(header))
}

/// Split a re-refinement answer on its plain/markdown markers; whole text for both otherwise
pub(crate) fn split_renditions(answer: &str) -> RefinedContent {
    let whole = answer.trim();

    for (plain_marker, markdown_marker) in PLAIN_MARKERS.iter().zip(MARKDOWN_MARKERS.iter()) {
        let (Some(plain_at), Some(markdown_at)) = (whole.find(plain_marker), whole.find(markdown_marker)) else {
            continue;
        };
        if plain_at >= markdown_at {
            continue;
        }

        let plain = whole[plain_at + plain_marker.len()..markdown_at].trim();
        let structured = whole[markdown_at + markdown_marker.len()..].trim();
        if !plain.is_empty() && !structured.is_empty() {
            return RefinedContent {
                plain: plain.to_string(),
                structured: structured.to_string(),
            };
        }
    }

    RefinedContent::same(whole)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PipelineSettings;
    use crate::test_support::{refined_text, ScriptedProvider};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn generator(provider: Arc<ScriptedProvider>) -> RefinementGenerator {
        let settings = PipelineSettings::default();
        RefinementGenerator::new(provider, settings.refinement, settings.translation)
    }

    fn story(title: &str) -> StoryFields<'_> {
        StoryFields {
            title,
            description: "Permitir registro con Google",
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_short_title_fails_before_any_call() {
        let provider = ScriptedProvider::new(vec![]);
        let err = assert_err!(generator(provider.clone()).refine(&story("Log"), Language::Es).await);
        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_refine_uses_full_answer_verbatim() {
        let answer = refined_text();
        let provider = ScriptedProvider::new(vec![Ok(answer.clone())]);

        let content = assert_ok!(
            generator(provider.clone())
                .refine(&story("Login with Google"), Language::Es)
                .await
        );
        assert_eq!(content.plain, answer.trim());
        assert_eq!(content.plain, content.structured);

        let request = provider.requests.lock().unwrap()[0].clone();
        assert_eq!(request.max_tokens, 8000);
        assert_eq!(request.temperature, 0.3);
        assert_eq!(request.timeout, Some(Duration::from_secs(90)));
        assert!(request.prompt.contains("Login with Google"));
    }

    #[tokio::test]
    async fn test_short_answer_gets_filler() {
        let provider = ScriptedProvider::new(vec![Ok("Muy corto".to_string())]);
        let content = assert_ok!(
            generator(provider)
                .refine(&story("Login with Google"), Language::Es)
                .await
        );
        assert!(content.plain.contains("Login with Google"));
        assert!(content.plain.contains("Muy corto"));
        assert!(content.plain.contains("16/25"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_refinement_error() {
        let provider = ScriptedProvider::new(vec![Err(ServiceError::timeout("90s elapsed"))]);
        let err = assert_err!(
            generator(provider)
                .refine(&story("Login with Google"), Language::Es)
                .await
        );
        assert!(matches!(err, PipelineError::Refinement(_)));
    }

    #[tokio::test]
    async fn test_english_translates_input_and_spanish_answer() {
        let translated_fields = r#"{"title": "Sign up with Google", "description": "Allow sign up with Google"}"#;
        let spanish_answer = refined_text();
        let english_answer = "## REFINED USER STORY\n".to_string() + &"Detailed English text. ".repeat(60);

        let provider = ScriptedProvider::new(vec![
            Ok(translated_fields.to_string()),
            Ok(spanish_answer),
            Ok(english_answer.clone()),
        ]);

        let content = assert_ok!(
            generator(provider.clone())
                .refine(&story("Registro con Google"), Language::En)
                .await
        );

        assert_eq!(provider.calls(), 3);
        assert!(provider.prompt(1).contains("Sign up with Google"));
        assert!(provider.prompt(1).contains("**Main Scenario**"));
        assert_eq!(content.plain, english_answer.trim());
    }

    #[tokio::test]
    async fn test_failed_translation_degrades_to_original_input() {
        let provider = ScriptedProvider::new(vec![
            Ok("I cannot translate that".to_string()),
            Ok("## REFINED USER STORY\n".to_string() + &"English body. ".repeat(100)),
        ]);

        let content = assert_ok!(
            generator(provider.clone())
                .refine(&story("Registro con Google"), Language::En)
                .await
        );

        assert_eq!(provider.calls(), 2);
        assert!(provider.prompt(1).contains("Registro con Google"));
        assert!(content.plain.starts_with("## REFINED USER STORY"));
    }

    #[tokio::test]
    async fn test_re_refine_splits_renditions() {
        let answer = "## ANÁLISIS DEL FEEDBACK\n- falta error -> agregado\n\n\
## FORMATO TEXTO PLANO\nTexto corregido\n\n## FORMATO MARKDOWN\n**Texto** corregido";
        let provider = ScriptedProvider::new(vec![Ok(answer.to_string())]);

        let content = assert_ok!(
            generator(provider.clone())
                .re_refine("falta el caso de error", "historia previa", Language::Es)
                .await
        );
        assert_eq!(content.plain, "Texto corregido");
        assert_eq!(content.structured, "**Texto** corregido");
        assert!(provider.prompt(0).contains("falta el caso de error"));
    }

    #[test]
    fn test_split_without_markers_uses_whole_text() {
        let content = split_renditions("  Historia completa corregida  ");
        assert_eq!(content, RefinedContent::same("Historia completa corregida"));

        let content = split_renditions("## FORMATO MARKDOWN\nx\n## FORMATO TEXTO PLANO\ny");
        assert_eq!(content.plain, content.structured);
    }
}
