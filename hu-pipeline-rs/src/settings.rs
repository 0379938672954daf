//! Timings and model parameters of every pipeline stage
//!
//! Defaults are the production values. Any of them can be overridden through
//! a `ConfigProvider`, e.g. `REFINERY_GENERATION_MAX_ATTEMPTS=5`.

use std::time::Duration;

use connector_sdk::{ConfigProvider, ConfigProviderExt, RetryPolicy, StepBackoff};

/// Parameters of a single completion call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelCall {
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ModelCall {
    fn load<P: ConfigProvider + ?Sized>(provider: &P, prefix: &str, defaults: ModelCall) -> Self {
        Self {
            max_tokens: provider.get_count_or(&format!("{}_max_tokens", prefix), defaults.max_tokens),
            temperature: provider.get_float_or(
                &format!("{}_temperature", prefix),
                defaults.temperature as f64,
            ) as f32,
            timeout: secs(provider, &format!("{}_timeout_seconds", prefix), defaults.timeout),
        }
    }
}

/// Refinement stage
#[derive(Debug, Clone, PartialEq)]
pub struct RefinementSettings {
    pub call: ModelCall,
    /// Outputs shorter than this are replaced by the filler template
    pub min_output_chars: usize,
    pub min_title_chars: usize,
}

impl Default for RefinementSettings {
    fn default() -> Self {
        Self {
            call: ModelCall {
                max_tokens: 8000,
                temperature: 0.3,
                timeout: Duration::from_secs(90),
            },
            min_output_chars: 1000,
            min_title_chars: 5,
        }
    }
}

/// Test generation stage
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Attempts, backoffs and per-attempt timeouts
    pub retry: RetryPolicy,
    /// Characters of refined text sent when no scenario could be extracted
    pub fallback_chars: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: 8000,
            temperature: 0.2,
            retry: RetryPolicy::default(),
            fallback_chars: 6000,
        }
    }
}

/// Test-system upload stage
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub max_attempts: u32,
    pub import_timeout: Duration,
    /// Pause before each bucket after the first, indexed by bucket position
    pub bucket_spacing: StepBackoff,
    /// Pause after an "import already in progress" rejection, indexed by attempt
    pub in_progress_wait: StepBackoff,
    /// Pause after a transient failure, indexed by attempt
    pub transient_wait: StepBackoff,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            import_timeout: Duration::from_secs(45),
            bucket_spacing: StepBackoff::new(Duration::from_secs(10), Duration::from_secs(5)),
            in_progress_wait: StepBackoff::new(Duration::from_secs(15), Duration::from_secs(10)),
            transient_wait: StepBackoff::new(Duration::from_secs(5), Duration::from_secs(3)),
        }
    }
}

/// All stage settings
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub refinement: RefinementSettings,
    pub normalizer: ModelCall,
    pub translation: ModelCall,
    pub generation: GenerationSettings,
    pub upload: UploadSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            refinement: RefinementSettings::default(),
            normalizer: ModelCall {
                max_tokens: 3500,
                temperature: 0.1,
                timeout: Duration::from_secs(50),
            },
            translation: ModelCall {
                max_tokens: 4000,
                temperature: 0.1,
                timeout: Duration::from_secs(60),
            },
            generation: GenerationSettings::default(),
            upload: UploadSettings::default(),
        }
    }
}

impl PipelineSettings {
    /// Defaults overridden by whatever keys `provider` defines
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Self {
        let d = Self::default();

        let refinement = RefinementSettings {
            call: ModelCall::load(provider, "refinement", d.refinement.call),
            min_output_chars: provider
                .get_count_or("refinement_min_output_chars", d.refinement.min_output_chars),
            min_title_chars: d.refinement.min_title_chars,
        };

        let retry = RetryPolicy {
            max_attempts: provider
                .get_count_or("generation_max_attempts", d.generation.retry.max_attempts),
            base_timeout: secs(provider, "generation_base_timeout_seconds", d.generation.retry.base_timeout),
            timeout_step: secs(provider, "generation_timeout_step_seconds", d.generation.retry.timeout_step),
            ..d.generation.retry.clone()
        };

        let generation = GenerationSettings {
            max_tokens: provider.get_count_or("generation_max_tokens", d.generation.max_tokens),
            temperature: provider
                .get_float_or("generation_temperature", d.generation.temperature as f64)
                as f32,
            retry,
            fallback_chars: provider
                .get_count_or("generation_fallback_chars", d.generation.fallback_chars),
        };

        let upload = UploadSettings {
            max_attempts: provider.get_count_or("upload_max_attempts", d.upload.max_attempts),
            import_timeout: secs(provider, "upload_import_timeout_seconds", d.upload.import_timeout),
            ..d.upload.clone()
        };

        Self {
            refinement,
            normalizer: ModelCall::load(provider, "normalizer", d.normalizer),
            translation: ModelCall::load(provider, "translation", d.translation),
            generation,
            upload,
        }
    }

    /// Settings with every pause and timeout scaled down, for tests against local mocks
    pub fn fast() -> Self {
        let mut settings = Self::default();
        let ms = Duration::from_millis;

        settings.generation.retry.response_backoff = StepBackoff::linear(ms(5));
        settings.generation.retry.transport_backoff = StepBackoff::linear(ms(10));
        settings.generation.retry.base_timeout = ms(500);
        settings.generation.retry.timeout_step = ms(250);
        settings.upload.bucket_spacing = StepBackoff::new(ms(5), ms(1));
        settings.upload.in_progress_wait = StepBackoff::new(ms(5), ms(5));
        settings.upload.transient_wait = StepBackoff::new(ms(2), ms(1));
        settings.upload.import_timeout = ms(500);
        settings
    }
}

fn secs<P: ConfigProvider + ?Sized>(provider: &P, key: &str, default: Duration) -> Duration {
    Duration::from_secs(provider.get_count_or(key, default.as_secs()))
}
