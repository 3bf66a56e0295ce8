//! Fail-soft generation.
//!
//! The invoker is the only place provider errors are seen. Every failure
//! (transport, timeout, error status, missing payload) is logged and turned
//! into [`Generation::Failed`]; the string API maps that to `""`.

use futures::stream::{self, StreamExt};
use papertrail_config::AppConfig;
use papertrail_core::error::ProviderError;
use papertrail_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::budget::truncate;

/// Characters of a prompt shown in log lines.
const PROMPT_PREVIEW_CHARS: usize = 50;

/// Result of one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// Provider text, verbatim (may be empty).
    Text(String),
    /// Every attempt failed; carries the last failure reason.
    Failed(String),
}

impl Generation {
    /// The generated text, or `""` on failure.
    pub fn into_text(self) -> String {
        match self {
            Generation::Text(text) => text,
            Generation::Failed(_) => String::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Generation::Failed(_))
    }
}

/// Knobs for the invoker, usually taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
    /// Total attempts per prompt, at least 1.
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    /// Prompts in flight during `batch_invoke`, at least 1.
    pub max_concurrency: usize,
}

impl GenerationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let generation = &config.generation;
        Self {
            model: config.active_model().to_string(),
            temperature: config.default_temperature,
            max_tokens: generation.max_tokens,
            timeout: Duration::from_secs(generation.timeout_secs),
            max_attempts: generation.max_attempts.max(1),
            retry_backoff: Duration::from_millis(generation.retry_backoff_ms),
            max_concurrency: generation.max_concurrency.max(1),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

pub struct GenerationInvoker {
    provider: Arc<dyn Provider>,
    settings: GenerationSettings,
}

impl GenerationInvoker {
    pub fn new(provider: Arc<dyn Provider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Generate text for `prompt`, retrying up to `max_attempts` times.
    pub async fn generate(&self, prompt: &str) -> Generation {
        let preview = truncate(prompt, PROMPT_PREVIEW_CHARS);
        let attempts = self.settings.max_attempts.max(1);
        let mut last_failure = String::new();

        for attempt in 1..=attempts {
            let request = self.request(prompt);
            let outcome = tokio::time::timeout(self.settings.timeout, self.provider.complete(request)).await;

            let err = match outcome {
                Ok(Ok(response)) => {
                    info!(
                        provider = self.provider.name(),
                        attempt,
                        prompt = %preview,
                        "Generated response"
                    );
                    return Generation::Text(response.text);
                }
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(format!(
                    "no response within {}s",
                    self.settings.timeout.as_secs()
                )),
            };

            warn!(
                provider = self.provider.name(),
                attempt,
                max_attempts = attempts,
                error = %err,
                prompt = %preview,
                "Generation attempt failed"
            );
            last_failure = err.to_string();

            if attempt == attempts || !is_retryable(&err) {
                break;
            }
            if !self.settings.retry_backoff.is_zero() {
                tokio::time::sleep(self.settings.retry_backoff).await;
            }
        }

        error!(
            provider = self.provider.name(),
            error = %last_failure,
            prompt = %preview,
            "Generation failed; returning empty text"
        );
        Generation::Failed(last_failure)
    }

    /// Generated text, or `""` on any failure.
    pub async fn invoke(&self, prompt: &str) -> String {
        self.generate(prompt).await.into_text()
    }

    /// One result per prompt, in input order. Each prompt fails independently.
    pub async fn batch_invoke(&self, prompts: &[String]) -> Vec<String> {
        let results: Vec<String> = stream::iter(prompts)
            .map(|prompt| self.invoke(prompt))
            .buffered(self.settings.max_concurrency.max(1))
            .collect()
            .await;
        debug!(count = results.len(), "Completed batch generation");
        results
    }

    fn request(&self, prompt: &str) -> ProviderRequest {
        let mut request = ProviderRequest::new(&self.settings.model, prompt);
        request.temperature = self.settings.temperature;
        request.max_tokens = self.settings.max_tokens;
        request
    }
}

/// Errors another attempt could plausibly fix.
fn is_retryable(err: &ProviderError) -> bool {
    match err {
        ProviderError::Network(_)
        | ProviderError::Timeout(_)
        | ProviderError::RateLimited { .. }
        | ProviderError::MalformedResponse(_) => true,
        ProviderError::ApiError { status_code, .. } => *status_code >= 500,
        ProviderError::AuthenticationFailed(_) | ProviderError::NotConfigured(_) => false,
    }
}
