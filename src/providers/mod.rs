/*!
 * Backend implementations for story generation and speech synthesis.
 *
 * This module contains client implementations for the external services the
 * narration pipeline talks to:
 * - Anthropic: story generation through the Messages API
 * - Ollama: story generation with a local LLM server
 * - Polly: speech synthesis through a `SynthesizeSpeech` endpoint
 * - Mock: test doubles for both capabilities
 */

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::BackendError;
use crate::story::StoryPrompt;
use crate::synthesis::SynthesisRequest;

/// A generative text backend that writes stories as SSML
#[async_trait]
pub trait StoryGenerator: Send + Sync + Debug {
    /// Generate a raw candidate markup document for the prompt
    ///
    /// # Returns
    /// * `Result<String, BackendError>` - The generated markup or a backend failure
    async fn generate(&self, prompt: &StoryPrompt) -> Result<String, BackendError>;

    /// Short provider name used in logs
    fn name(&self) -> &str;
}

/// A speech-synthesis backend
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + Debug {
    /// Run one synthesis call
    ///
    /// # Returns
    /// * `Result<Bytes, BackendError>` - Audio bytes or a raw timing-event
    ///   stream, depending on the request's output format
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, BackendError>;

    /// Short provider name used in logs
    fn name(&self) -> &str;
}

/// Backend capability handle, built once at startup and passed to the
/// narration functions
#[derive(Debug, Clone)]
pub struct Backends {
    pub generator: Arc<dyn StoryGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl Backends {
    pub fn new(generator: Arc<dyn StoryGenerator>, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { generator, synthesizer }
    }
}

/// Retry settings shared by the HTTP clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first request
    pub max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: 0,
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(1u64 << exponent))
    }

    /// Run `operation` until it succeeds, fails with a permanent error, or
    /// the retries are used up
    pub async fn run<T, F, Fut>(&self, provider: &str, mut operation: F) -> Result<T, BackendError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, BackendError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    log::error!(
                        "{} request failed: {} - attempt {}/{}",
                        provider,
                        e,
                        attempt,
                        self.max_retries + 1
                    );
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Map a reqwest failure to a backend error
pub(crate) fn transport_error(provider: &str, error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::transport(format!("{} request timed out: {}", provider, error))
    } else {
        BackendError::transport(format!("Failed to send request to {}: {}", provider, error))
    }
}

/// Turn a non-success HTTP response into a backend error
pub(crate) async fn status_error(provider: &str, response: reqwest::Response) -> BackendError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    log::error!("{} API error ({}): {}", provider, status, error_text);
    BackendError::from_status(status.as_u16(), format!("{} API error ({}): {}", provider, status, error_text))
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod polly;
