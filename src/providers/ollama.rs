use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{status_error, transport_error, RetryPolicy, StoryGenerator};
use crate::errors::BackendError;
use crate::story::StoryPrompt;

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Retry attempts and backoff
    retry: RetryPolicy,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    pub model: String,
    /// Generated text
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Create a new generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: None,
        }
    }

    /// Set the system message
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }

    /// Set the maximum number of tokens to generate
    pub fn num_predict(mut self, num_predict: u32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).num_predict = Some(num_predict);
        self
    }

    /// Disable streaming
    pub fn no_stream(mut self) -> Self {
        self.stream = Some(false);
        self
    }
}

/// Parse a generate response, accepting a streamed (JSONL) body as well
fn parse_generation(body: &str) -> Result<GenerationResponse, BackendError> {
    if let Ok(response) = serde_json::from_str::<GenerationResponse>(body) {
        return Ok(response);
    }

    let chunks: Vec<GenerationResponse> = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()
        .map_err(|e| {
            let preview: String = body.chars().take(500).collect();
            error!("Failed to parse Ollama API response: {}. Raw response (first 500 chars): {}", e, preview);
            BackendError::invalid_response(format!("Failed to parse Ollama API response: {}", e))
        })?;

    let Some(last) = chunks.last() else {
        return Err(BackendError::invalid_response("Ollama returned an empty body"));
    };
    Ok(GenerationResponse {
        model: last.model.clone(),
        response: chunks.iter().map(|c| c.response.as_str()).collect(),
        done: last.done,
        prompt_eval_count: last.prompt_eval_count,
        eval_count: last.eval_count,
    })
}

impl Ollama {
    /// Create a new Ollama client from a base URL such as `http://localhost:11434`
    pub fn new(base_url: impl Into<String>, timeout_secs: u64, retry: RetryPolicy) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                // Ollama uses HTTP/1.1
                .http1_only()
                .build()
                .unwrap_or_default(),
            retry,
        }
    }

    /// Generate text from the Ollama API with retry logic
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, BackendError> {
        let url = format!("{}/api/generate", self.base_url);
        let url = url.as_str();

        self.retry
            .run("Ollama", move || async move {
                let response = self
                    .client
                    .post(url)
                    .json(request)
                    .send()
                    .await
                    .map_err(|e| transport_error("Ollama", e))?;

                if !response.status().is_success() {
                    return Err(status_error("Ollama", response).await);
                }

                let body = response
                    .text()
                    .await
                    .map_err(|e| transport_error("Ollama", e))?;
                parse_generation(&body)
            })
            .await
    }
}

/// Story generator backed by a local Ollama model
#[derive(Debug)]
pub struct OllamaGenerator {
    client: Ollama,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OllamaGenerator {
    pub fn new(client: Ollama, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: 2048,
            temperature: 0.8,
        }
    }

    /// Set generation limits
    pub fn with_generation(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl StoryGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &StoryPrompt) -> Result<String, BackendError> {
        // The prefill goes at the end of the prompt so the model continues it
        let request = GenerationRequest::new(&self.model, format!("{}\n\n{}", prompt.request, prompt.prefill))
            .system(prompt.instructions.clone())
            .temperature(self.temperature)
            .num_predict(self.max_tokens)
            .no_stream();

        let response = self.client.generate(&request).await?;
        debug!(
            "Ollama story from {}: {:?} prompt tokens, {:?} generated tokens",
            response.model, response.prompt_eval_count, response.eval_count
        );

        if response.response.trim().is_empty() {
            return Err(BackendError::invalid_response("Ollama returned no text"));
        }
        Ok(prompt.complete_with(&response.response))
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
