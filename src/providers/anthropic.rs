use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{status_error, transport_error, StoryGenerator};
use crate::errors::BackendError;
use crate::story::StoryPrompt;

/// Default public Messages API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";

/// Anthropic story generator using the Messages API
#[derive(Debug)]
pub struct AnthropicGenerator {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL (optional, defaults to public API)
    endpoint: String,
    /// The model to use
    model: String,
    /// Maximum number of tokens to generate
    max_tokens: u32,
    /// Temperature for generation
    temperature: f32,
}

/// Anthropic message request
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<AnthropicMessage>,

    /// System prompt to guide the AI
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    max_tokens: u32,
}

/// Anthropic message format
#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role of the message sender (user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    /// The content of the response
    pub content: Vec<AnthropicContent>,
    /// Why generation stopped (`end_turn`, `max_tokens`, ...)
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Token usage information
    pub usage: TokenUsage,
}

/// Individual content block in an Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    /// The type of content
    #[serde(rename = "type")]
    pub content_type: String,

    /// The actual text content
    #[serde(default)]
    pub text: String,
}

impl AnthropicRequest {
    /// Create a new Anthropic request
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            temperature: None,
            max_tokens,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(AnthropicMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Request for a story prompt, with the prefill as a partial assistant turn
    pub fn for_story(model: impl Into<String>, max_tokens: u32, prompt: &StoryPrompt) -> Self {
        let request = Self::new(model, max_tokens)
            .system(prompt.instructions.clone())
            .add_message("user", prompt.request.clone());
        if prompt.prefill.is_empty() {
            request
        } else {
            request.add_message("assistant", prompt.prefill.clone())
        }
    }
}

impl AnthropicResponse {
    /// Concatenated text blocks of the response
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

impl AnthropicGenerator {
    /// Create a new Anthropic generator
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
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

    fn messages_url(&self) -> String {
        let base = if self.endpoint.is_empty() {
            DEFAULT_ENDPOINT
        } else {
            self.endpoint.as_str()
        };
        format!("{}/v1/messages", base.trim_end_matches('/'))
    }

    /// Complete a messages request
    pub async fn complete(&self, request: &AnthropicRequest) -> Result<AnthropicResponse, BackendError> {
        let response = self
            .client
            .post(self.messages_url())
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("Anthropic", e))?;

        if !response.status().is_success() {
            return Err(status_error("Anthropic", response).await);
        }

        response.json::<AnthropicResponse>().await.map_err(|e| {
            error!("Failed to parse Anthropic API response: {}", e);
            BackendError::invalid_response(format!("Failed to parse Anthropic API response: {}", e))
        })
    }
}

#[async_trait]
impl StoryGenerator for AnthropicGenerator {
    async fn generate(&self, prompt: &StoryPrompt) -> Result<String, BackendError> {
        let request = AnthropicRequest::for_story(&self.model, self.max_tokens, prompt)
            .temperature(self.temperature);
        let response = self.complete(&request).await?;

        debug!(
            "Anthropic story: {} input tokens, {} output tokens, stop reason {:?}",
            response.usage.input_tokens, response.usage.output_tokens, response.stop_reason
        );

        let text = response.text();
        if text.trim().is_empty() {
            return Err(BackendError::invalid_response("Anthropic returned no text"));
        }
        Ok(prompt.complete_with(&text))
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
