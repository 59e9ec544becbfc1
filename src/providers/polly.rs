/*!
 * Speech synthesis through a Polly `SynthesizeSpeech` compatible endpoint.
 *
 * The client posts the JSON request body to `{endpoint}/v1/speech` and
 * returns the response body untouched: encoded audio for audio requests, a
 * newline-delimited speech-mark stream for timing-event requests. Requests
 * are expected to go through a signing gateway; an optional bearer token is
 * sent for it.
 */

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqwest::Client;
use serde::Serialize;

use super::{status_error, transport_error, RetryPolicy, SpeechSynthesizer};
use crate::errors::BackendError;
use crate::synthesis::{OutputFormat, SynthesisRequest};

/// Wire body: the request plus the engine selection
#[derive(Debug, Serialize)]
struct SpeechBody<'a> {
    #[serde(rename = "Engine")]
    engine: &'a str,
    #[serde(flatten)]
    request: &'a SynthesisRequest,
}

/// Polly client
#[derive(Debug)]
pub struct PollyClient {
    client: Client,
    endpoint: String,
    /// Bearer token for the gateway, if it needs one
    api_key: Option<String>,
    /// `standard`, `neural`, ...
    engine: String,
    retry: RetryPolicy,
}

impl PollyClient {
    pub fn new(endpoint: impl Into<String>, engine: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: None,
            engine: engine.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Send `Authorization: Bearer <key>` with every request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = if api_key.is_empty() { None } else { Some(api_key) };
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn speech_url(&self) -> String {
        format!("{}/v1/speech", self.endpoint)
    }

    async fn send_once(&self, url: &str, body: &SpeechBody<'_>) -> Result<Bytes, BackendError> {
        let mut builder = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| transport_error("Polly", e))?;
        if !response.status().is_success() {
            return Err(status_error("Polly", response).await);
        }

        let bytes = response.bytes().await.map_err(|e| transport_error("Polly", e))?;
        if bytes.is_empty() {
            return Err(BackendError::invalid_response("Polly returned an empty stream"));
        }
        Ok(bytes)
    }
}

#[async_trait]
impl SpeechSynthesizer for PollyClient {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes, BackendError> {
        let url = self.speech_url();
        let body = SpeechBody {
            engine: &self.engine,
            request,
        };

        let (url, body) = (url.as_str(), &body);
        let bytes = self
            .retry
            .run("Polly", move || self.send_once(url, body))
            .await?;

        let what = match request.output_format() {
            OutputFormat::Audio => "audio",
            OutputFormat::TimingEvents => "speech marks",
        };
        debug!("Polly returned {} bytes of {} for voice {}", bytes.len(), what, request.voice_id());
        Ok(bytes)
    }

    fn name(&self) -> &str {
        "polly"
    }
}
