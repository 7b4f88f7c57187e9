//! Chat-completions HTTP client
//!
//! Speaks the OpenAI `/chat/completions` protocol, buffered or streamed.

use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use crate::inference::streaming::delta_stream;
use crate::inference::{ChatModel, CompletionRequest, DeltaStream, InferenceError};
use crate::types::message::Message;

/// Upper bound for a buffered (non-streaming) call
const COMPLETE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, InferenceError> {
        if api_key.trim().is_empty() {
            tracing::warn!("OPENAI_API_KEY not set, every model call will fail");
        }

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("sulama-asistani/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request_builder(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::RequestBuilder, InferenceError> {
        if self.api_key.is_empty() {
            return Err(InferenceError::MissingApiKey);
        }

        let body = ApiRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            stream,
        };

        let builder = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body);
        Ok(builder)
    }

    async fn send(&self, request: &CompletionRequest) -> Result<reqwest::Response, InferenceError> {
        let response = self
            .request_builder(request, false)?
            .timeout(COMPLETE_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, InferenceError> {
        tracing::debug!(
            "Completion with {} ({} messages)",
            request.model,
            request.messages.len()
        );
        let text = self.send(&request).await?.text().await?;
        parse_completion(&text)
    }

    async fn stream(&self, request: CompletionRequest) -> Result<DeltaStream, InferenceError> {
        tracing::debug!(
            "Streaming with {} ({} messages)",
            request.model,
            request.messages.len()
        );
        let mut source = EventSource::new(self.request_builder(&request, true)?)
            .map_err(|e| InferenceError::StreamSetup(e.to_string()))?;

        // Connect now so a rejected request fails before any output is promised
        match source.next().await {
            Some(Ok(event)) => Ok(delta_stream(stream::iter([Ok(event)]).chain(source))),
            Some(Err(reqwest_eventsource::Error::InvalidStatusCode(status, response))) => {
                source.close();
                let body = response.text().await.unwrap_or_default();
                Err(InferenceError::Api {
                    status: status.as_u16(),
                    body,
                })
            }
            Some(Err(e)) => {
                source.close();
                Err(e.into())
            }
            None => Err(InferenceError::EmptyResponse),
        }
    }
}

/// Extract `choices[0].message.content` from a buffered completion body
fn parse_completion(body: &str) -> Result<String, InferenceError> {
    let parsed: ApiResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::Malformed(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or(InferenceError::EmptyResponse)
}
