//! Hosted LLM access
//!
//! The assistant talks to a chat-completions style API through the
//! [`ChatModel`] trait, so the HTTP client can be swapped for a scripted model
//! in tests.

pub mod client;
pub mod streaming;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;

use crate::types::message::Message;

pub use client::OpenAiClient;

/// Inference errors
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("OPENAI_API_KEY is not configured")]
    MissingApiKey,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Event stream failed: {0}")]
    Stream(#[from] reqwest_eventsource::Error),
    #[error("Cannot open event stream: {0}")]
    StreamSetup(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("No response content from model")]
    EmptyResponse,
}

/// One chat completion call
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Stream of content deltas produced by a streaming completion
pub type DeltaStream = BoxStream<'static, Result<String, InferenceError>>;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run a completion and return the whole reply
    async fn complete(&self, request: CompletionRequest) -> Result<String, InferenceError>;

    /// Run a completion and yield the reply as it is generated
    async fn stream(&self, request: CompletionRequest) -> Result<DeltaStream, InferenceError>;
}
