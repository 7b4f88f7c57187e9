//! Streaming chat endpoint
//!
//! Quota is checked up front and consumed before the model is called. The
//! reply is relayed chunk by chunk; once the model finishes, the exchange is
//! written to the user's memory (and projects, in design mode).

use std::convert::Infallible;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use crate::agent::prompts::{ChatMode, OUT_OF_SCOPE_REPLY};
use crate::agent::ChatPlan;
use crate::inference::DeltaStream;
use crate::server::error::ApiError;
use crate::server::extract::JsonOrForm;
use crate::server::state::AppState;

pub const REMAINING_HEADER: &str = "x-remaining";

pub const UNAVAILABLE_REPLY: &str = "Sunucu hatası: Asistan şu anda yanıt veremiyor.";

pub const INCOMPLETE_WARNING: &str =
    "\n\n[Uyarı] Cevap tam olarak tamamlanamadı, lütfen tekrar deneyin.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    message: Option<Value>,
    user: Option<ChatUser>,
    mode: Option<String>,
    design_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ChatUser {
    email: Option<String>,
}

pub async fn chat(
    State(state): State<AppState>,
    JsonOrForm(body): JsonOrForm<ChatRequest>,
) -> Result<Response, ApiError> {
    let email = body
        .user
        .as_ref()
        .and_then(|u| u.email.as_deref())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::bad_request("Kullanıcı bilgisi eksik."))?
        .to_string();

    let span = tracing::info_span!("chat", request_id = %Uuid::new_v4(), email = %email);
    handle_chat(state, email, body).instrument(span).await
}

async fn handle_chat(
    state: AppState,
    email: String,
    body: ChatRequest,
) -> Result<Response, ApiError> {
    let user = state
        .users
        .find_async(&email)
        .await?
        .ok_or_else(ApiError::user_not_found)?;
    if !user.has_quota() {
        return Err(ApiError::Forbidden(
            "Soru hakkınız doldu. Paket satın almanız gerekiyor.".to_string(),
        ));
    }

    let message = message_text(body.message.as_ref());
    let mode = ChatMode::parse(body.mode.as_deref());
    let design_data = body.design_data;

    let plan = state
        .assistant
        .prepare(&user, &message, mode, design_data.as_ref())
        .await;

    let (request, user_message) = match plan {
        ChatPlan::OutOfScope => {
            return Ok(text_response(
                StatusCode::OK,
                Some(user.remaining()),
                OUT_OF_SCOPE_REPLY.into(),
            ));
        }
        ChatPlan::Answer { request, user_message } => (request, user_message),
    };

    let remaining = state
        .users
        .update_async(&email, |u| {
            u.used += 1;
            u.remaining()
        })
        .await?;
    tracing::info!("Question accepted, {remaining} remaining");

    let mut deltas = match state.assistant.open_stream(request).await {
        Ok(deltas) => deltas,
        Err(e) => {
            tracing::error!("Model stream failed to start: {e}");
            return Ok(unavailable());
        }
    };

    // Hold the response until the first token so an early failure can still be a 500
    let first = match deltas.next().await {
        Some(Ok(text)) => Some(text),
        Some(Err(e)) => {
            tracing::error!("Model stream failed before any output: {e}");
            return Ok(unavailable());
        }
        None => None,
    };

    let (tx, rx) = mpsc::channel::<String>(32);
    let relay = Relay {
        state,
        email,
        user_message,
        mode,
        design_data,
    };
    tokio::spawn(relay.run(first, deltas, tx).in_current_span());

    let body = stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|chunk| (Ok::<_, Infallible>(Bytes::from(chunk)), rx))
    });

    let mut response = Response::new(Body::from_stream(body));
    set_text_headers(&mut response, Some(remaining));
    Ok(response)
}

/// Forwards model output to the client and records the finished exchange
struct Relay {
    state: AppState,
    email: String,
    user_message: String,
    mode: ChatMode,
    design_data: Option<Value>,
}

impl Relay {
    async fn run(self, first: Option<String>, mut deltas: DeltaStream, tx: mpsc::Sender<String>) {
        let mut reply = String::new();
        let mut client_gone = false;

        if let Some(text) = first {
            reply.push_str(&text);
            client_gone |= tx.send(text).await.is_err();
        }

        while let Some(item) = deltas.next().await {
            match item {
                Ok(text) => {
                    reply.push_str(&text);
                    if !client_gone && tx.send(text).await.is_err() {
                        tracing::debug!("Client disconnected, finishing reply in background");
                        client_gone = true;
                    }
                }
                Err(e) => {
                    tracing::error!("Model stream broke after {} bytes: {e}", reply.len());
                    let _ = tx.send(INCOMPLETE_WARNING.to_string()).await;
                    return;
                }
            }
        }
        drop(tx);

        let Relay {
            state,
            email,
            user_message,
            mode,
            design_data,
        } = self;
        let saved = tokio::task::spawn_blocking(move || {
            state
                .assistant
                .record_exchange(&email, &user_message, &reply, mode, design_data.as_ref())
        })
        .await;

        match saved {
            Ok(Ok(())) => tracing::debug!("Exchange recorded"),
            Ok(Err(e)) => tracing::error!("Failed to record exchange: {e}"),
            Err(e) => tracing::error!("Recording task panicked: {e}"),
        }
    }
}

/// Question text as sent by the client; non-string values are stringified
fn message_text(message: Option<&Value>) -> String {
    match message {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn unavailable() -> Response {
    text_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        None,
        UNAVAILABLE_REPLY.into(),
    )
}

fn text_response(status: StatusCode, remaining: Option<i64>, text: String) -> Response {
    let mut response = (status, text).into_response();
    set_text_headers(&mut response, remaining);
    response
}

fn set_text_headers(response: &mut Response, remaining: Option<i64>) {
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    if let Some(remaining) = remaining {
        headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
    }
}
