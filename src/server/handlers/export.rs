//! PDF download of a chat answer or saved project

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::export::{render_project_pdf, safe_file_name};
use crate::server::error::ApiError;
use crate::server::extract::JsonOrForm;
use crate::server::handlers::required;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    email: Option<String>,
    title: Option<String>,
    content: Option<String>,
}

pub async fn export_pdf(
    State(state): State<AppState>,
    JsonOrForm(body): JsonOrForm<ExportRequest>,
) -> Result<Response, ApiError> {
    let (Some(email), Some(title), Some(content)) = (
        required(&body.email),
        required(&body.title),
        required(&body.content),
    ) else {
        return Err(ApiError::bad_request("email, title ve content zorunlu."));
    };

    state
        .users
        .find_async(email)
        .await?
        .ok_or_else(ApiError::user_not_found)?;

    let file_name = safe_file_name(title);
    let (title, content) = (title.to_string(), content.to_string());
    let font = state.config.pdf_font.clone();
    let bytes = tokio::task::spawn_blocking(move || {
        render_project_pdf(&title, &content, font.as_deref())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("PDF task failed: {e}")))??;

    tracing::info!("Exported {file_name} ({} bytes) for {email}", bytes.len());

    let disposition = format!("attachment; filename=\"{file_name}\"");
    let disposition = HeaderValue::from_bytes(disposition.as_bytes())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
