//! Body extractor accepting JSON or urlencoded forms
//!
//! An empty body deserializes as `{}` so handlers can report the missing
//! fields themselves.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use serde::de::DeserializeOwned;

use crate::server::error::ApiError;

const INVALID_BODY: &str = "Geçersiz istek gövdesi.";

pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state).await.map_err(|e| {
                tracing::debug!("Rejected form body: {e}");
                ApiError::bad_request(INVALID_BODY)
            })?;
            return Ok(Self(value));
        }

        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            tracing::debug!("Failed to read body: {e}");
            ApiError::bad_request(INVALID_BODY)
        })?;

        let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(body).map(Self).map_err(|e| {
            tracing::debug!("Rejected JSON body: {e}");
            ApiError::bad_request(INVALID_BODY)
        })
    }
}
