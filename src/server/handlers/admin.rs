//! Operator endpoints, mounted behind the admin key check

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::server::error::ApiError;
use crate::server::extract::JsonOrForm;
use crate::server::handlers::{required, QuotaResponse};
use crate::server::state::AppState;
use crate::types::json::is_truthy;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    email: Option<String>,
    #[serde(default)]
    limit: Value,
    #[serde(default)]
    reset_used: Value,
    #[serde(default)]
    reset_memory: Value,
}

/// Set a user's limit and optionally clear their usage or memory
///
/// Only a numeric `limit` is applied; strings and other types are ignored.
pub async fn update_user(
    State(state): State<AppState>,
    JsonOrForm(body): JsonOrForm<UpdateUserRequest>,
) -> Result<Json<QuotaResponse>, ApiError> {
    let email = required(&body.email).ok_or_else(|| ApiError::bad_request("email zorunlu."))?;

    let limit = numeric_limit(&body.limit);
    let reset_used = is_truthy(&body.reset_used);
    let reset_memory = is_truthy(&body.reset_memory);

    let quota = state
        .users
        .update_async(email, move |user| {
            if let Some(limit) = limit {
                user.limit = limit;
            }
            if reset_used {
                user.used = 0;
            }
            if reset_memory {
                user.memory.clear();
            }
            user.quota()
        })
        .await?;

    tracing::info!(
        "Admin updated {email}: limit {}, used {}",
        quota.limit,
        quota.used
    );
    Ok(Json(quota.into()))
}

fn numeric_limit(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}
