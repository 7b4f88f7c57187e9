//! Registration, login and question package purchase

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::server::error::ApiError;
use crate::server::extract::JsonOrForm;
use crate::server::handlers::{required, QuotaResponse};
use crate::server::state::AppState;
use crate::types::user::{Package, User, SIGNUP_LIMIT};

const CREDENTIALS_REQUIRED: &str = "email ve password zorunlu.";

#[derive(Debug, Deserialize)]
pub struct Credentials {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    email: Option<String>,
    package_type: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    JsonOrForm(body): JsonOrForm<Credentials>,
) -> Result<Json<QuotaResponse>, ApiError> {
    let (Some(email), Some(password)) = (required(&body.email), required(&body.password)) else {
        return Err(ApiError::bad_request(CREDENTIALS_REQUIRED));
    };

    let user = state
        .users
        .insert_async(User::new(email, password, SIGNUP_LIMIT))
        .await?;
    Ok(Json(user.quota().into()))
}

pub async fn login(
    State(state): State<AppState>,
    JsonOrForm(body): JsonOrForm<Credentials>,
) -> Result<Json<QuotaResponse>, ApiError> {
    let (Some(email), Some(password)) = (required(&body.email), required(&body.password)) else {
        return Err(ApiError::bad_request(CREDENTIALS_REQUIRED));
    };

    match state.users.find_async(email).await? {
        Some(user) if user.password == password => Ok(Json(user.quota().into())),
        _ => {
            tracing::info!("Failed login for {email}");
            Err(ApiError::Unauthorized("E-posta veya şifre hatalı.".to_string()))
        }
    }
}

pub async fn purchase(
    State(state): State<AppState>,
    JsonOrForm(body): JsonOrForm<PurchaseRequest>,
) -> Result<Json<QuotaResponse>, ApiError> {
    let (Some(email), Some(package_type)) = (required(&body.email), required(&body.package_type))
    else {
        return Err(ApiError::bad_request("email ve packageType zorunlu."));
    };

    let package = Package::parse(package_type);
    let quota = state
        .users
        .update_async(email, move |user| {
            let package = package?;
            user.limit += package.credits();
            tracing::info!("{} bought {package:?}, limit now {}", user.email, user.limit);
            Some(user.quota())
        })
        .await?
        .ok_or_else(|| ApiError::bad_request("Geçersiz paket tipi."))?;

    Ok(Json(quota.into()))
}
