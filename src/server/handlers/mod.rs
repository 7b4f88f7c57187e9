//! Route handlers

pub mod account;
pub mod admin;
pub mod chat;
pub mod export;
pub mod projects;

use serde::Serialize;

use crate::types::user::Quota;

/// Quota payload shared by the account and admin endpoints
#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    pub success: bool,
    #[serde(flatten)]
    pub quota: Quota,
}

impl From<Quota> for QuotaResponse {
    fn from(quota: Quota) -> Self {
        Self {
            success: true,
            quota,
        }
    }
}

/// A present, non-empty string field
pub(crate) fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}
