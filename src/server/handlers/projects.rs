//! Saved design projects

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::server::error::ApiError;
use crate::server::handlers::required;
use crate::server::state::AppState;
use crate::types::user::{Project, ProjectSummary};

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectSummary>,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    pub project: Project,
}

pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<ProjectList>, ApiError> {
    let email = required(&query.email)
        .ok_or_else(|| ApiError::bad_request("email parametresi zorunlu."))?;

    let user = state
        .users
        .find_async(email)
        .await?
        .ok_or_else(ApiError::user_not_found)?;
    let projects = user.projects.iter().map(ProjectSummary::from).collect();
    Ok(Json(ProjectList { projects }))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<ProjectDetail>, ApiError> {
    let Some(email) = required(&query.email).filter(|_| !id.is_empty()) else {
        return Err(ApiError::bad_request("email parametresi ve id zorunludur."));
    };

    let user = state
        .users
        .find_async(email)
        .await?
        .ok_or_else(ApiError::user_not_found)?;
    let project = user
        .project(&id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound("Proje bulunamadı.".to_string()))?;
    Ok(Json(ProjectDetail { project }))
}
