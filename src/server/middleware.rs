//! Admin key guard for the `/admin` routes

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::server::error::ApiError;
use crate::server::state::AppState;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Reject requests whose `x-admin-key` does not match the configured key
///
/// An unset admin key locks the admin routes entirely.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided.is_empty() || !constant_time_compare(provided, &state.config.admin_key) {
        tracing::warn!("Rejected admin request to {}", request.uri().path());
        return Err(ApiError::Forbidden("Geçersiz admin anahtarı.".to_string()));
    }

    Ok(next.run(request).await)
}

/// Compare without short-circuiting on the first differing byte
fn constant_time_compare(a: &str, b: &str) -> bool {
    let mut result = (a.len() ^ b.len()) as u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0 && a.len() == b.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("gizli", "gizli"));
        assert!(!constant_time_compare("gizli", "gizlI"));
        assert!(!constant_time_compare("gizli", "gizli2"));
        assert!(!constant_time_compare("a", ""));
    }
}
