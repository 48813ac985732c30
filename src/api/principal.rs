use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::storage::models::UserProfile;
use crate::AppState;

/// The authenticated caller, resolved to a profile row.
///
/// The upstream identity proxy authenticates the request and forwards the
/// subject in `x-user-id` / `x-user-email` headers; this service trusts
/// them. A profile row is created with the default quota the first time a
/// subject is seen. Every core operation receives the principal explicitly
/// rather than reading ambient session state.
pub struct Principal(pub UserProfile);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let user_id = header_str(parts, "x-user-id")
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;
        let email = header_str(parts, "x-user-email")
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

        if user_id.is_empty() || email.is_empty() {
            return Err(ApiError::unauthorized("Unauthorized"));
        }

        let profile = state
            .db
            .ensure_profile(&user_id, &email, state.config.default_storage_limit)
            .map_err(|e| ApiError::internal(e.to_string()))?;

        Ok(Principal(profile))
    }
}

fn header_str(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
