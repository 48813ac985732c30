use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use super::db_error;
use crate::api::principal::Principal;
use crate::api::response::{ApiError, Envelope};
use crate::storage::stats::AdminStats;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub files_deleted: u64,
    pub folders_deleted: u64,
    pub profiles_deleted: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<Envelope<HealthResponse>> {
    Envelope::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn admin_stats(
    State(state): State<Arc<AppState>>,
    Principal(profile): Principal,
) -> Result<Json<Envelope<AdminStats>>, ApiError> {
    if !profile.is_admin() {
        return Err(ApiError::forbidden("Forbidden"));
    }

    let stats = state.db.compute_stats(Utc::now()).map_err(db_error)?;
    Ok(Envelope::success(stats))
}

pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Envelope<PurgeResponse>>, ApiError> {
    let stats = state.db.purge_all().map_err(db_error)?;

    tracing::warn!(
        files = stats.files,
        folders = stats.folders,
        profiles = stats.profiles,
        "Purged all data"
    );

    Ok(Envelope::success(PurgeResponse {
        files_deleted: stats.files,
        folders_deleted: stats.folders,
        profiles_deleted: stats.profiles,
    }))
}
