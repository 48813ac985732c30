use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::db_error;
use crate::api::principal::Principal;
use crate::api::response::{ApiError, AppJson, AppQuery, Envelope};
use crate::storage::models::Folder;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListFoldersParams {
    #[serde(default, rename = "parentId")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_folders(
    State(state): State<Arc<AppState>>,
    Principal(profile): Principal,
    AppQuery(params): AppQuery<ListFoldersParams>,
) -> Result<Json<Envelope<Vec<Folder>>>, ApiError> {
    let folders = state
        .db
        .list_folders(&profile.id, params.parent_id.as_deref())
        .map_err(db_error)?;

    Ok(Envelope::success(folders))
}

pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    Principal(profile): Principal,
    AppJson(req): AppJson<CreateFolderRequest>,
) -> Result<Json<Envelope<Folder>>, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Folder name is required"));
    }

    // The parent must already exist and be owned by the caller
    if let Some(ref parent_id) = req.parent_id {
        state
            .db
            .get_folder_for_owner(&profile.id, parent_id)
            .map_err(db_error)?
            .ok_or_else(|| ApiError::not_found("Parent folder not found"))?;
    }

    let folder = state
        .db
        .create_folder(&profile.id, name, req.parent_id.as_deref())
        .map_err(db_error)?
        .ok_or_else(|| ApiError::conflict("A folder with this name already exists"))?;

    tracing::debug!(folder_id = %folder.id, user_id = %profile.id, "Created folder");

    Ok(Envelope::success_with_message(
        folder,
        "Folder created successfully",
    ))
}
