use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::BytesMut;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

use super::db_error;
use crate::api::principal::Principal;
use crate::api::response::{ApiError, AppJson, AppQuery, Envelope, PaginatedEnvelope, Pagination};
use crate::lifecycle::{self, UploadError, UploadRequest};
use crate::storage::models::{FileCategory, FileRecord, Patch, SortBy, SortOrder};
use crate::storage::FileListQuery;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListFilesParams {
    #[serde(default, rename = "folderId")]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    /// Category filter; "all" or absent means no filter.
    #[serde(default, rename = "type")]
    pub file_type: Option<String>,
    #[serde(default, rename = "sortBy")]
    pub sort_by: SortBy,
    #[serde(default, rename = "sortOrder")]
    pub sort_order: SortOrder,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    50
}

#[derive(Debug, Deserialize)]
pub struct UpdateFileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub folder_id: Option<Option<String>>,
}

/// Distinguishes between a missing field (`None`) and an explicit `null` (`Some(None)`).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: DeserializeOwned,
    D: Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Principal(profile): Principal,
    mut multipart: Multipart,
) -> Result<Json<Envelope<FileRecord>>, ApiError> {
    let mut file_data: Option<BytesMut> = None;
    let mut file_name: Option<String> = None;
    let mut file_content_type: Option<String> = None;
    let mut folder_id: Option<String> = None;
    let mut last_modified: Option<DateTime<Utc>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_content_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                let mut buf = BytesMut::with_capacity(data.len());
                buf.extend_from_slice(&data);
                file_data = Some(buf);
            }
            "folderId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid folderId: {e}")))?;
                if !text.is_empty() {
                    folder_id = Some(text);
                }
            }
            "lastModified" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid lastModified: {e}")))?;
                let millis: i64 = text
                    .parse()
                    .map_err(|_| ApiError::bad_request("lastModified must be epoch millis"))?;
                last_modified = DateTime::from_timestamp_millis(millis);
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let file_name = file_name.ok_or_else(|| ApiError::bad_request("File name is required"))?;

    // A file can only land in a folder the caller owns, and the folder must
    // already exist.
    if let Some(ref fid) = folder_id {
        state
            .db
            .get_folder_for_owner(&profile.id, fid)
            .map_err(db_error)?
            .ok_or_else(|| ApiError::not_found("Folder not found"))?;
    }

    // Declared media type, or guess from the filename as a fallback
    let media_type = file_content_type
        .filter(|ct| ct != "application/octet-stream")
        .or_else(|| {
            mime_guess::from_path(&file_name)
                .first()
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let request = UploadRequest {
        file_name,
        media_type,
        data: file_data.freeze(),
        folder_id,
        last_modified,
    };

    let uploaded = lifecycle::upload(
        &state.db,
        state.object_store.as_ref(),
        &profile,
        state.config.max_upload_mb,
        request,
    )
    .await
    .map_err(upload_error)?;

    Ok(Envelope::success_with_message(
        uploaded.file,
        "File uploaded successfully",
    ))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Principal(profile): Principal,
    AppQuery(params): AppQuery<ListFilesParams>,
) -> Result<Json<PaginatedEnvelope<FileRecord>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }
    if params.page == 0 {
        return Err(ApiError::bad_request("page must be greater than 0"));
    }

    let category = match params.file_type.as_deref() {
        None | Some("all") => None,
        Some(raw) => Some(
            FileCategory::parse(raw)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown file type: {raw}")))?,
        ),
    };

    let query = FileListQuery {
        folder_id: params.folder_id,
        search: params.search,
        category,
        sort_by: params.sort_by,
        sort_order: params.sort_order,
        page: params.page,
        limit: params.limit,
    };

    let (files, total) = state.db.list_files(&profile.id, &query).map_err(db_error)?;

    Ok(PaginatedEnvelope::success(
        files,
        Pagination::new(params.page, params.limit, total),
    ))
}

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Principal(profile): Principal,
    Path(id): Path<String>,
) -> Result<Json<Envelope<FileRecord>>, ApiError> {
    let file = state
        .db
        .get_file_for_owner(&profile.id, &id)
        .map_err(db_error)?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    Ok(Envelope::success(file))
}

pub async fn update_file(
    State(state): State<Arc<AppState>>,
    Principal(profile): Principal,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateFileRequest>,
) -> Result<Json<Envelope<FileRecord>>, ApiError> {
    if req.name.is_none() && req.folder_id.is_none() {
        return Err(ApiError::bad_request(
            "at least one field (name, folder_id) must be provided",
        ));
    }

    if let Some(ref name) = req.name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("name must not be empty"));
        }
    }

    // A move target must be an existing folder owned by the caller
    if let Some(Some(ref fid)) = req.folder_id {
        state
            .db
            .get_folder_for_owner(&profile.id, fid)
            .map_err(db_error)?
            .ok_or_else(|| ApiError::not_found("Folder not found"))?;
    }

    let folder_patch = Patch::from(req.folder_id);
    let updated = state
        .db
        .update_file(&profile.id, &id, req.name.as_deref(), &folder_patch)
        .map_err(db_error)?;

    if !updated {
        return Err(ApiError::not_found("File not found"));
    }

    let file = state
        .db
        .get_file_for_owner(&profile.id, &id)
        .map_err(db_error)?
        .ok_or_else(|| ApiError::internal("File not found after update"))?;

    Ok(Envelope::success_with_message(
        file,
        "File updated successfully",
    ))
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Principal(profile): Principal,
    Path(id): Path<String>,
) -> Result<Json<Envelope<()>>, ApiError> {
    lifecycle::delete(&state.db, state.object_store.as_ref(), &profile.id, &id)
        .await
        .map_err(|e| match e {
            lifecycle::DeleteError::NotFound => ApiError::not_found("File not found"),
            lifecycle::DeleteError::Database(e) => db_error(e),
        })?;

    Ok(Envelope::success_with_message(
        (),
        "File deleted successfully",
    ))
}

/// Serve file content for preview/download.
/// Route: GET /files/:id/download
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Principal(profile): Principal,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let file = state
        .db
        .get_file_for_owner(&profile.id, &id)
        .map_err(db_error)?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    let data = state
        .object_store
        .get(&file.storage_path)
        .await
        .map_err(|e| match e {
            crate::object_store::ObjectStoreError::NotFound(_) => {
                ApiError::not_found("File content not found")
            }
            _ => ApiError::internal(format!("Failed to retrieve file: {e}")),
        })?;

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        file.media_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(header::CONTENT_LENGTH, header::HeaderValue::from(file.size));

    if let Ok(value) = format!("inline; filename=\"{}\"", file.original_name).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Blobs are immutable once uploaded, only metadata changes
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("private, max-age=3600"),
    );

    Ok(response)
}

// ============================================================================
// Helpers
// ============================================================================

fn upload_error(e: UploadError) -> ApiError {
    match e {
        UploadError::EmptyName => ApiError::bad_request("File name is required"),
        UploadError::UnsupportedType(_) => ApiError::bad_request("File type not allowed"),
        UploadError::TooLarge(limit) => {
            ApiError::payload_too_large(format!("File size exceeds limit ({limit}MB)"))
        }
        UploadError::QuotaExceeded => ApiError::bad_request("Storage limit exceeded"),
        UploadError::Store(e) => {
            tracing::error!(error = %e, "Storage upload error");
            ApiError::internal("Failed to upload file")
        }
        UploadError::Metadata(e) => {
            tracing::error!(error = %e, "Database insert error");
            ApiError::internal("Failed to save file metadata")
        }
    }
}
