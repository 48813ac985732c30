//! Upload and delete orchestration.
//!
//! Uploads run a fixed step sequence: validate name and type, validate size,
//! authorize against the quota ledger, write bytes, record metadata,
//! credit the ledger. Validation and authorization happen before any side
//! effect. A metadata failure triggers best-effort cleanup of the
//! just-written bytes; a ledger failure after a committed write never
//! rolls the file back (the file wins over counter accuracy).

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;

use crate::object_store::{ObjectStore, ObjectStoreError};
use crate::storage::models::{FileRecord, UserProfile};
use crate::storage::{Database, DatabaseError};

/// Media types accepted for upload. Enumerated subtypes only; there is no
/// `image/*` style wildcard.
pub const ALLOWED_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "video/mp4",
    "video/webm",
    "video/quicktime",
    "audio/mp3",
    "audio/wav",
    "audio/mpeg",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// Allow-list membership test for a declared media type.
pub fn is_allowed_media_type(media_type: &str) -> bool {
    ALLOWED_MEDIA_TYPES.contains(&media_type)
}

/// `byte_size <= max_megabytes * 1024^2`
pub fn within_size_limit(byte_size: u64, max_megabytes: u64) -> bool {
    byte_size <= max_megabytes * 1024 * 1024
}

/// Derive a collision-resistant storage name from a user-supplied name:
/// the stem, a millisecond timestamp, a random alphanumeric suffix, and
/// the original extension. Uniqueness is probabilistic; no collision check
/// is made against existing keys.
pub fn generate_storage_name(original_name: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();

    match original_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!("{stem}_{millis}_{suffix}.{ext}")
        }
        _ => format!("{original_name}_{millis}_{suffix}"),
    }
}

/// Outcome of a fire-and-forget step. The primary operation's result never
/// depends on this, but callers can tell "succeeded" from "failed, logged".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestEffort {
    Applied,
    Failed,
}

/// Per-file upload state. Terminal states are `Completed` and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Pending,
    Uploading,
    Completed,
    Failed,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File name is required")]
    EmptyName,
    #[error("File type not allowed: {0}")]
    UnsupportedType(String),
    #[error("File size exceeds limit ({0}MB)")]
    TooLarge(u64),
    #[error("Storage limit exceeded")]
    QuotaExceeded,
    #[error("Failed to upload file: {0}")]
    Store(#[from] ObjectStoreError),
    #[error("Failed to save file metadata: {0}")]
    Metadata(#[from] DatabaseError),
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("File not found")]
    NotFound,
    #[error("Failed to delete file: {0}")]
    Database(#[from] DatabaseError),
}

/// One file to upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub media_type: String,
    pub data: Bytes,
    pub folder_id: Option<String>,
    /// Client-reported last-modified timestamp of the source file.
    pub last_modified: Option<DateTime<Utc>>,
}

/// A successfully uploaded file, plus the status of the trailing ledger
/// credit. `ledger == Failed` means the quota counter has drifted low.
#[derive(Debug)]
pub struct Uploaded {
    pub file: FileRecord,
    pub ledger: BestEffort,
}

/// A successfully deleted file, plus the statuses of the best-effort steps.
#[derive(Debug)]
pub struct Deleted {
    pub file: FileRecord,
    pub bytes_removed: BestEffort,
    pub ledger: BestEffort,
}

/// Result of one entry in a batch upload.
#[derive(Debug)]
pub struct BatchItem {
    pub file_name: String,
    pub state: UploadState,
    pub result: Result<Uploaded, UploadError>,
}

/// Run the upload sequence for a single file on behalf of `profile`.
pub async fn upload(
    db: &Database,
    store: &dyn ObjectStore,
    profile: &UserProfile,
    max_upload_mb: u64,
    req: UploadRequest,
) -> Result<Uploaded, UploadError> {
    let size = req.data.len() as u64;

    if req.file_name.trim().is_empty() {
        return Err(UploadError::EmptyName);
    }
    if !is_allowed_media_type(&req.media_type) {
        return Err(UploadError::UnsupportedType(req.media_type));
    }
    if !within_size_limit(size, max_upload_mb) {
        return Err(UploadError::TooLarge(max_upload_mb));
    }
    if !profile.can_store(size) {
        return Err(UploadError::QuotaExceeded);
    }

    let storage_name = generate_storage_name(&req.file_name);
    let storage_path = format!("{}/{}", profile.id, storage_name);

    store.put(&storage_path, req.data).await?;

    let public_url = store.public_url(&storage_path);
    let now = Utc::now();
    let file = FileRecord {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: profile.id.clone(),
        name: storage_name,
        original_name: req.file_name,
        size,
        media_type: req.media_type,
        folder_id: req.folder_id,
        storage_path: storage_path.clone(),
        public_url,
        metadata: crate::storage::models::FileMetadata {
            uploaded_at: now,
            last_modified: req.last_modified,
        },
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = db.put_file(&file) {
        // Clean up the orphaned blob; its failure is logged, not surfaced.
        if let Err(cleanup_err) = store.delete(&storage_path).await {
            tracing::warn!(
                key = %storage_path,
                error = %cleanup_err,
                "Failed to remove orphaned object after metadata failure"
            );
        }
        return Err(UploadError::Metadata(e));
    }

    let ledger = match db.credit_storage(&profile.id, size) {
        Ok(Some(_)) => BestEffort::Applied,
        Ok(None) => {
            tracing::warn!(user_id = %profile.id, "Profile missing during storage credit");
            BestEffort::Failed
        }
        Err(e) => {
            tracing::warn!(user_id = %profile.id, error = %e, "Failed to update storage usage");
            BestEffort::Failed
        }
    };

    tracing::debug!(file_id = %file.id, user_id = %profile.id, size, "Uploaded file");
    Ok(Uploaded { file, ledger })
}

/// Upload a batch strictly sequentially: each file's full sequence resolves
/// before the next one starts. Callers may retry only the failed entries.
pub async fn upload_batch(
    db: &Database,
    store: &dyn ObjectStore,
    profile: &UserProfile,
    max_upload_mb: u64,
    requests: Vec<UploadRequest>,
) -> Vec<BatchItem> {
    for req in &requests {
        tracing::trace!(file = %req.file_name, state = ?UploadState::Pending, "Queued in batch");
    }

    let mut results = Vec::with_capacity(requests.len());
    for req in requests {
        let file_name = req.file_name.clone();
        // Re-read the profile so each file authorizes against the balance
        // left by its predecessors in the batch.
        let current = match db.get_profile(&profile.id) {
            Ok(Some(p)) => p,
            Ok(None) | Err(_) => profile.clone(),
        };
        tracing::trace!(file = %file_name, state = ?UploadState::Uploading, "Starting upload");
        let result = upload(db, store, &current, max_upload_mb, req).await;
        let state = if result.is_ok() {
            UploadState::Completed
        } else {
            UploadState::Failed
        };
        results.push(BatchItem {
            file_name,
            state,
            result,
        });
    }
    results
}

/// Run the delete sequence: ownership lookup, best-effort blob removal,
/// metadata removal (hard error), best-effort clamped ledger debit.
pub async fn delete(
    db: &Database,
    store: &dyn ObjectStore,
    user_id: &str,
    file_id: &str,
) -> Result<Deleted, DeleteError> {
    let file = db
        .get_file_for_owner(user_id, file_id)?
        .ok_or(DeleteError::NotFound)?;

    let bytes_removed = match store.delete(&file.storage_path).await {
        Ok(()) => BestEffort::Applied,
        Err(e) => {
            tracing::warn!(file_id, error = %e, "Failed to delete file from object storage");
            BestEffort::Failed
        }
    };

    if !db.delete_file(user_id, file_id)? {
        return Err(DeleteError::NotFound);
    }

    let ledger = match db.debit_storage(user_id, file.size) {
        Ok(Some(_)) => BestEffort::Applied,
        Ok(None) => {
            tracing::warn!(user_id, "Profile missing during storage debit");
            BestEffort::Failed
        }
        Err(e) => {
            tracing::warn!(user_id, error = %e, "Failed to update storage usage");
            BestEffort::Failed
        }
    };

    tracing::debug!(file_id, user_id, "Deleted file");
    Ok(Deleted {
        file,
        bytes_removed,
        ledger,
    })
}
