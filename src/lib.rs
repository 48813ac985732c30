//! cloud-drive - storage core for a cloud file-storage application
//!
//! This crate provides per-user quota accounting, a hierarchical file/folder
//! directory, and upload/delete lifecycle orchestration with:
//! - Swappable object storage backends (local filesystem, GCS)
//! - redb embedded database for metadata (ACID, MVCC, crash-safe)
//! - REST API with multipart upload support
//! - Fleet-wide usage aggregation for the admin role

pub mod api;
pub mod config;
pub mod lifecycle;
pub mod object_store;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use config::Config;
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub object_store: Arc<dyn object_store::ObjectStore>,
}
