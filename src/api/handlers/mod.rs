mod admin;
mod files;
mod folders;

pub use admin::{admin_purge, admin_stats, health};
pub use files::{delete_file, download_file, get_file, list_files, update_file, upload_file};
pub use folders::{create_folder, list_folders};

use crate::api::response::ApiError;
use crate::storage::DatabaseError;

/// Map a DatabaseError to an ApiError
fn db_error(e: DatabaseError) -> ApiError {
    ApiError::internal(e.to_string())
}
