mod db;
pub mod files;
mod folders;
pub mod models;
mod profiles;
pub mod stats;
mod tables;

pub use db::{Database, DatabaseError, PurgeStats};
pub use files::FileListQuery;
