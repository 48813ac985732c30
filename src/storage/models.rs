use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Three-state patch value for partial updates that survives serialization round-trips.
/// Unlike `Option<Option<T>>`, each variant has a distinct wire representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Patch<T> {
    /// Field was not included in the request (no change).
    #[default]
    Absent,
    /// Field was explicitly set to null (clear it).
    Null,
    /// Field was set to a new value.
    Value(T),
}

impl<T> From<Option<Option<T>>> for Patch<T> {
    fn from(v: Option<Option<T>>) -> Self {
        match v {
            None => Patch::Absent,
            Some(None) => Patch::Null,
            Some(Some(v)) => Patch::Value(v),
        }
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }
}

/// Account role. Admins may read fleet-wide statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Semantic category derived from a file's declared media type.
///
/// Listing filters and admin aggregation both classify through this type, so
/// filter results and aggregate totals always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Document,
    Other,
}

impl FileCategory {
    /// Derive a category from a declared media type string.
    pub fn from_media_type(media_type: &str) -> Self {
        if media_type.starts_with("image/") {
            FileCategory::Image
        } else if media_type.starts_with("video/") {
            FileCategory::Video
        } else if media_type.starts_with("audio/") {
            FileCategory::Audio
        } else if media_type == "application/pdf"
            || media_type.contains("document")
            || media_type.contains("word")
            || media_type.starts_with("text/")
        {
            FileCategory::Document
        } else {
            FileCategory::Other
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(FileCategory::Image),
            "video" => Some(FileCategory::Video),
            "audio" => Some(FileCategory::Audio),
            "document" => Some(FileCategory::Document),
            "other" => Some(FileCategory::Other),
            _ => None,
        }
    }
}

/// A user profile row. `storage_used` is the quota ledger balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
    pub storage_used: u64,
    pub storage_limit: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Quota authorization: would `incoming` more bytes still fit?
    /// The boundary case `used + incoming == limit` is allowed.
    pub fn can_store(&self, incoming: u64) -> bool {
        self.storage_used.saturating_add(incoming) <= self.storage_limit
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A folder record. Folders form a forest per user; `parent_id == None`
/// means root level. Sibling names are unique per (user, parent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Closed key-set metadata captured at upload time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub uploaded_at: DateTime<Utc>,
    /// Client-reported last-modified timestamp of the source file.
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

/// A file record stored in redb.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub user_id: String,
    /// Display name: the generated storage name at upload time, replaced on
    /// rename. Name sorting uses this field.
    pub name: String,
    /// The name the user uploaded the file under.
    pub original_name: String,
    pub size: u64,
    pub media_type: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    /// Object-store key: `<user_id>/<name>`.
    pub storage_path: String,
    #[serde(default)]
    pub public_url: Option<String>,
    pub metadata: FileMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn category(&self) -> FileCategory {
        FileCategory::from_media_type(&self.media_type)
    }
}

/// Sort key for file listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Name,
    #[default]
    Date,
    Size,
    Type,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_from_media_type() {
        assert_eq!(
            FileCategory::from_media_type("image/png"),
            FileCategory::Image
        );
        assert_eq!(
            FileCategory::from_media_type("video/mp4"),
            FileCategory::Video
        );
        assert_eq!(
            FileCategory::from_media_type("audio/mpeg"),
            FileCategory::Audio
        );
        assert_eq!(
            FileCategory::from_media_type("application/pdf"),
            FileCategory::Document
        );
        assert_eq!(
            FileCategory::from_media_type(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            FileCategory::Document
        );
        assert_eq!(
            FileCategory::from_media_type("application/msword"),
            FileCategory::Document
        );
        assert_eq!(
            FileCategory::from_media_type("text/plain"),
            FileCategory::Document
        );
        assert_eq!(
            FileCategory::from_media_type("application/zip"),
            FileCategory::Other
        );
        assert_eq!(FileCategory::from_media_type(""), FileCategory::Other);
    }

    #[test]
    fn category_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(
                FileCategory::from_media_type("image/webp"),
                FileCategory::Image
            );
        }
    }

    #[test]
    fn can_store_boundary() {
        let now = Utc::now();
        let profile = UserProfile {
            id: "u".into(),
            email: "u@example.com".into(),
            full_name: None,
            role: Role::User,
            storage_used: 900,
            storage_limit: 1000,
            created_at: now,
            updated_at: now,
        };
        assert!(profile.can_store(100));
        assert!(!profile.can_store(101));
        assert!(profile.can_store(0));
    }
}
