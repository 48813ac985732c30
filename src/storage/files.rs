use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{FileCategory, FileRecord, Patch, SortBy, SortOrder};
use super::tables::*;

/// Listing parameters for a user's files.
///
/// `folder_id == None` scopes to root-level files only (not recursive).
/// `search` is a case-insensitive substring match against both the stored
/// and the original file name.
#[derive(Debug, Clone, Default)]
pub struct FileListQuery {
    pub folder_id: Option<String>,
    pub search: Option<String>,
    pub category: Option<FileCategory>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
}

impl Database {
    // ========================================================================
    // File operations
    // ========================================================================

    /// Store a file record and update the owner index
    pub fn put_file(&self, file: &FileRecord) -> Result<(), DatabaseError> {
        debug_assert!(!file.id.is_empty(), "file id must not be empty");
        debug_assert!(!file.user_id.is_empty(), "file user_id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(FILES)?;
            let data = rmp_serde::to_vec_named(file)?;
            table.insert(file.id.as_str(), data.as_slice())?;

            let mut owner_table = write_txn.open_table(OWNER_FILES)?;
            let mut file_ids: Vec<String> = owner_table
                .get(file.user_id.as_str())?
                .map(|v| rmp_serde::from_slice(v.value()).unwrap_or_default())
                .unwrap_or_default();

            if !file_ids.contains(&file.id) {
                file_ids.push(file.id.clone());
                let index_data = rmp_serde::to_vec_named(&file_ids)?;
                owner_table.insert(file.user_id.as_str(), index_data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a file by id, but only if it is owned by the given user.
    /// A file owned by someone else reads as absent.
    pub fn get_file_for_owner(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        match table.get(id)? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                if file.user_id == user_id {
                    Ok(Some(file))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Delete a file owned by the given user and clean up the owner index.
    /// Returns false when the file is missing or owned by someone else.
    pub fn delete_file(&self, user_id: &str, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let owned = {
            let table = write_txn.open_table(FILES)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let file: FileRecord = rmp_serde::from_slice(data.value())?;
                    file.user_id == user_id
                }
                None => false,
            };
            result
        };

        if owned {
            {
                let mut table = write_txn.open_table(FILES)?;
                table.remove(id)?;
            }
            let file_ids: Option<Vec<String>> = {
                let owner_table = write_txn.open_table(OWNER_FILES)?;
                let result = match owner_table.get(user_id)? {
                    Some(data) => Some(rmp_serde::from_slice(data.value())?),
                    None => None,
                };
                result
            };
            if let Some(mut ids) = file_ids {
                ids.retain(|fid| fid != id);
                let mut owner_table = write_txn.open_table(OWNER_FILES)?;
                if ids.is_empty() {
                    owner_table.remove(user_id)?;
                } else {
                    let new_data = rmp_serde::to_vec_named(&ids)?;
                    owner_table.insert(user_id, new_data.as_slice())?;
                }
            }
        }

        write_txn.commit()?;
        Ok(owned)
    }

    /// Rename and/or move a file. Absent fields keep their prior values;
    /// a `Null` folder patch moves the file to root level.
    /// Returns false when the file is missing or owned by someone else.
    pub fn update_file(
        &self,
        user_id: &str,
        id: &str,
        name: Option<&str>,
        folder_id: &Patch<String>,
    ) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing: Option<FileRecord> = {
            let table = write_txn.open_table(FILES)?;
            let result = match table.get(id)? {
                Some(data) => {
                    let file: FileRecord = rmp_serde::from_slice(data.value())?;
                    (file.user_id == user_id).then_some(file)
                }
                None => None,
            };
            result
        };

        let updated = match existing {
            Some(mut file) => {
                if let Some(n) = name {
                    file.name = n.to_string();
                }
                match folder_id {
                    Patch::Absent => {}
                    Patch::Null => file.folder_id = None,
                    Patch::Value(fid) => file.folder_id = Some(fid.clone()),
                }
                file.updated_at = chrono::Utc::now();

                let serialized = rmp_serde::to_vec_named(&file)?;
                let mut table = write_txn.open_table(FILES)?;
                table.insert(id, serialized.as_slice())?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(updated)
    }

    /// Get all files owned by a user
    pub fn get_files_for_owner(&self, user_id: &str) -> Result<Vec<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let owner_table = read_txn.open_table(OWNER_FILES)?;
        let files_table = read_txn.open_table(FILES)?;

        let file_ids: Vec<String> = match owner_table.get(user_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut files = Vec::new();
        for file_id in file_ids {
            if let Some(data) = files_table.get(file_id.as_str())? {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                files.push(file);
            }
        }

        Ok(files)
    }

    /// Get every file record (for admin aggregation)
    pub fn get_all_files(&self) -> Result<Vec<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        let mut files = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let file: FileRecord = rmp_serde::from_slice(value.value())?;
            files.push(file);
        }

        Ok(files)
    }

    /// List a user's files with folder scoping, search, category filter,
    /// sorting, and pagination. Returns the page plus the total match count.
    pub fn list_files(
        &self,
        user_id: &str,
        query: &FileListQuery,
    ) -> Result<(Vec<FileRecord>, u64), DatabaseError> {
        let mut files = self.get_files_for_owner(user_id)?;

        files.retain(|f| f.folder_id.as_deref() == query.folder_id.as_deref());

        if let Some(ref search) = query.search {
            let needle = search.to_lowercase();
            files.retain(|f| {
                f.name.to_lowercase().contains(&needle)
                    || f.original_name.to_lowercase().contains(&needle)
            });
        }

        if let Some(category) = query.category {
            files.retain(|f| f.category() == category);
        }

        match query.sort_by {
            SortBy::Name => {
                files.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            }
            SortBy::Date => files.sort_by_key(|f| f.created_at),
            SortBy::Size => files.sort_by_key(|f| f.size),
            SortBy::Type => files.sort_by(|a, b| a.media_type.cmp(&b.media_type)),
        }
        if query.sort_order == SortOrder::Desc {
            files.reverse();
        }

        let total = files.len() as u64;
        let page = query.page.max(1);
        let offset = (page as usize - 1) * query.limit as usize;
        let items = files
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();

        Ok((items, total))
    }
}
