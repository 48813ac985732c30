use chrono::Utc;
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::Folder;
use super::tables::*;

impl Database {
    // ========================================================================
    // Folder operations
    // ========================================================================

    /// Create a folder for a user under an optional parent.
    /// Returns `Ok(None)` when a sibling with the same name already exists
    /// (case-sensitive exact match, same user, same parent).
    ///
    /// The duplicate check and the insert share one write transaction, so
    /// the check-then-insert cannot race with another create.
    pub fn create_folder(
        &self,
        user_id: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<Folder>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let folder = {
            let mut folders_table = write_txn.open_table(FOLDERS)?;
            let mut owner_table = write_txn.open_table(OWNER_FOLDERS)?;

            let mut folder_ids: Vec<String> = owner_table
                .get(user_id)?
                .map(|v| rmp_serde::from_slice(v.value()).unwrap_or_default())
                .unwrap_or_default();

            // Sibling name check
            let mut duplicate = false;
            for fid in &folder_ids {
                if let Some(data) = folders_table.get(fid.as_str())? {
                    let existing: Folder = rmp_serde::from_slice(data.value())?;
                    if existing.name == name && existing.parent_id.as_deref() == parent_id {
                        duplicate = true;
                        break;
                    }
                }
            }

            if duplicate {
                None
            } else {
                let now = Utc::now();
                let folder = Folder {
                    id: uuid::Uuid::new_v4().to_string(),
                    user_id: user_id.to_string(),
                    name: name.to_string(),
                    parent_id: parent_id.map(|s| s.to_string()),
                    created_at: now,
                    updated_at: now,
                };

                let data = rmp_serde::to_vec_named(&folder)?;
                folders_table.insert(folder.id.as_str(), data.as_slice())?;

                folder_ids.push(folder.id.clone());
                let index_data = rmp_serde::to_vec_named(&folder_ids)?;
                owner_table.insert(user_id, index_data.as_slice())?;

                Some(folder)
            }
        };

        write_txn.commit()?;
        Ok(folder)
    }

    /// Get a folder owned by the given user
    pub fn get_folder_for_owner(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<Folder>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FOLDERS)?;

        match table.get(id)? {
            Some(data) => {
                let folder: Folder = rmp_serde::from_slice(data.value())?;
                if folder.user_id == user_id {
                    Ok(Some(folder))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// List a user's folders under a parent (None = root level),
    /// sorted by name ascending.
    pub fn list_folders(
        &self,
        user_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<Folder>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let owner_table = read_txn.open_table(OWNER_FOLDERS)?;
        let folders_table = read_txn.open_table(FOLDERS)?;

        let folder_ids: Vec<String> = match owner_table.get(user_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut folders = Vec::new();
        for fid in folder_ids {
            if let Some(data) = folders_table.get(fid.as_str())? {
                let folder: Folder = rmp_serde::from_slice(data.value())?;
                if folder.parent_id.as_deref() == parent_id {
                    folders.push(folder);
                }
            }
        }

        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }
}
