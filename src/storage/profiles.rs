use chrono::Utc;
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{Role, UserProfile};
use super::tables::*;

impl Database {
    // ========================================================================
    // Profile operations
    // ========================================================================

    /// Store a profile row, overwriting any existing row with the same id.
    pub fn put_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        debug_assert!(!profile.id.is_empty(), "profile id must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(PROFILES)?;
            let data = rmp_serde::to_vec_named(profile)?;
            table.insert(profile.id.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a profile by user id
    pub fn get_profile(&self, id: &str) -> Result<Option<UserProfile>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PROFILES)?;

        match table.get(id)? {
            Some(data) => {
                let profile: UserProfile = rmp_serde::from_slice(data.value())?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    /// Look up a profile, creating one with default quota on first sight.
    /// The identity provider is trusted; this only materializes the row.
    pub fn ensure_profile(
        &self,
        id: &str,
        email: &str,
        default_storage_limit: u64,
    ) -> Result<UserProfile, DatabaseError> {
        if let Some(profile) = self.get_profile(id)? {
            return Ok(profile);
        }

        let now = Utc::now();
        let profile = UserProfile {
            id: id.to_string(),
            email: email.to_string(),
            full_name: None,
            role: Role::User,
            storage_used: 0,
            storage_limit: default_storage_limit,
            created_at: now,
            updated_at: now,
        };
        self.put_profile(&profile)?;
        Ok(profile)
    }

    /// Get all profiles (for admin aggregation)
    pub fn get_all_profiles(&self) -> Result<Vec<UserProfile>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PROFILES)?;

        let mut profiles = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let profile: UserProfile = rmp_serde::from_slice(value.value())?;
            profiles.push(profile);
        }

        Ok(profiles)
    }

    // ========================================================================
    // Quota ledger
    // ========================================================================

    /// Add `bytes` to the user's consumed-storage balance.
    /// Returns the new balance, or `None` when the profile does not exist.
    ///
    /// Each credit is atomic on its own, but callers that authorized earlier
    /// against a separately-read balance get no cross-call protection: two
    /// concurrent uploads can both pass authorization and both land.
    pub fn credit_storage(&self, user_id: &str, bytes: u64) -> Result<Option<u64>, DatabaseError> {
        self.adjust_storage(user_id, |used| used.saturating_add(bytes))
    }

    /// Subtract `bytes` from the user's balance, clamping at zero so a
    /// missing or double-counted prior credit cannot drive it negative.
    pub fn debit_storage(&self, user_id: &str, bytes: u64) -> Result<Option<u64>, DatabaseError> {
        self.adjust_storage(user_id, |used| used.saturating_sub(bytes))
    }

    fn adjust_storage(
        &self,
        user_id: &str,
        f: impl FnOnce(u64) -> u64,
    ) -> Result<Option<u64>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let existing: Option<UserProfile> = {
            let table = write_txn.open_table(PROFILES)?;
            let result = match table.get(user_id)? {
                Some(data) => Some(rmp_serde::from_slice(data.value())?),
                None => None,
            };
            result
        };

        let new_balance = match existing {
            Some(mut profile) => {
                profile.storage_used = f(profile.storage_used);
                profile.updated_at = Utc::now();
                let data = rmp_serde::to_vec_named(&profile)?;
                let mut table = write_txn.open_table(PROFILES)?;
                table.insert(user_id, data.as_slice())?;
                Some(profile.storage_used)
            }
            None => None,
        };

        write_txn.commit()?;
        Ok(new_balance)
    }
}
