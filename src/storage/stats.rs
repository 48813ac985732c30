use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::db::{Database, DatabaseError};
use super::models::FileCategory;

/// Fleet-wide statistics for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: u64,
    pub total_files: u64,
    /// Sum of every user's ledger balance. Trusts the quota ledger rather
    /// than recomputing from file sizes, so ledger drift shows up here.
    pub total_storage: u64,
    /// Distinct owners of files created within the trailing 30 days.
    pub active_users: u64,
    /// Profiles created on/after the first instant of the current month.
    pub new_users_this_month: u64,
    pub storage_usage_by_type: StorageByType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageByType {
    pub images: u64,
    pub videos: u64,
    pub audio: u64,
    pub documents: u64,
    pub others: u64,
}

impl StorageByType {
    fn add(&mut self, category: FileCategory, size: u64) {
        let bucket = match category {
            FileCategory::Image => &mut self.images,
            FileCategory::Video => &mut self.videos,
            FileCategory::Audio => &mut self.audio,
            FileCategory::Document => &mut self.documents,
            FileCategory::Other => &mut self.others,
        };
        *bucket += size;
    }
}

impl Database {
    /// Compute fleet-wide statistics as of `now` by scanning the profile
    /// and file tables.
    pub fn compute_stats(&self, now: DateTime<Utc>) -> Result<AdminStats, DatabaseError> {
        let profiles = self.get_all_profiles()?;
        let files = self.get_all_files()?;

        let total_storage = profiles.iter().map(|p| p.storage_used).sum();

        let active_cutoff = now - Duration::days(30);
        let active_users = files
            .iter()
            .filter(|f| f.created_at >= active_cutoff)
            .map(|f| f.user_id.as_str())
            .collect::<HashSet<_>>()
            .len() as u64;

        let start_of_month = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(now);
        let new_users_this_month = profiles
            .iter()
            .filter(|p| p.created_at >= start_of_month)
            .count() as u64;

        let mut storage_usage_by_type = StorageByType::default();
        for file in &files {
            storage_usage_by_type.add(file.category(), file.size);
        }

        Ok(AdminStats {
            total_users: profiles.len() as u64,
            total_files: files.len() as u64,
            total_storage,
            active_users,
            new_users_this_month,
            storage_usage_by_type,
        })
    }
}
