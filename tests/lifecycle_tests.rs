use bytes::Bytes;
use chrono::Utc;
use cloud_drive::lifecycle::{self, BestEffort, UploadError, UploadRequest, UploadState};
use cloud_drive::object_store::{LocalStore, ObjectStore};
use cloud_drive::storage::models::{Role, UserProfile};
use cloud_drive::storage::Database;

struct Fixture {
    _dir: tempfile::TempDir,
    db: Database,
    store: LocalStore,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    let store = LocalStore::new(dir.path().join("files"), None).unwrap();
    Fixture {
        _dir: dir,
        db,
        store,
    }
}

fn profile_with_quota(db: &Database, id: &str, used: u64, limit: u64) -> UserProfile {
    let now = Utc::now();
    let profile = UserProfile {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        full_name: None,
        role: Role::User,
        storage_used: used,
        storage_limit: limit,
        created_at: now,
        updated_at: now,
    };
    db.put_profile(&profile).unwrap();
    profile
}

fn png_upload(name: &str, bytes: usize) -> UploadRequest {
    UploadRequest {
        file_name: name.to_string(),
        media_type: "image/png".to_string(),
        data: Bytes::from(vec![0u8; bytes]),
        folder_id: None,
        last_modified: None,
    }
}

const MB: u64 = 1024 * 1024;

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_success() {
    let fx = fixture();
    let profile = profile_with_quota(&fx.db, "u1", 0, 100 * MB);

    let uploaded = lifecycle::upload(&fx.db, &fx.store, &profile, 50, png_upload("photo.png", 1024))
        .await
        .unwrap();

    assert_eq!(uploaded.ledger, BestEffort::Applied);
    let file = &uploaded.file;
    assert_eq!(file.size, 1024);
    assert_eq!(file.original_name, "photo.png");
    assert!(file.name.ends_with(".png"));
    assert!(file.storage_path.starts_with("u1/"));

    // Bytes landed under <userId>/<storageName>
    assert!(fx.store.exists(&file.storage_path).await.unwrap());

    // Metadata is visible and the ledger was credited
    assert!(fx.db.get_file_for_owner("u1", &file.id).unwrap().is_some());
    let profile = fx.db.get_profile("u1").unwrap().unwrap();
    assert_eq!(profile.storage_used, 1024);
}

#[tokio::test]
async fn test_upload_rejects_empty_file_name() {
    let fx = fixture();
    let profile = profile_with_quota(&fx.db, "u1", 0, 100 * MB);

    for name in ["", "   "] {
        let err = lifecycle::upload(&fx.db, &fx.store, &profile, 50, png_upload(name, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::EmptyName));
    }

    // No side effects
    assert!(fx.db.get_files_for_owner("u1").unwrap().is_empty());
    assert_eq!(fx.db.get_profile("u1").unwrap().unwrap().storage_used, 0);
}

#[tokio::test]
async fn test_upload_rejects_unsupported_type() {
    let fx = fixture();
    let profile = profile_with_quota(&fx.db, "u1", 0, 100 * MB);

    let mut req = png_upload("malware.exe", 100);
    req.media_type = "application/x-msdownload".to_string();

    let err = lifecycle::upload(&fx.db, &fx.store, &profile, 50, req)
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::UnsupportedType(_)));

    // No side effects
    assert!(fx.db.get_files_for_owner("u1").unwrap().is_empty());
    assert_eq!(fx.db.get_profile("u1").unwrap().unwrap().storage_used, 0);
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let fx = fixture();
    let profile = profile_with_quota(&fx.db, "u1", 0, 100 * MB);

    let req = png_upload("big.png", (2 * MB) as usize);
    let err = lifecycle::upload(&fx.db, &fx.store, &profile, 1, req)
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::TooLarge(1)));

    assert!(fx.db.get_files_for_owner("u1").unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_quota_exceeded_with_no_side_effects() {
    let fx = fixture();
    // 5 MB of headroom, 10 MB file
    let profile = profile_with_quota(&fx.db, "u1", 95 * MB, 100 * MB);

    let req = png_upload("big.png", (10 * MB) as usize);
    let err = lifecycle::upload(&fx.db, &fx.store, &profile, 50, req)
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::QuotaExceeded));

    // No FileItem, no ledger change
    assert!(fx.db.get_files_for_owner("u1").unwrap().is_empty());
    let profile = fx.db.get_profile("u1").unwrap().unwrap();
    assert_eq!(profile.storage_used, 95 * MB);
}

#[tokio::test]
async fn test_upload_quota_boundary_is_allowed() {
    let fx = fixture();
    // Exactly enough headroom
    let profile = profile_with_quota(&fx.db, "u1", 99 * MB, 100 * MB);

    let req = png_upload("fits.png", MB as usize);
    let uploaded = lifecycle::upload(&fx.db, &fx.store, &profile, 50, req)
        .await
        .unwrap();

    assert_eq!(uploaded.ledger, BestEffort::Applied);
    let profile = fx.db.get_profile("u1").unwrap().unwrap();
    assert_eq!(profile.storage_used, 100 * MB);
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_reverses_quota_and_removes_file() {
    let fx = fixture();
    let profile = profile_with_quota(&fx.db, "u1", 0, 100 * MB);

    let uploaded = lifecycle::upload(
        &fx.db,
        &fx.store,
        &profile,
        50,
        png_upload("doomed.png", (2 * MB) as usize),
    )
    .await
    .unwrap();
    assert_eq!(fx.db.get_profile("u1").unwrap().unwrap().storage_used, 2 * MB);

    let deleted = lifecycle::delete(&fx.db, &fx.store, "u1", &uploaded.file.id)
        .await
        .unwrap();

    assert_eq!(deleted.bytes_removed, BestEffort::Applied);
    assert_eq!(deleted.ledger, BestEffort::Applied);
    assert_eq!(fx.db.get_profile("u1").unwrap().unwrap().storage_used, 0);
    assert!(fx.db.get_files_for_owner("u1").unwrap().is_empty());
    assert!(!fx.store.exists(&uploaded.file.storage_path).await.unwrap());
}

#[tokio::test]
async fn test_delete_not_found() {
    let fx = fixture();
    profile_with_quota(&fx.db, "u1", 0, 100 * MB);

    let err = lifecycle::delete(&fx.db, &fx.store, "u1", "missing")
        .await
        .unwrap_err();
    assert!(matches!(err, lifecycle::DeleteError::NotFound));
}

#[tokio::test]
async fn test_delete_enforces_ownership() {
    let fx = fixture();
    let owner = profile_with_quota(&fx.db, "owner", 0, 100 * MB);
    profile_with_quota(&fx.db, "intruder", 0, 100 * MB);

    let uploaded = lifecycle::upload(&fx.db, &fx.store, &owner, 50, png_upload("mine.png", 100))
        .await
        .unwrap();

    let err = lifecycle::delete(&fx.db, &fx.store, "intruder", &uploaded.file.id)
        .await
        .unwrap_err();
    assert!(matches!(err, lifecycle::DeleteError::NotFound));

    // Still present for the owner
    assert!(fx
        .db
        .get_file_for_owner("owner", &uploaded.file.id)
        .unwrap()
        .is_some());
}

// ============================================================================
// Batch
// ============================================================================

#[tokio::test]
async fn test_batch_is_sequential_and_partial_failure_is_isolated() {
    let fx = fixture();
    // Room for one 2 MB file but not two
    let profile = profile_with_quota(&fx.db, "u1", 0, 3 * MB);

    let results = lifecycle::upload_batch(
        &fx.db,
        &fx.store,
        &profile,
        50,
        vec![
            png_upload("first.png", (2 * MB) as usize),
            png_upload("second.png", (2 * MB) as usize),
        ],
    )
    .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].state, UploadState::Completed);
    assert_eq!(results[1].state, UploadState::Failed);
    // Batch results only ever carry terminal states
    assert!(results
        .iter()
        .all(|r| r.state != UploadState::Pending && r.state != UploadState::Uploading));
    assert!(matches!(
        results[1].result,
        Err(UploadError::QuotaExceeded)
    ));

    // Only the first file landed; the ledger reflects exactly one credit
    assert_eq!(fx.db.get_files_for_owner("u1").unwrap().len(), 1);
    assert_eq!(fx.db.get_profile("u1").unwrap().unwrap().storage_used, 2 * MB);
}

#[tokio::test]
async fn test_batch_preserves_order() {
    let fx = fixture();
    let profile = profile_with_quota(&fx.db, "u1", 0, 100 * MB);

    let results = lifecycle::upload_batch(
        &fx.db,
        &fx.store,
        &profile,
        50,
        vec![png_upload("a.png", 10), png_upload("b.png", 10)],
    )
    .await;

    assert_eq!(results[0].file_name, "a.png");
    assert_eq!(results[1].file_name, "b.png");
    assert!(results.iter().all(|r| r.state == UploadState::Completed));
}
