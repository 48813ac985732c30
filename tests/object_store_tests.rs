use bytes::Bytes;
use cloud_drive::object_store::{LocalStore, ObjectStore};

#[tokio::test]
async fn test_local_store_put_get() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path(), None).unwrap();

    let data = Bytes::from("hello world");
    store.put("test-key", data.clone()).await.unwrap();

    let retrieved = store.get("test-key").await.unwrap();
    assert_eq!(retrieved, data);
}

#[tokio::test]
async fn test_local_store_nested_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path(), None).unwrap();

    // Keys are <user_id>/<storage_name>
    let data = Bytes::from("nested");
    store.put("user-1/photo_123_abc.png", data.clone()).await.unwrap();

    let retrieved = store.get("user-1/photo_123_abc.png").await.unwrap();
    assert_eq!(retrieved, data);

    store.delete("user-1/photo_123_abc.png").await.unwrap();
    assert!(!store.exists("user-1/photo_123_abc.png").await.unwrap());
}

#[tokio::test]
async fn test_local_store_exists() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path(), None).unwrap();

    assert!(!store.exists("missing").await.unwrap());

    store.put("present", Bytes::from("data")).await.unwrap();
    assert!(store.exists("present").await.unwrap());
}

#[tokio::test]
async fn test_local_store_delete_nonexistent() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path(), None).unwrap();

    // Deleting a nonexistent key should not error
    store.delete("nonexistent").await.unwrap();
}

#[tokio::test]
async fn test_local_store_get_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path(), None).unwrap();

    let result = store.get("missing").await;
    assert!(result.is_err());
    assert!(matches!(
        result.unwrap_err(),
        cloud_drive::object_store::ObjectStoreError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_local_store_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path(), None).unwrap();

    store.put("key", Bytes::from("first")).await.unwrap();
    store.put("key", Bytes::from("second")).await.unwrap();

    let data = store.get("key").await.unwrap();
    assert_eq!(data, Bytes::from("second"));
}

#[tokio::test]
async fn test_local_store_public_url() {
    let dir = tempfile::tempdir().unwrap();

    let without_base = LocalStore::new(dir.path(), None).unwrap();
    assert_eq!(without_base.public_url("u1/a.png"), None);

    let with_base =
        LocalStore::new(dir.path(), Some("http://localhost:8080/static/".to_string())).unwrap();
    assert_eq!(
        with_base.public_url("u1/a.png"),
        Some("http://localhost:8080/static/u1/a.png".to_string())
    );
}
