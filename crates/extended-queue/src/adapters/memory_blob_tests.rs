//! Tests for the in-memory blob store.

use super::*;

#[tokio::test]
async fn test_put_get_delete() {
    let store = InMemoryBlobStore::new();

    store
        .put("bucket", "key", Bytes::from("payload"))
        .await
        .unwrap();
    assert!(store.contains("bucket", "key"));
    assert_eq!(store.object_count(), 1);

    let body = store.get("bucket", "key").await.unwrap();
    assert_eq!(body, Bytes::from("payload"));

    store.delete("bucket", "key").await.unwrap();
    assert!(!store.contains("bucket", "key"));
}

#[tokio::test]
async fn test_get_missing_object() {
    let store = InMemoryBlobStore::new();

    let err = store.get("bucket", "missing").await.unwrap_err();
    assert!(matches!(err, BlobStoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_buckets_are_separate_namespaces() {
    let store = InMemoryBlobStore::new();
    store.put("one", "key", Bytes::from("1")).await.unwrap();
    store.put("two", "key", Bytes::from("2")).await.unwrap();

    assert_eq!(store.get("one", "key").await.unwrap(), Bytes::from("1"));
    assert_eq!(store.get("two", "key").await.unwrap(), Bytes::from("2"));
}

#[tokio::test]
async fn test_injected_put_failures_are_consumed() {
    let store = InMemoryBlobStore::new();
    store.fail_next_puts(1);

    let err = store.put("b", "k", Bytes::from("x")).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(store.object_count(), 0);

    store.put("b", "k", Bytes::from("x")).await.unwrap();
    assert_eq!(store.object_count(), 1);
    assert_eq!(store.put_calls(), 2);
}

#[tokio::test]
async fn test_injected_delete_failure_keeps_object() {
    let store = InMemoryBlobStore::new();
    store.insert_object("b", "k", "x");
    store.fail_next_deletes(1);

    assert!(store.delete("b", "k").await.is_err());
    assert!(store.contains("b", "k"));
}

#[tokio::test]
async fn test_clones_share_state() {
    let store = InMemoryBlobStore::new();
    let clone = store.clone();

    clone.put("b", "k", Bytes::from("x")).await.unwrap();
    assert!(store.contains("b", "k"));
}
