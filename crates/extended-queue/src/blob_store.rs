//! # Blob Store Interface
//!
//! Object storage for payloads too large to travel through the queue. Objects
//! are addressed by `(bucket, key)` and are written once, read back on
//! receive, and deleted when the referencing message is deleted.

use crate::error::BlobStoreError;
use async_trait::async_trait;
use bytes::Bytes;

/// Interface for blob storage operations
///
/// Implementations must be safe for concurrent use from multiple tasks.
///
/// # Examples
///
/// ```no_run
/// use extended_queue::blob_store::BlobStore;
/// use extended_queue::adapters::InMemoryBlobStore;
/// use bytes::Bytes;
/// # async fn example() -> Result<(), extended_queue::BlobStoreError> {
/// let store = InMemoryBlobStore::new();
/// store.put("payloads", "abc", Bytes::from("large body")).await?;
/// let body = store.get("payloads", "abc").await?;
/// assert_eq!(body, Bytes::from("large body"));
/// store.delete("payloads", "abc").await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store an object, overwriting any existing object with the same key
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The key is not acceptable to the store
    /// - Storage service is unavailable
    /// - Credentials do not permit the write
    async fn put(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), BlobStoreError>;

    /// Read an object back in full
    ///
    /// Returns [`BlobStoreError::NotFound`] when no object exists under the key.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, BlobStoreError>;

    /// Delete an object
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), BlobStoreError>;
}
