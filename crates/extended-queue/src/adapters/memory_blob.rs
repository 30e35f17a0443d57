//! In-memory blob store for testing and development.
//!
//! Objects live in a shared map keyed by `(bucket, key)`. Failures can be
//! injected per operation so callers can exercise their error paths without
//! a real storage service.

use crate::blob_store::BlobStore;
use crate::error::BlobStoreError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[cfg(test)]
#[path = "memory_blob_tests.rs"]
mod tests;

#[derive(Default)]
struct BlobState {
    objects: HashMap<(String, String), Bytes>,
    failing_puts: usize,
    failing_gets: usize,
    failing_deletes: usize,
    put_calls: usize,
    get_calls: usize,
    delete_calls: usize,
}

/// Take one injected failure from a counter, if any remain
fn take_failure(remaining: &mut usize, operation: &str) -> Result<(), BlobStoreError> {
    if *remaining == 0 {
        return Ok(());
    }

    *remaining -= 1;
    Err(BlobStoreError::InternalError {
        message: format!("injected {} failure", operation),
    })
}

/// Thread-safe in-memory blob store
///
/// Clones share the same underlying objects.
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    state: Arc<RwLock<BlobState>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` puts fail with an internal error
    pub fn fail_next_puts(&self, count: usize) {
        self.write().failing_puts = count;
    }

    /// Make the next `count` gets fail with an internal error
    pub fn fail_next_gets(&self, count: usize) {
        self.write().failing_gets = count;
    }

    /// Make the next `count` deletes fail with an internal error
    pub fn fail_next_deletes(&self, count: usize) {
        self.write().failing_deletes = count;
    }

    /// Overwrite an object directly, bypassing failure injection
    pub fn insert_object(&self, bucket: &str, key: &str, body: impl Into<Bytes>) {
        self.write()
            .objects
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    /// Read an object directly, bypassing failure injection
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.read()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.object(bucket, key).is_some()
    }

    /// Total number of stored objects across all buckets
    pub fn object_count(&self) -> usize {
        self.read().objects.len()
    }

    pub fn put_calls(&self) -> usize {
        self.read().put_calls
    }

    pub fn get_calls(&self) -> usize {
        self.read().get_calls
    }

    pub fn delete_calls(&self) -> usize {
        self.read().delete_calls
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BlobState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BlobState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), BlobStoreError> {
        let mut state = self.write();
        state.put_calls += 1;
        take_failure(&mut state.failing_puts, "put")?;

        if key.is_empty() {
            return Err(BlobStoreError::InvalidKey {
                key: key.to_string(),
            });
        }

        state
            .objects
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, BlobStoreError> {
        let mut state = self.write();
        state.get_calls += 1;
        take_failure(&mut state.failing_gets, "get")?;

        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), BlobStoreError> {
        let mut state = self.write();
        state.delete_calls += 1;
        take_failure(&mut state.failing_deletes, "delete")?;

        // Deleting a missing object succeeds, as it does for S3
        state
            .objects
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}
