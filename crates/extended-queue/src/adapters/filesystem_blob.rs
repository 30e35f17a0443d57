//! # Filesystem Blob Store Adapter
//!
//! Local filesystem implementation of [`BlobStore`] for development and
//! single-host deployments. Objects are stored at `<base>/<bucket>/<key>`.

use crate::blob_store::BlobStore;
use crate::error::BlobStoreError;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Filesystem-based blob store
///
/// # Examples
///
/// ```no_run
/// use extended_queue::adapters::FilesystemBlobStore;
/// use std::path::PathBuf;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FilesystemBlobStore::new(PathBuf::from("./data/blobs")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    base_path: PathBuf,
}

impl FilesystemBlobStore {
    /// Create new filesystem blob store
    ///
    /// # Errors
    ///
    /// Returns error if base path cannot be created or accessed.
    pub async fn new(base_path: PathBuf) -> Result<Self, BlobStoreError> {
        fs::create_dir_all(&base_path)
            .await
            .map_err(|e| BlobStoreError::InternalError {
                message: format!("Failed to create base directory: {}", e),
            })?;

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    /// Map a bucket and key to a file path, refusing anything that could escape the base
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, BlobStoreError> {
        for segment in [bucket, key] {
            if segment.is_empty()
                || segment == "."
                || segment == ".."
                || segment.contains(['/', '\\'])
            {
                return Err(BlobStoreError::InvalidKey {
                    key: format!("{}/{}", bucket, key),
                });
            }
        }

        Ok(self.base_path.join(bucket).join(key))
    }
}

fn not_found_or_internal(err: std::io::Error, bucket: &str, key: &str, action: &str) -> BlobStoreError {
    match err.kind() {
        ErrorKind::NotFound => BlobStoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        ErrorKind::PermissionDenied => BlobStoreError::PermissionDenied {
            operation: action.to_string(),
        },
        _ => BlobStoreError::InternalError {
            message: format!("Failed to {} blob: {}", action, err),
        },
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), BlobStoreError> {
        let blob_path = self.object_path(bucket, key)?;

        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BlobStoreError::InternalError {
                    message: format!("Failed to create bucket directory: {}", e),
                })?;
        }

        // Write to a temporary file and rename so readers never see a partial object
        let temp_path = blob_path.with_extension("tmp");
        let mut file =
            fs::File::create(&temp_path)
                .await
                .map_err(|e| BlobStoreError::InternalError {
                    message: format!("Failed to create temp file: {}", e),
                })?;

        file.write_all(&body)
            .await
            .map_err(|e| BlobStoreError::InternalError {
                message: format!("Failed to write blob: {}", e),
            })?;

        file.flush()
            .await
            .map_err(|e| BlobStoreError::InternalError {
                message: format!("Failed to flush file: {}", e),
            })?;

        fs::rename(&temp_path, &blob_path)
            .await
            .map_err(|e| BlobStoreError::InternalError {
                message: format!("Failed to rename temp file: {}", e),
            })?;

        debug!(path = %blob_path.display(), size = body.len(), "Stored blob");
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, BlobStoreError> {
        let blob_path = self.object_path(bucket, key)?;

        let contents = fs::read(&blob_path)
            .await
            .map_err(|e| not_found_or_internal(e, bucket, key, "read"))?;

        Ok(Bytes::from(contents))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), BlobStoreError> {
        let blob_path = self.object_path(bucket, key)?;

        match fs::remove_file(&blob_path).await {
            Ok(()) => Ok(()),
            // Already gone
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(not_found_or_internal(e, bucket, key, "delete")),
        }
    }
}

#[cfg(test)]
#[path = "filesystem_blob_tests.rs"]
mod tests;
