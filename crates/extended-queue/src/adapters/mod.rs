//! # Blob Store Adapters
//!
//! Implementations of the [`BlobStore`](crate::blob_store::BlobStore) interface.

pub mod filesystem_blob;
pub mod memory_blob;
pub mod s3;

pub use filesystem_blob::FilesystemBlobStore;
pub use memory_blob::InMemoryBlobStore;
pub use s3::S3HttpBlobStore;
