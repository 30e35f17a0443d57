//! # Extended Queue
//!
//! Batched message-queue client that moves oversize payloads to a blob store
//! and back, wire-compatible with the SQS extended client convention (S3
//! payload pointers and enhanced receipt handles).
//!
//! This library provides:
//! - Batch put, get and delete with one status per message
//! - Automatic splitting of batches that exceed the request size limit
//! - Transparent offload of oversize payloads and cleanup on delete
//! - Bounded retry of the failed subset of a put
//! - SQS/S3 HTTP collaborators plus in-memory and filesystem ones for tests
//!
//! ## Module Organization
//!
//! - [`client`] - The [`ExtendedQueue`] trait and its implementation
//! - [`codec`] - Marker payloads, receipt handles and payload offload
//! - [`size`] - Size limits and batch split planning
//! - [`retry`] - Retry policy and the failed-subset retry driver
//! - [`transport`] / [`blob_store`] - Collaborator interfaces
//! - [`providers`] / [`adapters`] - Collaborator implementations
//! - [`config`] / [`logging`] - Configuration loading and tracing setup
//!
//! ## Example
//!
//! ```no_run
//! use extended_queue::{ExtendedQueue, ExtendedQueueClientFactory, Message};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), extended_queue::ExtendedQueueError> {
//! let (client, transport, _blobs) = ExtendedQueueClientFactory::create_test_client("payloads")?;
//! transport.create_queue("orders");
//!
//! let queue = client.queue_handle("orders").await?;
//! let mut batch = vec![Message::new(vec![b'x'; 300_000]), Message::new("small")];
//! client.put_batch(&queue, &mut batch).await?;
//!
//! let received = client.get_batch(&queue, 10, Duration::from_secs(0)).await?;
//! client.delete_batch(&queue, &received.messages).await?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod blob_store;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod message;
pub mod providers;
pub mod retry;
pub mod size;
pub mod transport;

mod signing;

// Re-export commonly used types at crate root for convenience
pub use blob_store::BlobStore;
pub use client::{ExtendedQueue, ExtendedQueueClient, ExtendedQueueClientFactory, ReceivedBatch};
pub use codec::ReceiptHandle;
pub use config::{AwsConfig, ExtendedQueueConfig, RetrySettings};
pub use error::{
    BlobStoreError, ConfigurationError, ExtendedQueueError, SerializationError, TransportError,
    ValidationError,
};
pub use logging::{init_logging, LoggingConfig};
pub use message::{Attribute, BlobReference, Message, OpStatus, QueueHandle, Timestamp};
pub use retry::{put_with_retry, retry_put, RetryPolicy};
pub use transport::QueueTransport;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
