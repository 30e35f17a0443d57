//! # Queue Transport Interface
//!
//! The batch-oriented queue operations the client is built on. A transport
//! knows nothing about payload offloading; it moves raw bodies and string
//! attributes and reports per-entry outcomes keyed by caller-assigned ids.

use crate::error::TransportError;
use crate::message::QueueHandle;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// One message of a send request
#[derive(Debug, Clone, PartialEq)]
pub struct SendEntry {
    /// Correlation id echoed back in the [`BatchResult`]
    pub id: String,
    pub body: Bytes,
    pub attributes: Vec<(String, String)>,
}

/// One message of a delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    /// Correlation id echoed back in the [`BatchResult`]
    pub id: String,
    /// Transport-native receipt handle
    pub receipt_handle: String,
}

/// A rejected entry of a batch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub id: String,
    pub code: String,
    pub message: String,
    pub sender_fault: bool,
}

/// Per-entry outcome of a send or delete request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    /// Ids of accepted entries
    pub successful: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

impl BatchResult {
    /// Build a result where every listed id succeeded
    pub fn all_successful<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            successful: ids.into_iter().map(Into::into).collect(),
            failed: Vec::new(),
        }
    }

    /// Check if the result carries no failures
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A message as received from the transport
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: Bytes,
    pub attributes: Vec<(String, String)>,
    /// Milliseconds since the epoch when the message was first sent
    pub sent_timestamp: Option<i64>,
    /// Milliseconds since the epoch when the message was first received
    pub first_receive_timestamp: Option<i64>,
}

/// Batch queue operations.
///
/// Implementations must be safe for concurrent use from multiple tasks.
/// Batch calls carry at most ten entries; the client enforces that limit
/// before calling.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Resolve a queue name to the handle used by every other operation
    async fn resolve_handle(&self, queue_name: &str) -> Result<QueueHandle, TransportError>;

    /// Enqueue a batch of messages
    async fn send_batch(
        &self,
        queue: &QueueHandle,
        entries: Vec<SendEntry>,
    ) -> Result<BatchResult, TransportError>;

    /// Receive up to `max_messages`, long-polling for at most `wait`
    async fn receive_batch(
        &self,
        queue: &QueueHandle,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<WireMessage>, TransportError>;

    /// Delete a batch of messages by receipt handle
    async fn delete_batch(
        &self,
        queue: &QueueHandle,
        entries: Vec<DeleteEntry>,
    ) -> Result<BatchResult, TransportError>;
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
