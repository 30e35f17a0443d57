//! In-memory queue transport for testing and development.
//!
//! This module provides a fully functional in-memory queue that:
//! - Enforces the same batch count and size limits as the hosted service
//! - Tracks in-flight messages by receipt handle until they are deleted
//! - Supports deterministic failure injection for whole calls and single entries
//! - Provides thread-safe concurrent access
//!
//! Receives never block: `wait` is accepted but an empty queue returns at once.

use crate::error::TransportError;
use crate::message::{QueueHandle, Timestamp};
use crate::size::{ATTRIBUTE_PADDING, MAX_BLOCK_COUNT, MAX_BLOCK_SIZE, MAX_MESSAGE_SIZE};
use crate::transport::{
    BatchFailure, BatchResult, DeleteEntry, QueueTransport, SendEntry, WireMessage,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

const HANDLE_PREFIX: &str = "memory://queues/";

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// A message stored in the queue with metadata
#[derive(Clone)]
struct StoredMessage {
    message_id: String,
    body: Bytes,
    attributes: Vec<(String, String)>,
    sent_at: Timestamp,
    first_received_at: Option<Timestamp>,
}

impl StoredMessage {
    fn to_wire(&self, receipt_handle: String) -> WireMessage {
        WireMessage {
            message_id: self.message_id.clone(),
            receipt_handle,
            body: self.body.clone(),
            attributes: self.attributes.clone(),
            sent_timestamp: Some(self.sent_at.epoch_millis()),
            first_receive_timestamp: self.first_received_at.as_ref().map(|t| t.epoch_millis()),
        }
    }
}

/// Internal state for a single queue
#[derive(Default)]
struct InMemoryQueue {
    /// Visible messages (FIFO order)
    messages: VecDeque<StoredMessage>,
    /// Received but not yet deleted, keyed by receipt handle
    in_flight: HashMap<String, StoredMessage>,
}

/// Per-call failure injection and call accounting
#[derive(Default)]
struct Faults {
    failing_calls: VecDeque<TransportError>,
    rejected_send_entries: usize,
    omitted_send_entries: usize,
    rejected_delete_entries: usize,
    send_calls: usize,
    receive_calls: usize,
    delete_calls: usize,
}

#[derive(Default)]
struct QueueStorage {
    queues: HashMap<String, InMemoryQueue>,
    faults: Faults,
}

impl QueueStorage {
    fn queue_mut(&mut self, handle: &QueueHandle) -> Result<&mut InMemoryQueue, TransportError> {
        handle
            .as_str()
            .strip_prefix(HANDLE_PREFIX)
            .and_then(|name| self.queues.get_mut(name))
            .ok_or_else(|| TransportError::InvalidAddress {
                handle: handle.to_string(),
            })
    }

    fn take_call_failure(&mut self) -> Result<(), TransportError> {
        match self.faults.failing_calls.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn entry_failure(id: String, code: &str, message: &str) -> BatchFailure {
    BatchFailure {
        id,
        code: code.to_string(),
        message: message.to_string(),
        sender_fault: false,
    }
}

fn entry_size(entry: &SendEntry) -> usize {
    entry.body.len()
        + entry
            .attributes
            .iter()
            .map(|(name, value)| name.len() + value.len() + ATTRIBUTE_PADDING)
            .sum::<usize>()
}

/// Consume one unit of an injected per-entry fault
fn take_one(counter: &mut usize) -> bool {
    if *counter == 0 {
        return false;
    }

    *counter -= 1;
    true
}

// ============================================================================
// InMemoryQueueTransport
// ============================================================================

/// Thread-safe in-memory queue transport
///
/// Clones share the same queues.
#[derive(Clone, Default)]
pub struct InMemoryQueueTransport {
    storage: Arc<RwLock<QueueStorage>>,
}

impl InMemoryQueueTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue (if missing) and return its handle
    pub fn create_queue(&self, queue_name: &str) -> QueueHandle {
        self.write()
            .queues
            .entry(queue_name.to_string())
            .or_default();

        QueueHandle::from_trusted(format!("{}{}", HANDLE_PREFIX, queue_name))
    }

    /// Fail the next transport call of any kind with `error`
    ///
    /// Repeated calls queue several failures, consumed in order.
    pub fn fail_next_call(&self, error: TransportError) {
        self.write().faults.failing_calls.push_back(error);
    }

    /// Report the next `count` send entries as failed
    pub fn reject_next_send_entries(&self, count: usize) {
        self.write().faults.rejected_send_entries = count;
    }

    /// Leave the next `count` send entries out of both result lists
    pub fn omit_next_send_entries(&self, count: usize) {
        self.write().faults.omitted_send_entries = count;
    }

    /// Report the next `count` delete entries as failed
    pub fn reject_next_delete_entries(&self, count: usize) {
        self.write().faults.rejected_delete_entries = count;
    }

    /// Number of visible messages in a queue
    pub fn visible_count(&self, queue_name: &str) -> usize {
        self.write()
            .queues
            .get(queue_name)
            .map(|q| q.messages.len())
            .unwrap_or(0)
    }

    /// Number of received but undeleted messages in a queue
    pub fn in_flight_count(&self, queue_name: &str) -> usize {
        self.write()
            .queues
            .get(queue_name)
            .map(|q| q.in_flight.len())
            .unwrap_or(0)
    }

    /// Make every in-flight message visible again, as a visibility timeout would
    pub fn release_in_flight(&self, queue_name: &str) {
        if let Some(queue) = self.write().queues.get_mut(queue_name) {
            let released: Vec<StoredMessage> = queue.in_flight.drain().map(|(_, m)| m).collect();
            queue.messages.extend(released);
        }
    }

    pub fn send_calls(&self) -> usize {
        self.write().faults.send_calls
    }

    pub fn receive_calls(&self) -> usize {
        self.write().faults.receive_calls
    }

    pub fn delete_calls(&self) -> usize {
        self.write().faults.delete_calls
    }

    fn write(&self) -> RwLockWriteGuard<'_, QueueStorage> {
        self.storage.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl QueueTransport for InMemoryQueueTransport {
    async fn resolve_handle(&self, queue_name: &str) -> Result<QueueHandle, TransportError> {
        let mut storage = self.write();
        storage.take_call_failure()?;

        if !storage.queues.contains_key(queue_name) {
            return Err(TransportError::QueueNotFound {
                queue_name: queue_name.to_string(),
            });
        }

        Ok(QueueHandle::from_trusted(format!(
            "{}{}",
            HANDLE_PREFIX, queue_name
        )))
    }

    async fn send_batch(
        &self,
        queue: &QueueHandle,
        entries: Vec<SendEntry>,
    ) -> Result<BatchResult, TransportError> {
        let mut storage = self.write();
        storage.faults.send_calls += 1;
        storage.take_call_failure()?;

        if entries.is_empty() || entries.len() > MAX_BLOCK_COUNT {
            return Err(TransportError::ServiceError {
                code: "TooManyEntriesInBatchRequest".to_string(),
                message: format!("batch holds {} entries", entries.len()),
            });
        }

        let total: usize = entries.iter().map(entry_size).sum();
        if total > MAX_BLOCK_SIZE {
            return Err(TransportError::ServiceError {
                code: "BatchRequestTooLong".to_string(),
                message: format!("batch size {} exceeds {}", total, MAX_BLOCK_SIZE),
            });
        }

        // Validate the address before touching per-entry faults
        storage.queue_mut(queue)?;

        let mut result = BatchResult::default();
        let mut accepted = Vec::new();
        for entry in entries {
            if take_one(&mut storage.faults.omitted_send_entries) {
                continue;
            }
            if take_one(&mut storage.faults.rejected_send_entries) {
                result
                    .failed
                    .push(entry_failure(entry.id, "InternalError", "injected failure"));
                continue;
            }
            if entry_size(&entry) > MAX_MESSAGE_SIZE {
                result.failed.push(entry_failure(
                    entry.id,
                    "InvalidParameterValue",
                    "message too long",
                ));
                continue;
            }

            accepted.push(StoredMessage {
                message_id: uuid::Uuid::new_v4().to_string(),
                body: entry.body,
                attributes: entry.attributes,
                sent_at: Timestamp::now(),
                first_received_at: None,
            });
            result.successful.push(entry.id);
        }

        storage.queue_mut(queue)?.messages.extend(accepted);
        debug!(
            queue = %queue,
            successful = result.successful.len(),
            failed = result.failed.len(),
            "Send batch processed"
        );

        Ok(result)
    }

    async fn receive_batch(
        &self,
        queue: &QueueHandle,
        max_messages: usize,
        _wait: Duration,
    ) -> Result<Vec<WireMessage>, TransportError> {
        let mut storage = self.write();
        storage.faults.receive_calls += 1;
        storage.take_call_failure()?;

        let state = storage.queue_mut(queue)?;
        let mut received = Vec::new();
        while received.len() < max_messages.min(MAX_BLOCK_COUNT) {
            let Some(mut message) = state.messages.pop_front() else {
                break;
            };

            if message.first_received_at.is_none() {
                message.first_received_at = Some(Timestamp::now());
            }

            let receipt_handle = uuid::Uuid::new_v4().to_string();
            received.push(message.to_wire(receipt_handle.clone()));
            state.in_flight.insert(receipt_handle, message);
        }

        Ok(received)
    }

    async fn delete_batch(
        &self,
        queue: &QueueHandle,
        entries: Vec<DeleteEntry>,
    ) -> Result<BatchResult, TransportError> {
        let mut storage = self.write();
        storage.faults.delete_calls += 1;
        storage.take_call_failure()?;

        if entries.is_empty() || entries.len() > MAX_BLOCK_COUNT {
            return Err(TransportError::ServiceError {
                code: "TooManyEntriesInBatchRequest".to_string(),
                message: format!("batch holds {} entries", entries.len()),
            });
        }

        storage.queue_mut(queue)?;

        let mut result = BatchResult::default();
        for entry in entries {
            if take_one(&mut storage.faults.rejected_delete_entries) {
                result
                    .failed
                    .push(entry_failure(entry.id, "InternalError", "injected failure"));
                continue;
            }

            let state = storage.queue_mut(queue)?;
            if state.in_flight.remove(&entry.receipt_handle).is_some() {
                result.successful.push(entry.id);
            } else {
                result.failed.push(BatchFailure {
                    sender_fault: true,
                    ..entry_failure(
                        entry.id,
                        "ReceiptHandleIsInvalid",
                        "receipt handle is not in flight",
                    )
                });
            }
        }

        Ok(result)
    }
}
