//! Client trait and implementation for batched queue operations.
//!
//! [`ExtendedQueueClient`] drives the put, get and delete pipelines on top of
//! a [`QueueTransport`] and a [`BlobStore`]. Payloads too large for the queue
//! are moved to the blob store on put and restored on get; the blob is
//! removed once the referencing message is deleted.

use crate::adapters::{InMemoryBlobStore, S3HttpBlobStore};
use crate::blob_store::BlobStore;
use crate::codec::{PayloadOffloader, ReceiptHandle};
use crate::config::ExtendedQueueConfig;
use crate::error::{ConfigurationError, ExtendedQueueError, TransportError, ValidationError};
use crate::message::{all_succeeded, Attribute, Message, OpStatus, QueueHandle, Timestamp};
use crate::providers::{InMemoryQueueTransport, SqsHttpTransport};
use crate::retry::{self, RetryPolicy};
use crate::size;
use crate::transport::{BatchResult, DeleteEntry, QueueTransport, SendEntry, WireMessage};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// Batched queue operations with transparent payload offload
#[async_trait]
pub trait ExtendedQueue: Send + Sync {
    /// Resolve a queue name to its handle
    async fn queue_handle(&self, queue_name: &str) -> Result<QueueHandle, ExtendedQueueError>;

    /// Send up to ten messages.
    ///
    /// Oversize messages are offloaded in place before sending, so keep the
    /// slice if the messages will be deleted through this client later.
    /// Returns one status per message; any failure is reported as
    /// `PartialFailure` carrying the same statuses.
    async fn put_batch(
        &self,
        queue: &QueueHandle,
        messages: &mut [Message],
    ) -> Result<Vec<OpStatus>, ExtendedQueueError>;

    /// Receive up to `max_messages` (at most ten), long-polling for `wait`
    async fn get_batch(
        &self,
        queue: &QueueHandle,
        max_messages: usize,
        wait: Duration,
    ) -> Result<ReceivedBatch, ExtendedQueueError>;

    /// Delete up to ten received messages and any blobs they reference
    async fn delete_batch(
        &self,
        queue: &QueueHandle,
        messages: &[Message],
    ) -> Result<Vec<OpStatus>, ExtendedQueueError>;
}

/// Messages returned by a get.
///
/// A message whose offloaded payload could not be restored is still part of
/// `messages` (flagged incomplete); the reason is listed in `failures` under
/// its index.
#[derive(Debug, Default)]
pub struct ReceivedBatch {
    pub messages: Vec<Message>,
    pub failures: Vec<(usize, ExtendedQueueError)>,
}

impl ReceivedBatch {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Check if every message was fully reconstructed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Queue client backed by injected transport and blob store collaborators
#[derive(Clone)]
pub struct ExtendedQueueClient {
    transport: Arc<dyn QueueTransport>,
    offloader: PayloadOffloader,
    bucket: String,
    slow_request_threshold: Duration,
    retry_policy: RetryPolicy,
}

impl ExtendedQueueClient {
    /// Create a client after validating the configuration
    pub fn new(
        config: &ExtendedQueueConfig,
        transport: Arc<dyn QueueTransport>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Result<Self, ExtendedQueueError> {
        config.validate()?;

        Ok(Self {
            transport,
            offloader: PayloadOffloader::new(blob_store),
            bucket: config.message_bucket_name.clone(),
            slow_request_threshold: config.slow_request_threshold(),
            retry_policy: config.retry.to_policy(),
        })
    }

    /// Bucket that receives offloaded payloads
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Put a batch and retry failed messages with the configured policy
    pub async fn put_batch_with_retry(
        &self,
        queue: &QueueHandle,
        messages: &mut [Message],
    ) -> Result<Vec<OpStatus>, ExtendedQueueError> {
        retry::put_with_retry(self, queue, messages, &self.retry_policy).await
    }

    /// Delete messages by the string form of their receipt handles, as
    /// handed over by another process.
    ///
    /// A malformed receipt is reported as a failed status for its entry.
    pub async fn delete_receipts(
        &self,
        queue: &QueueHandle,
        receipts: &[&str],
    ) -> Result<Vec<OpStatus>, ExtendedQueueError> {
        let messages: Vec<Message> = receipts
            .iter()
            .enumerate()
            .map(|(index, receipt)| match receipt.parse::<ReceiptHandle>() {
                Ok(handle) => Message::default().with_receipt_handle(handle),
                Err(e) => {
                    warn!(index, error = %e, "Malformed receipt handle");
                    Message::default()
                }
            })
            .collect();

        self.delete_batch(queue, &messages).await
    }

    /// Await a transport call, logging it when it exceeds the slow-request threshold
    async fn timed<T, F>(&self, operation: &'static str, call: F) -> T
    where
        F: Future<Output = T> + Send,
    {
        let started = Instant::now();
        let outcome = call.await;
        let elapsed = started.elapsed();

        if elapsed >= self.slow_request_threshold {
            info!(
                operation,
                elapsed_ms = elapsed.as_millis() as u64,
                "Slow queue request"
            );
        }

        outcome
    }

    /// Offload oversize messages, marking those that cannot be sent.
    ///
    /// A message that stays over the limit once its payload is stored is put
    /// back exactly as the caller supplied it and its new blob is removed.
    async fn offload_oversize(&self, messages: &mut [Message], statuses: &mut [OpStatus]) {
        for (index, message) in messages.iter_mut().enumerate() {
            if !size::needs_offload(message) {
                continue;
            }

            let original = (!message.is_offloaded()).then(|| message.clone());
            if let Err(e) = self.offloader.offload(message, &self.bucket).await {
                warn!(index, error = %e, "Offload failed; message will not be sent");
                statuses[index] = OpStatus::Failed;
                continue;
            }

            if !size::needs_offload(message) {
                continue;
            }

            warn!(
                index,
                size = message.size(),
                "Message exceeds the size limit even after offload"
            );
            statuses[index] = OpStatus::Failed;

            // Only undo an offload made by this call
            if let Some(original) = original {
                if let Err(e) = self.offloader.cleanup(message).await {
                    warn!(index, error = %e, "Could not remove blob of unsendable message");
                }
                *message = original;
            }
        }
    }
}

#[async_trait]
impl ExtendedQueue for ExtendedQueueClient {
    #[instrument(skip(self))]
    async fn queue_handle(&self, queue_name: &str) -> Result<QueueHandle, ExtendedQueueError> {
        if queue_name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "queue_name".to_string(),
            }
            .into());
        }

        self.timed("resolve_handle", self.transport.resolve_handle(queue_name))
            .await
            .map_err(map_transport_error)
    }

    #[instrument(skip_all, fields(queue = %queue, count = messages.len()))]
    async fn put_batch(
        &self,
        queue: &QueueHandle,
        messages: &mut [Message],
    ) -> Result<Vec<OpStatus>, ExtendedQueueError> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }
        size::validate_block_count(messages.len())?;

        let mut statuses = vec![OpStatus::Succeeded; messages.len()];
        self.offload_oversize(messages, &mut statuses).await;

        // Excluded messages count as empty so they never force a split
        let sizes: Vec<usize> = messages
            .iter()
            .zip(&statuses)
            .map(|(m, s)| if s.is_success() { m.size() } else { 0 })
            .collect();

        let mut answered_any = false;
        for block in size::plan_blocks(&sizes) {
            let submitted: Vec<usize> = block.filter(|&ix| statuses[ix].is_success()).collect();
            if submitted.is_empty() {
                continue;
            }

            let entries: Vec<SendEntry> = submitted
                .iter()
                .map(|&ix| send_entry(ix, &messages[ix]))
                .collect();

            match self
                .timed("send_batch", self.transport.send_batch(queue, entries))
                .await
            {
                Ok(result) => {
                    reconcile(&result, &submitted, &mut statuses);
                    answered_any = true;
                }
                Err(e) => {
                    let err = map_transport_error(e);
                    if !answered_any || matches!(err, ExtendedQueueError::BadQueueHandle { .. }) {
                        return Err(err);
                    }

                    warn!(error = %err, first_index = submitted[0], "Send failed for block");
                    for ix in submitted {
                        statuses[ix] = OpStatus::Failed;
                    }
                }
            }
        }

        finish(statuses)
    }

    #[instrument(skip_all, fields(queue = %queue, max_messages = max_messages))]
    async fn get_batch(
        &self,
        queue: &QueueHandle,
        max_messages: usize,
        wait: Duration,
    ) -> Result<ReceivedBatch, ExtendedQueueError> {
        size::validate_block_count(max_messages)?;
        size::validate_wait(wait)?;
        if max_messages == 0 {
            return Ok(ReceivedBatch::default());
        }

        let received = self
            .timed(
                "receive_batch",
                self.transport.receive_batch(queue, max_messages, wait),
            )
            .await
            .map_err(map_transport_error)?;

        let mut batch = ReceivedBatch::default();
        for (index, wire) in received.into_iter().enumerate() {
            let mut message = message_from_wire(wire);
            if let Err(e) = self.offloader.resolve(&mut message).await {
                batch.failures.push((index, e));
            }
            batch.messages.push(message);
        }

        debug!(
            received = batch.len(),
            incomplete = batch.failures.len(),
            "Received batch"
        );
        Ok(batch)
    }

    #[instrument(skip_all, fields(queue = %queue, count = messages.len()))]
    async fn delete_batch(
        &self,
        queue: &QueueHandle,
        messages: &[Message],
    ) -> Result<Vec<OpStatus>, ExtendedQueueError> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }
        size::validate_block_count(messages.len())?;

        let mut statuses = vec![OpStatus::Succeeded; messages.len()];
        let mut submitted = Vec::new();
        let mut entries = Vec::new();
        for (index, message) in messages.iter().enumerate() {
            let native = message.native_receipt_handle();
            if native.is_empty() {
                warn!(index, "Message has no receipt handle; not deleted");
                statuses[index] = OpStatus::Failed;
                continue;
            }

            entries.push(DeleteEntry {
                id: index.to_string(),
                receipt_handle: native.to_string(),
            });
            submitted.push(index);
        }

        if !entries.is_empty() {
            let result = self
                .timed("delete_batch", self.transport.delete_batch(queue, entries))
                .await
                .map_err(map_transport_error)?;
            reconcile(&result, &submitted, &mut statuses);

            for &index in &submitted {
                if statuses[index].is_failure() {
                    continue;
                }

                if let Err(e) = self.offloader.cleanup(&messages[index]).await {
                    warn!(
                        index,
                        error = %e,
                        blob = ?messages[index].receipt_handle().blob(),
                        "Queue entry deleted but its blob was orphaned"
                    );
                    statuses[index] = OpStatus::Failed;
                }
            }
        }

        finish(statuses)
    }
}

fn finish(statuses: Vec<OpStatus>) -> Result<Vec<OpStatus>, ExtendedQueueError> {
    if all_succeeded(&statuses) {
        Ok(statuses)
    } else {
        Err(ExtendedQueueError::PartialFailure { statuses })
    }
}

fn map_transport_error(error: TransportError) -> ExtendedQueueError {
    match error {
        TransportError::InvalidAddress { handle } => ExtendedQueueError::BadQueueHandle { handle },
        TransportError::QueueNotFound { queue_name } => {
            ExtendedQueueError::QueueNotFound { queue_name }
        }
        other => ExtendedQueueError::Transport(other),
    }
}

fn send_entry(index: usize, message: &Message) -> SendEntry {
    SendEntry {
        id: index.to_string(),
        body: message.payload.clone(),
        attributes: message
            .attributes
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect(),
    }
}

/// Fold a batch result into the statuses of the submitted indices.
///
/// Entries reported in neither list are treated as failed.
fn reconcile(result: &BatchResult, submitted: &[usize], statuses: &mut [OpStatus]) {
    let mut answered = vec![false; statuses.len()];

    for id in &result.successful {
        if let Some(ix) = correlation_index(id, submitted) {
            answered[ix] = true;
        }
    }

    for failure in &result.failed {
        if let Some(ix) = correlation_index(&failure.id, submitted) {
            answered[ix] = true;
            statuses[ix] = OpStatus::Failed;
            debug!(
                index = ix,
                code = %failure.code,
                sender_fault = failure.sender_fault,
                "Entry rejected: {}",
                failure.message
            );
        }
    }

    for &ix in submitted {
        if !answered[ix] {
            warn!(index = ix, "Entry missing from batch result; treating as failed");
            statuses[ix] = OpStatus::Failed;
        }
    }
}

fn correlation_index(id: &str, submitted: &[usize]) -> Option<usize> {
    match id.parse::<usize>() {
        Ok(ix) if submitted.contains(&ix) => Some(ix),
        _ => {
            warn!(id, "Ignoring unknown correlation id in batch result");
            None
        }
    }
}

/// Build a domain message from a received wire message
pub(crate) fn message_from_wire(wire: WireMessage) -> Message {
    Message {
        attributes: wire
            .attributes
            .into_iter()
            .map(|(name, value)| Attribute { name, value })
            .collect(),
        payload: wire.body,
        message_id: Some(wire.message_id).filter(|id| !id.is_empty()),
        first_sent: wire.sent_timestamp.and_then(Timestamp::from_epoch_millis),
        first_received: wire
            .first_receive_timestamp
            .and_then(Timestamp::from_epoch_millis),
        receipt_handle: ReceiptHandle::Native(wire.receipt_handle),
        incomplete: false,
    }
}

/// Factory for creating extended queue clients with appropriate collaborators
pub struct ExtendedQueueClientFactory;

impl ExtendedQueueClientFactory {
    /// Create a client backed by SQS and S3 over HTTP.
    ///
    /// Credentials missing from the configuration are taken from
    /// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`.
    pub fn create_aws_client(
        config: &ExtendedQueueConfig,
    ) -> Result<ExtendedQueueClient, ExtendedQueueError> {
        let aws = config
            .aws
            .clone()
            .ok_or_else(|| ConfigurationError::Missing {
                key: "aws".to_string(),
            })?
            .with_environment_credentials();

        let transport = Arc::new(SqsHttpTransport::new(&aws)?);
        let blob_store = Arc::new(S3HttpBlobStore::new(&aws)?);

        ExtendedQueueClient::new(config, transport, blob_store)
    }

    /// Create a client over in-memory collaborators.
    ///
    /// The transport and blob store are returned as well so tests can
    /// create queues, inject failures and inspect stored objects.
    pub fn create_test_client(
        bucket: &str,
    ) -> Result<(ExtendedQueueClient, InMemoryQueueTransport, InMemoryBlobStore), ExtendedQueueError>
    {
        let transport = InMemoryQueueTransport::new();
        let blob_store = InMemoryBlobStore::new();
        let config = ExtendedQueueConfig::with_bucket(bucket);

        let client = ExtendedQueueClient::new(
            &config,
            Arc::new(transport.clone()),
            Arc::new(blob_store.clone()),
        )?;

        Ok((client, transport, blob_store))
    }
}
