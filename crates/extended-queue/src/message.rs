//! Message types for queue operations including core domain identifiers.

use crate::codec::ReceiptHandle;
use crate::error::ValidationError;
use crate::size;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Opaque queue address (for SQS, the queue URL) resolved once from a queue name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueHandle(String);

impl QueueHandle {
    /// Create new queue handle with validation
    pub fn new(handle: String) -> Result<Self, ValidationError> {
        if handle.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "queue_handle".to_string(),
            });
        }

        Ok(Self(handle))
    }

    /// Wrap a handle issued by a transport, which is never empty
    pub(crate) fn from_trusted(handle: String) -> Self {
        Self(handle)
    }

    /// Get queue handle as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueHandle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Create timestamp from milliseconds since the Unix epoch
    pub fn from_epoch_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Milliseconds since the Unix epoch
    pub fn epoch_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

/// Outcome of one entry of a batch operation.
///
/// Status sequences are positionally aligned with the input messages of the
/// batch call that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpStatus {
    Succeeded,
    Failed,
}

impl OpStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl From<bool> for OpStatus {
    fn from(ok: bool) -> Self {
        if ok {
            Self::Succeeded
        } else {
            Self::Failed
        }
    }
}

/// Check that every status in a batch succeeded
pub fn all_succeeded(statuses: &[OpStatus]) -> bool {
    statuses.iter().all(|s| s.is_success())
}

/// Location of an externally stored payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobReference {
    pub bucket: String,
    pub key: String,
}

impl BlobReference {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Both coordinates are present
    pub fn is_well_formed(&self) -> bool {
        !self.bucket.is_empty() && !self.key.is_empty()
    }
}

impl std::fmt::Display for BlobReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// A name/value message attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A queue message, either built by a producer before a put or
/// reconstructed from the transport by a get.
///
/// Putting an oversize message rewrites its payload, attributes and receipt
/// handle in place; keep the mutated message if it is going to be deleted
/// later so the stored blob can be found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub attributes: Vec<Attribute>,
    pub payload: Bytes,
    /// Transport-issued message identifier, present on received messages
    pub message_id: Option<String>,
    /// When the transport first accepted the message
    pub first_sent: Option<Timestamp>,
    /// When the message was first received by any consumer
    pub first_received: Option<Timestamp>,
    pub(crate) receipt_handle: ReceiptHandle,
    pub(crate) incomplete: bool,
}

impl Message {
    /// Create new message with payload
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            ..Default::default()
        }
    }

    /// Add message attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    /// Attach a receipt handle (for example one restored from its string form)
    pub fn with_receipt_handle(mut self, receipt_handle: ReceiptHandle) -> Self {
        self.receipt_handle = receipt_handle;
        self
    }

    /// First value of the named attribute
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing any existing entry with the same name
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove_attribute(&name);
        self.attributes.push(Attribute::new(name, value));
    }

    /// Remove the first attribute with this name, returning whether one existed
    pub fn remove_attribute(&mut self, name: &str) -> bool {
        match self.attributes.iter().position(|a| a.name == name) {
            Some(ix) => {
                self.attributes.remove(ix);
                true
            }
            None => false,
        }
    }

    /// Approximate on-wire size, see [`size::message_size`]
    pub fn size(&self) -> usize {
        size::message_size(self)
    }

    /// The receipt handle in its internal form
    pub fn receipt_handle(&self) -> &ReceiptHandle {
        &self.receipt_handle
    }

    /// The transport-native receipt handle, with any blob coordinates stripped
    pub fn native_receipt_handle(&self) -> &str {
        self.receipt_handle.native()
    }

    /// Payload lives in the blob store
    pub fn is_offloaded(&self) -> bool {
        self.receipt_handle.is_offloaded()
    }

    /// The offloaded payload could not be resolved when this message was received
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    /// Clone the attributes and payload but none of the transport or offload state
    pub fn content_clone(&self) -> Message {
        Message {
            attributes: self.attributes.clone(),
            payload: self.payload.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
