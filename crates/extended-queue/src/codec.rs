//! Blob offload codec.
//!
//! Oversize payloads are moved into the blob store and replaced by a small
//! JSON marker naming the object. The marker, the reserved size attribute and
//! the enhanced receipt handle follow the format used by the Java extended
//! client so both can share a queue.

use crate::blob_store::BlobStore;
use crate::error::{ExtendedQueueError, SerializationError};
use crate::message::{BlobReference, Message};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Attribute holding the original payload length of an offloaded message
pub const RESERVED_ATTRIBUTE_NAME: &str = "SQSLargePayloadSize";

/// Type tag written as the first element of the marker payload
pub const MARKER_TAG: &str = "com.amazon.sqs.javamessaging.MessageS3Pointer";

/// Surrounds the bucket name inside an enhanced receipt handle
pub const BUCKET_DELIMITER: &str = "-..s3BucketName..-";

/// Surrounds the object key inside an enhanced receipt handle
pub const KEY_DELIMITER: &str = "-..s3Key..-";

#[derive(Debug, Serialize, Deserialize)]
struct PointerBody {
    #[serde(rename = "s3BucketName")]
    bucket: String,
    #[serde(rename = "s3Key")]
    key: String,
}

/// Build the marker payload that stands in for an offloaded body
pub fn encode_marker(blob: &BlobReference) -> Result<Bytes, SerializationError> {
    let marker = (
        MARKER_TAG,
        PointerBody {
            bucket: blob.bucket.clone(),
            key: blob.key.clone(),
        },
    );

    Ok(Bytes::from(serde_json::to_vec(&marker)?))
}

/// Read the blob coordinates back out of a marker payload
pub fn decode_marker(payload: &[u8]) -> Result<BlobReference, SerializationError> {
    let (tag, body): (String, PointerBody) = serde_json::from_slice(payload)?;
    if tag != MARKER_TAG {
        debug!(tag = %tag, "Marker payload carries an unfamiliar type tag");
    }

    Ok(BlobReference::new(body.bucket, body.key))
}

// ============================================================================
// Receipt Handles
// ============================================================================

/// Receipt handle of a received or sent message.
///
/// The string form of an offloaded handle embeds the blob coordinates ahead
/// of the native handle:
/// `<bucket delim><bucket><bucket delim><key delim><key><key delim><native>`.
/// Use `to_string()` to get the form handed to other processes and
/// [`str::parse`] to restore it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReceiptHandle {
    /// Handle exactly as issued by the transport
    Native(String),
    /// Handle of a message whose payload lives in the blob store
    Offloaded { blob: BlobReference, native: String },
}

impl Default for ReceiptHandle {
    fn default() -> Self {
        Self::Native(String::new())
    }
}

impl ReceiptHandle {
    /// The transport-issued handle, without blob coordinates
    pub fn native(&self) -> &str {
        match self {
            Self::Native(native) => native,
            Self::Offloaded { native, .. } => native,
        }
    }

    /// Blob coordinates, for offloaded handles
    pub fn blob(&self) -> Option<&BlobReference> {
        match self {
            Self::Native(_) => None,
            Self::Offloaded { blob, .. } => Some(blob),
        }
    }

    pub fn is_offloaded(&self) -> bool {
        matches!(self, Self::Offloaded { .. })
    }
}

impl std::fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native(native) => write!(f, "{}", native),
            Self::Offloaded { blob, native } => write!(
                f,
                "{bd}{}{bd}{kd}{}{kd}{}",
                blob.bucket,
                blob.key,
                native,
                bd = BUCKET_DELIMITER,
                kd = KEY_DELIMITER
            ),
        }
    }
}

impl FromStr for ReceiptHandle {
    type Err = ExtendedQueueError;

    /// A string carrying neither delimiter is a native handle. Otherwise both
    /// delimiters must split it into exactly three segments.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.contains(BUCKET_DELIMITER) && !s.contains(KEY_DELIMITER) {
            return Ok(Self::Native(s.to_string()));
        }

        let bucket_tokens: Vec<&str> = s.split(BUCKET_DELIMITER).collect();
        let key_tokens: Vec<&str> = s.split(KEY_DELIMITER).collect();
        if bucket_tokens.len() != 3 || key_tokens.len() != 3 {
            return Err(ExtendedQueueError::BadReceiptHandle {
                receipt: s.to_string(),
            });
        }

        Ok(Self::Offloaded {
            blob: BlobReference::new(bucket_tokens[1], key_tokens[1]),
            native: key_tokens[2].to_string(),
        })
    }
}

// ============================================================================
// Offload Operations
// ============================================================================

/// Moves payloads between messages and the blob store
#[derive(Clone)]
pub struct PayloadOffloader {
    blob_store: Arc<dyn BlobStore>,
}

impl PayloadOffloader {
    pub fn new(blob_store: Arc<dyn BlobStore>) -> Self {
        Self { blob_store }
    }

    /// Store the payload in `bucket` and replace it with a marker.
    ///
    /// Does nothing for a message that is already offloaded. If the blob
    /// write fails the message is left as it was.
    #[instrument(skip_all, fields(bucket = %bucket, payload_size = message.payload.len()))]
    pub async fn offload(
        &self,
        message: &mut Message,
        bucket: &str,
    ) -> Result<(), ExtendedQueueError> {
        if message.is_offloaded() {
            return Ok(());
        }

        let blob = BlobReference::new(bucket, uuid::Uuid::new_v4().to_string());
        let marker = encode_marker(&blob)?;

        self.blob_store
            .put(&blob.bucket, &blob.key, message.payload.clone())
            .await?;

        debug!(key = %blob.key, "Stored oversize payload");

        let original_size = message.payload.len();
        let native = message.receipt_handle.native().to_string();
        message.payload = marker;
        message.set_attribute(RESERVED_ATTRIBUTE_NAME, original_size.to_string());
        message.receipt_handle = ReceiptHandle::Offloaded { blob, native };

        Ok(())
    }

    /// Replace a received marker payload with the stored body.
    ///
    /// Messages without the reserved attribute are left alone. On any failure
    /// the message keeps its received content, is flagged incomplete, and the
    /// error is returned.
    #[instrument(skip(self, message), fields(message_id = ?message.message_id))]
    pub async fn resolve(&self, message: &mut Message) -> Result<(), ExtendedQueueError> {
        let Some(declared) = message.attribute(RESERVED_ATTRIBUTE_NAME) else {
            return Ok(());
        };
        let declared = declared.to_string();

        match self.fetch(message, &declared).await {
            Ok((blob, payload)) => {
                let native = message.receipt_handle.native().to_string();
                message.remove_attribute(RESERVED_ATTRIBUTE_NAME);
                message.payload = payload;
                message.receipt_handle = ReceiptHandle::Offloaded { blob, native };
                Ok(())
            }
            Err(e) => {
                message.incomplete = true;
                warn!(error = %e, "Could not resolve offloaded payload");
                Err(e)
            }
        }
    }

    async fn fetch(
        &self,
        message: &Message,
        declared: &str,
    ) -> Result<(BlobReference, Bytes), ExtendedQueueError> {
        let blob = decode_marker(&message.payload)?;
        let expected: usize =
            declared
                .parse()
                .map_err(|_| SerializationError::InvalidAttribute {
                    key: RESERVED_ATTRIBUTE_NAME.to_string(),
                    value: declared.to_string(),
                })?;

        let payload = self.blob_store.get(&blob.bucket, &blob.key).await?;
        if payload.len() != expected {
            return Err(ExtendedQueueError::ContentMismatch {
                bucket: blob.bucket,
                key: blob.key,
                expected,
                actual: payload.len(),
            });
        }

        Ok((blob, payload))
    }

    /// Delete the stored payload of an offloaded message.
    ///
    /// Does nothing for messages that were never offloaded.
    #[instrument(skip(self, message))]
    pub async fn cleanup(&self, message: &Message) -> Result<(), ExtendedQueueError> {
        let Some(blob) = message.receipt_handle.blob() else {
            return Ok(());
        };

        if !blob.is_well_formed() {
            return Err(ExtendedQueueError::BadReceiptHandle {
                receipt: message.receipt_handle.to_string(),
            });
        }

        self.blob_store.delete(&blob.bucket, &blob.key).await?;
        debug!(bucket = %blob.bucket, key = %blob.key, "Deleted offloaded payload");

        Ok(())
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
