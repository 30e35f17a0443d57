//! Error types for extended queue operations.

use crate::message::OpStatus;
use std::time::Duration;
use thiserror::Error;

/// Comprehensive error type for all extended queue operations
#[derive(Debug, Error)]
pub enum ExtendedQueueError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Queue name does not exist: {queue_name}")]
    QueueNotFound { queue_name: String },

    #[error("Queue handle is bad: {handle}")]
    BadQueueHandle { handle: String },

    #[error("Receipt handle format is incorrect for large message support: {receipt}")]
    BadReceiptHandle { receipt: String },

    #[error(
        "One or more operations were not successful ({} of {} failed)",
        count_failed(.statuses),
        .statuses.len()
    )]
    PartialFailure { statuses: Vec<OpStatus> },

    #[error("Blob s3://{bucket}/{key} size differs from declared size: expected {expected}, actual {actual}")]
    ContentMismatch {
        bucket: String,
        key: String,
        expected: usize,
        actual: usize,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Blob store error: {0}")]
    BlobStore(#[from] BlobStoreError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

fn count_failed(statuses: &[OpStatus]) -> usize {
    statuses.iter().filter(|s| s.is_failure()).count()
}

impl ExtendedQueueError {
    /// Per-entry statuses carried by a partial failure
    pub fn statuses(&self) -> Option<&[OpStatus]> {
        match self {
            Self::PartialFailure { statuses } => Some(statuses),
            _ => None,
        }
    }

    /// Check if this is the "one or more operations unsuccessful" kind
    pub fn is_partial_failure(&self) -> bool {
        matches!(self, Self::PartialFailure { .. })
    }

    /// Check if error is transient and the operation may succeed if repeated
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::QueueNotFound { .. } => false,
            Self::BadQueueHandle { .. } => false,
            Self::BadReceiptHandle { .. } => false,
            Self::PartialFailure { .. } => true,
            Self::ContentMismatch { .. } => false,
            Self::Transport(e) => e.is_transient(),
            Self::BlobStore(e) => e.is_transient(),
            Self::Serialization(_) => false,
            Self::Configuration(_) => false,
        }
    }
}

/// Local argument validation errors, raised before any network call
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Block count {count} is too large. Must be {max} or less")]
    BlockCountTooLarge { count: usize, max: usize },

    #[error("Wait time {requested:?} is too large. Must be {max} seconds or less")]
    WaitTooLarge { requested: Duration, max: u64 },

    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },
}

/// Errors reported by a queue transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Queue not found: {queue_name}")]
    QueueNotFound { queue_name: String },

    #[error("Invalid queue address: {handle}")]
    InvalidAddress { handle: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Service error: {code} - {message}")]
    ServiceError { code: String, message: String },

    #[error("Response could not be parsed: {message}")]
    Serialization { message: String },
}

impl TransportError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::QueueNotFound { .. } => false,
            Self::InvalidAddress { .. } => false,
            Self::Authentication { .. } => false,
            Self::ConnectionFailed { .. } => true,
            Self::ServiceError { .. } => true,
            Self::Serialization { .. } => false,
        }
    }
}

/// Errors reported by a blob store
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("Blob not found: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Permission denied: {operation}")]
    PermissionDenied { operation: String },

    #[error("Invalid blob key: {key}")]
    InvalidKey { key: String },

    #[error("Internal storage error: {message}")]
    InternalError { message: String },
}

impl BlobStoreError {
    /// Check if error is transient and worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::InternalError { .. }
        )
    }
}

/// Errors during marker payload or attribute decoding
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Message attribute '{key}' has invalid value '{value}'")]
    InvalidAttribute { key: String, value: String },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
