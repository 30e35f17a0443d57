//! Approximate wire sizing and batch split planning.
//!
//! Queue services cap both a single message and a whole batch request. The
//! functions here estimate the on-wire size of messages and decide how a
//! batch of messages must be cut into blocks that stay under those caps.

use crate::error::ValidationError;
use crate::message::Message;
use std::ops::Range;
use std::time::Duration;

/// Maximum number of entries in one batch request
pub const MAX_BLOCK_COUNT: usize = 10;

/// Maximum aggregate size of one batch request, in bytes
pub const MAX_BLOCK_SIZE: usize = 262_144;

/// Maximum size of a single message before its payload must be offloaded
pub const MAX_MESSAGE_SIZE: usize = 262_144;

/// Maximum long-poll wait for a receive
pub const MAX_WAIT_SECONDS: u64 = 20;

/// Envelope overhead charged per attribute (three bytes for each of the two strings)
pub const ATTRIBUTE_PADDING: usize = 6;

/// Approximate on-wire size of a message
pub fn message_size(message: &Message) -> usize {
    let attributes: usize = message
        .attributes
        .iter()
        .map(|a| a.name.len() + a.value.len() + ATTRIBUTE_PADDING)
        .sum();

    message.payload.len() + attributes
}

/// Aggregate size of a block given the per-message sizes
pub fn block_size(sizes: &[usize]) -> usize {
    sizes.iter().sum()
}

/// The message must be offloaded before it can be sent
pub fn needs_offload(message: &Message) -> bool {
    message_size(message) > MAX_MESSAGE_SIZE
}

/// Reject batches with more entries than one request may carry
pub fn validate_block_count(count: usize) -> Result<(), ValidationError> {
    if count > MAX_BLOCK_COUNT {
        return Err(ValidationError::BlockCountTooLarge {
            count,
            max: MAX_BLOCK_COUNT,
        });
    }

    Ok(())
}

/// Reject long-poll waits the service would refuse
pub fn validate_wait(wait: Duration) -> Result<(), ValidationError> {
    if wait > Duration::from_secs(MAX_WAIT_SECONDS) {
        return Err(ValidationError::WaitTooLarge {
            requested: wait,
            max: MAX_WAIT_SECONDS,
        });
    }

    Ok(())
}

/// Cut a sequence of message sizes into contiguous blocks.
///
/// A range whose aggregate size exceeds [`MAX_BLOCK_SIZE`] (or whose length
/// exceeds [`MAX_BLOCK_COUNT`]) is split at `len / 2` until it fits or holds
/// a single message. The returned ranges cover `0..sizes.len()` in order
/// without gaps or overlap.
pub fn plan_blocks(sizes: &[usize]) -> Vec<Range<usize>> {
    let mut blocks = Vec::new();
    if sizes.is_empty() {
        return blocks;
    }

    // Stack of pending ranges; the right half is pushed first so blocks come out in order.
    let mut pending = vec![0..sizes.len()];
    while let Some(range) = pending.pop() {
        let fits = range.len() <= MAX_BLOCK_COUNT
            && block_size(&sizes[range.clone()]) <= MAX_BLOCK_SIZE;

        if fits || range.len() == 1 {
            blocks.push(range);
            continue;
        }

        let mid = range.start + range.len() / 2;
        pending.push(mid..range.end);
        pending.push(range.start..mid);
    }

    blocks
}

#[cfg(test)]
#[path = "size_tests.rs"]
mod tests;
