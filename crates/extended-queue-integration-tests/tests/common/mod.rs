//! Common test utilities for extended-queue integration tests
//!
//! This module provides:
//! - A client wired to in-memory collaborators
//! - Payload builders tagged with a checksum attribute
//! - A receive loop that waits for an exact message count

use extended_queue::adapters::InMemoryBlobStore;
use extended_queue::providers::InMemoryQueueTransport;
use extended_queue::{ExtendedQueue, ExtendedQueueClient, ExtendedQueueClientFactory, Message, QueueHandle};
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

pub const BUCKET: &str = "integration-payloads";
pub const QUEUE: &str = "integration-queue";
pub const CHECKSUM_ATTRIBUTE: &str = "sha256";

/// Client plus the collaborators behind it
#[allow(dead_code)]
pub struct TestContext {
    pub client: ExtendedQueueClient,
    pub transport: InMemoryQueueTransport,
    pub blobs: InMemoryBlobStore,
    pub queue: QueueHandle,
}

/// Create a client over in-memory collaborators with one resolved queue
#[allow(dead_code)]
pub async fn test_context() -> TestContext {
    let (client, transport, blobs) =
        ExtendedQueueClientFactory::create_test_client(BUCKET).expect("valid test bucket");
    transport.create_queue(QUEUE);
    let queue = client
        .queue_handle(QUEUE)
        .await
        .expect("queue was just created");

    TestContext {
        client,
        transport,
        blobs,
        queue,
    }
}

#[allow(dead_code)]
pub fn checksum(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Message whose payload can be verified after a round trip
#[allow(dead_code)]
pub fn tagged_message(payload: Vec<u8>) -> Message {
    let sum = checksum(&payload);
    Message::new(payload).with_attribute(CHECKSUM_ATTRIBUTE, sum)
}

/// Payload of `len` bytes with a recognisable pattern
#[allow(dead_code)]
pub fn patterned_payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_add(seed)).collect()
}

/// Assert that a received message still matches its checksum attribute
#[allow(dead_code)]
pub fn assert_intact(message: &Message) {
    let expected = message
        .attribute(CHECKSUM_ATTRIBUTE)
        .expect("message carries a checksum attribute");
    assert_eq!(checksum(&message.payload), expected, "payload was altered");
    assert!(!message.is_incomplete(), "payload was not restored");
}

/// Receive until exactly `count` messages are seen or `deadline` passes
#[allow(dead_code)]
pub async fn get_exactly(
    client: &dyn ExtendedQueue,
    queue: &QueueHandle,
    count: usize,
    deadline: Duration,
) -> Vec<Message> {
    let started = Instant::now();
    let mut received = Vec::new();

    while received.len() < count && started.elapsed() < deadline {
        let wanted = (count - received.len()).min(10);
        let batch = client
            .get_batch(queue, wanted, Duration::from_secs(1))
            .await
            .expect("receive succeeds");

        if batch.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        received.extend(batch.messages);
    }

    received
}
