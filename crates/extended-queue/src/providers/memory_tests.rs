//! Tests for the in-memory queue transport.

use super::*;

fn entry(id: &str, body: &str) -> SendEntry {
    SendEntry {
        id: id.to_string(),
        body: Bytes::from(body.to_string()),
        attributes: vec![("kind".to_string(), "test".to_string())],
    }
}

// ============================================================================
// Queue Management Tests
// ============================================================================

mod queue_management {
    use super::*;

    #[tokio::test]
    async fn test_resolve_existing_queue() {
        let transport = InMemoryQueueTransport::new();
        let created = transport.create_queue("orders");

        let resolved = transport.resolve_handle("orders").await.unwrap();
        assert_eq!(resolved, created);
        assert_eq!(resolved.as_str(), "memory://queues/orders");
    }

    #[tokio::test]
    async fn test_resolve_unknown_queue() {
        let transport = InMemoryQueueTransport::new();

        let err = transport.resolve_handle("missing").await.unwrap_err();
        assert!(matches!(err, TransportError::QueueNotFound { .. }));
    }

    #[tokio::test]
    async fn test_unknown_handle_is_invalid_address() {
        let transport = InMemoryQueueTransport::new();
        let bogus = QueueHandle::new("memory://queues/nope".to_string()).unwrap();

        let err = transport
            .send_batch(&bogus, vec![entry("0", "x")])
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidAddress { .. }));
    }

    /// Verify that clones see the same queues.
    #[tokio::test]
    async fn test_clones_share_storage() {
        let transport = InMemoryQueueTransport::new();
        let handle = transport.create_queue("shared");
        let clone = transport.clone();

        clone
            .send_batch(&handle, vec![entry("0", "x")])
            .await
            .unwrap();
        assert_eq!(transport.visible_count("shared"), 1);
    }
}

// ============================================================================
// Send / Receive / Delete Tests
// ============================================================================

mod message_flow {
    use super::*;

    #[tokio::test]
    async fn test_send_then_receive_preserves_content() {
        let transport = InMemoryQueueTransport::new();
        let handle = transport.create_queue("q");

        let result = transport
            .send_batch(&handle, vec![entry("0", "first"), entry("1", "second")])
            .await
            .unwrap();
        assert_eq!(result.successful, vec!["0", "1"]);

        let received = transport
            .receive_batch(&handle, 10, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].body, Bytes::from("first"));
        assert_eq!(received[1].body, Bytes::from("second"));
        assert_eq!(
            received[0].attributes,
            vec![("kind".to_string(), "test".to_string())]
        );
        assert!(received[0].sent_timestamp.is_some());
        assert!(received[0].first_receive_timestamp.is_some());
        assert_ne!(received[0].receipt_handle, received[1].receipt_handle);

        assert_eq!(transport.visible_count("q"), 0);
        assert_eq!(transport.in_flight_count("q"), 2);
    }

    #[tokio::test]
    async fn test_receive_respects_max_messages() {
        let transport = InMemoryQueueTransport::new();
        let handle = transport.create_queue("q");
        transport
            .send_batch(
                &handle,
                vec![entry("0", "a"), entry("1", "b"), entry("2", "c")],
            )
            .await
            .unwrap();

        let received = transport
            .receive_batch(&handle, 2, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(transport.visible_count("q"), 1);
    }

    #[tokio::test]
    async fn test_receive_empty_queue_returns_immediately() {
        let transport = InMemoryQueueTransport::new();
        let handle = transport.create_queue("q");

        let received = transport
            .receive_batch(&handle, 10, Duration::from_secs(20))
            .await
            .unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_delete_in_flight_and_unknown_receipts() {
        let transport = InMemoryQueueTransport::new();
        let handle = transport.create_queue("q");
        transport
            .send_batch(&handle, vec![entry("0", "a")])
            .await
            .unwrap();
        let received = transport
            .receive_batch(&handle, 10, Duration::ZERO)
            .await
            .unwrap();

        let result = transport
            .delete_batch(
                &handle,
                vec![
                    DeleteEntry {
                        id: "0".to_string(),
                        receipt_handle: received[0].receipt_handle.clone(),
                    },
                    DeleteEntry {
                        id: "1".to_string(),
                        receipt_handle: "unknown".to_string(),
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(result.successful, vec!["0"]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].id, "1");
        assert_eq!(result.failed[0].code, "ReceiptHandleIsInvalid");
        assert_eq!(transport.in_flight_count("q"), 0);
    }

    #[tokio::test]
    async fn test_release_in_flight_redelivers() {
        let transport = InMemoryQueueTransport::new();
        let handle = transport.create_queue("q");
        transport
            .send_batch(&handle, vec![entry("0", "a")])
            .await
            .unwrap();
        let first = transport
            .receive_batch(&handle, 1, Duration::ZERO)
            .await
            .unwrap();

        transport.release_in_flight("q");
        let second = transport
            .receive_batch(&handle, 1, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(first[0].message_id, second[0].message_id);
        assert_eq!(
            first[0].first_receive_timestamp,
            second[0].first_receive_timestamp
        );
    }
}

// ============================================================================
// Limits and Failure Injection Tests
// ============================================================================

mod limits_and_faults {
    use super::*;

    #[tokio::test]
    async fn test_rejects_more_than_ten_entries() {
        let transport = InMemoryQueueTransport::new();
        let handle = transport.create_queue("q");
        let entries = (0..11).map(|i| entry(&i.to_string(), "x")).collect();

        let err = transport.send_batch(&handle, entries).await.unwrap_err();
        assert!(
            matches!(err, TransportError::ServiceError { ref code, .. } if code == "TooManyEntriesInBatchRequest")
        );
    }

    #[tokio::test]
    async fn test_rejects_oversize_batch() {
        let transport = InMemoryQueueTransport::new();
        let handle = transport.create_queue("q");
        let big = "x".repeat(200_000);

        let err = transport
            .send_batch(&handle, vec![entry("0", &big), entry("1", &big)])
            .await
            .unwrap_err();
        assert!(
            matches!(err, TransportError::ServiceError { ref code, .. } if code == "BatchRequestTooLong")
        );
        assert_eq!(transport.visible_count("q"), 0);
    }

    #[tokio::test]
    async fn test_injected_call_failure_is_consumed() {
        let transport = InMemoryQueueTransport::new();
        let handle = transport.create_queue("q");
        transport.fail_next_call(TransportError::ConnectionFailed {
            message: "down".to_string(),
        });

        assert!(transport
            .send_batch(&handle, vec![entry("0", "x")])
            .await
            .is_err());
        assert!(transport
            .send_batch(&handle, vec![entry("0", "x")])
            .await
            .is_ok());
        assert_eq!(transport.send_calls(), 2);
    }

    #[tokio::test]
    async fn test_rejected_and_omitted_entries() {
        let transport = InMemoryQueueTransport::new();
        let handle = transport.create_queue("q");
        transport.omit_next_send_entries(1);
        transport.reject_next_send_entries(1);

        let result = transport
            .send_batch(
                &handle,
                vec![entry("0", "a"), entry("1", "b"), entry("2", "c")],
            )
            .await
            .unwrap();

        // Entry 0 is omitted, entry 1 rejected, entry 2 accepted
        assert_eq!(result.successful, vec!["2"]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].id, "1");
        assert_eq!(transport.visible_count("q"), 1);
    }

    #[tokio::test]
    async fn test_rejected_delete_entries_stay_in_flight() {
        let transport = InMemoryQueueTransport::new();
        let handle = transport.create_queue("q");
        transport
            .send_batch(&handle, vec![entry("0", "a")])
            .await
            .unwrap();
        let received = transport
            .receive_batch(&handle, 1, Duration::ZERO)
            .await
            .unwrap();
        transport.reject_next_delete_entries(1);

        let result = transport
            .delete_batch(
                &handle,
                vec![DeleteEntry {
                    id: "0".to_string(),
                    receipt_handle: received[0].receipt_handle.clone(),
                }],
            )
            .await
            .unwrap();

        assert!(result.successful.is_empty());
        assert_eq!(transport.in_flight_count("q"), 1);
    }
}
