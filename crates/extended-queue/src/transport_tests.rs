//! Tests for transport value types.

use super::*;

#[test]
fn test_all_successful_collects_ids() {
    let result = BatchResult::all_successful(["0", "1", "2"]);
    assert_eq!(result.successful, vec!["0", "1", "2"]);
    assert!(result.is_complete_success());
}

#[test]
fn test_failures_make_result_incomplete() {
    let result = BatchResult {
        successful: vec!["0".to_string()],
        failed: vec![BatchFailure {
            id: "1".to_string(),
            code: "InternalError".to_string(),
            message: "try again".to_string(),
            sender_fault: false,
        }],
    };
    assert!(!result.is_complete_success());
}
