//! Tests for configuration loading and validation.

use super::*;
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

/// Remove every EXTQ variable a test may have set
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("EXTQ__") {
            std::env::remove_var(key);
        }
    }
}

fn write_config(extension: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(extension)
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test]
fn test_defaults() {
    let config = ExtendedQueueConfig::default();
    assert_eq!(config.slow_request_threshold_ms, 250);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.retry.delay_ms, 500);
    assert!(config.aws.is_none());
}

#[test]
fn test_missing_bucket_rejected() {
    let err = ExtendedQueueConfig::default().validate().unwrap_err();
    assert!(matches!(err, ConfigurationError::Missing { ref key } if key == "message_bucket_name"));
}

#[test]
fn test_bucket_name_rules() {
    for valid in ["abc", "my-bucket.payloads", "0bucket9"] {
        assert!(
            ExtendedQueueConfig::with_bucket(valid).validate().is_ok(),
            "{} should be valid",
            valid
        );
    }

    for invalid in ["ab", "My-Bucket", "-bucket", "bucket-", "bucket_name"] {
        assert!(
            matches!(
                ExtendedQueueConfig::with_bucket(invalid).validate(),
                Err(ConfigurationError::Invalid { .. })
            ),
            "{} should be invalid",
            invalid
        );
    }
}

#[test]
fn test_zero_retry_attempts_rejected() {
    let mut config = ExtendedQueueConfig::with_bucket("payloads");
    config.retry.max_attempts = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_aws_credentials_must_be_paired() {
    let mut config = ExtendedQueueConfig::with_bucket("payloads");
    config.aws = Some(AwsConfig {
        access_key_id: Some("AKID".to_string()),
        ..Default::default()
    });
    assert!(config.validate().is_err());
}

#[test]
fn test_aws_endpoint_must_be_url() {
    let mut config = ExtendedQueueConfig::with_bucket("payloads");
    config.aws = Some(AwsConfig {
        sqs_endpoint: Some("not a url".to_string()),
        ..Default::default()
    });
    assert!(config.validate().is_err());
}

#[test]
fn test_aws_debug_redacts_secret() {
    let aws = AwsConfig {
        access_key_id: Some("AKID".to_string()),
        secret_access_key: Some("super-secret".to_string()),
        ..Default::default()
    };
    let debug = format!("{:?}", aws);
    assert!(!debug.contains("super-secret"));
}

#[test]
fn test_retry_settings_to_policy() {
    let settings = RetrySettings {
        max_attempts: 4,
        delay_ms: 10,
    };
    let policy = settings.to_policy();
    assert_eq!(policy.max_attempts, 4);
    assert_eq!(policy.initial_delay, Duration::from_millis(10));
}

// ============================================================================
// Loading Tests
// ============================================================================

#[test]
#[serial]
fn test_load_from_yaml_file() {
    clear_env();
    let file = write_config(
        ".yaml",
        "message_bucket_name: payloads\nslow_request_threshold_ms: 100\nretry:\n  max_attempts: 5\n",
    );

    let config = ExtendedQueueConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.message_bucket_name, "payloads");
    assert_eq!(config.slow_request_threshold_ms, 100);
    assert_eq!(config.retry.max_attempts, 5);
    // Unspecified fields keep their defaults
    assert_eq!(config.retry.delay_ms, 500);
}

#[test]
#[serial]
fn test_load_from_toml_file_with_aws_section() {
    clear_env();
    let file = write_config(
        ".toml",
        "message_bucket_name = \"payloads\"\n\n[aws]\nregion = \"eu-west-1\"\nsqs_endpoint = \"http://localhost:4566\"\n",
    );

    let config = ExtendedQueueConfig::load(Some(file.path())).unwrap();
    let aws = config.aws.unwrap();
    assert_eq!(aws.region, "eu-west-1");
    assert_eq!(aws.sqs_endpoint.as_deref(), Some("http://localhost:4566"));
    assert_eq!(aws.request_timeout_seconds, 30);
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env();
    let file = write_config(
        ".json",
        r#"{"message_bucket_name": "from-file", "retry": {"delay_ms": 50}}"#,
    );
    std::env::set_var("EXTQ__MESSAGE_BUCKET_NAME", "from-env");
    std::env::set_var("EXTQ__RETRY__DELAY_MS", "75");

    let result = ExtendedQueueConfig::load(Some(file.path()));
    clear_env();

    let config = result.unwrap();
    assert_eq!(config.message_bucket_name, "from-env");
    assert_eq!(config.retry.delay_ms, 75);
}

#[test]
#[serial]
fn test_load_without_bucket_fails_validation() {
    clear_env();

    let err = ExtendedQueueConfig::load(None).unwrap_err();
    assert!(matches!(err, ConfigurationError::Missing { .. }));
}

#[test]
#[serial]
fn test_load_missing_file_fails() {
    clear_env();

    let err = ExtendedQueueConfig::load(Some(Path::new("/nonexistent/extq.yaml"))).unwrap_err();
    assert!(matches!(err, ConfigurationError::Parsing { .. }));
}
