//! Tests for logging setup.

use super::*;

#[test]
fn test_default_logging_config() {
    let config = LoggingConfig::default();
    assert_eq!(config.level, "info");
    assert!(!config.json_format);
    assert!(config.validate().is_ok());
}

#[test]
fn test_level_validation_is_case_insensitive() {
    let config = LoggingConfig {
        level: "DEBUG".to_string(),
        json_format: true,
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_unknown_level_rejected() {
    let config = LoggingConfig {
        level: "chatty".to_string(),
        json_format: false,
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigurationError::Invalid { .. })
    ));
    assert!(init_logging(&config).is_err());
}

#[test]
fn test_init_logging_is_idempotent() {
    let config = LoggingConfig::default();

    assert!(init_logging(&config).is_ok());
    // A subscriber is installed now, so a second call reports it did nothing
    assert_eq!(init_logging(&config).unwrap(), false);
}
