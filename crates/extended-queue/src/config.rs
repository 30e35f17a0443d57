//! Client configuration.
//!
//! Every field carries a serde default so a partially specified file or an
//! environment with only `EXTQ__MESSAGE_BUCKET_NAME` set still produces a
//! complete configuration. Sources are layered by [`ExtendedQueueConfig::load`].

use crate::error::ConfigurationError;
use crate::logging::LoggingConfig;
use crate::retry::RetryPolicy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Prefix for configuration environment variables
pub const ENV_PREFIX: &str = "EXTQ";

/// S3 bucket naming rules: 3-63 characters, lowercase letters, digits, dots and hyphens
const BUCKET_NAME_PATTERN: &str = r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$";

/// Top-level configuration for an extended queue client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtendedQueueConfig {
    /// Bucket receiving offloaded payloads
    pub message_bucket_name: String,

    /// Transport calls at least this slow are logged
    pub slow_request_threshold_ms: u64,

    pub retry: RetrySettings,

    pub logging: LoggingConfig,

    /// AWS connection settings; required only for the AWS-backed client
    pub aws: Option<AwsConfig>,
}

impl Default for ExtendedQueueConfig {
    fn default() -> Self {
        Self {
            message_bucket_name: String::new(),
            slow_request_threshold_ms: 250,
            retry: RetrySettings::default(),
            logging: LoggingConfig::default(),
            aws: None,
        }
    }
}

impl ExtendedQueueConfig {
    /// Configuration with defaults and the given bucket
    pub fn with_bucket(bucket: impl Into<String>) -> Self {
        Self {
            message_bucket_name: bucket.into(),
            ..Default::default()
        }
    }

    /// Load configuration from layered sources.
    ///
    /// Sources (applied in order, later sources override earlier ones):
    ///  1. Built-in defaults
    ///  2. The optional file at `path` (YAML, TOML or JSON by extension)
    ///  3. Environment variables prefixed `EXTQ__` with `__` as separator,
    ///     e.g. `EXTQ__RETRY__MAX_ATTEMPTS=5` sets `retry.max_attempts`
    ///
    /// The result is validated before it is returned.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::Parsing {
                message: e.to_string(),
            })?;

        let loaded: Self = settings
            .try_deserialize()
            .map_err(|e| ConfigurationError::Parsing {
                message: e.to_string(),
            })?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.message_bucket_name.is_empty() {
            return Err(ConfigurationError::Missing {
                key: "message_bucket_name".to_string(),
            });
        }

        let bucket_pattern =
            Regex::new(BUCKET_NAME_PATTERN).map_err(|e| ConfigurationError::Invalid {
                message: e.to_string(),
            })?;
        if !bucket_pattern.is_match(&self.message_bucket_name) {
            return Err(ConfigurationError::Invalid {
                message: format!(
                    "message_bucket_name '{}' is not a valid bucket name",
                    self.message_bucket_name
                ),
            });
        }

        self.retry.validate()?;
        self.logging.validate()?;

        if let Some(aws) = &self.aws {
            aws.validate()?;
        }

        Ok(())
    }

    pub fn slow_request_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_request_threshold_ms)
    }
}

/// Retry settings for resubmitting failed messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts after the first put, including the first retry
    pub max_attempts: u32,
    /// Fixed delay before each attempt
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 500,
        }
    }
}

impl RetrySettings {
    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_attempts == 0 {
            return Err(ConfigurationError::Invalid {
                message: "retry.max_attempts must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Fixed-delay policy built from these settings
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

/// AWS connection settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Override for the SQS endpoint, e.g. a local emulator
    pub sqs_endpoint: Option<String>,
    /// Override for the S3 endpoint, e.g. a local emulator
    pub s3_endpoint: Option<String>,
    pub request_timeout_seconds: u64,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            sqs_endpoint: None,
            s3_endpoint: None,
            request_timeout_seconds: 30,
        }
    }
}

impl fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<REDACTED>"),
            )
            .field("sqs_endpoint", &self.sqs_endpoint)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

impl AwsConfig {
    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.region.is_empty() {
            return Err(ConfigurationError::Missing {
                key: "aws.region".to_string(),
            });
        }

        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(ConfigurationError::Invalid {
                message: "aws.access_key_id and aws.secret_access_key must be set together"
                    .to_string(),
            });
        }

        for (key, endpoint) in [
            ("aws.sqs_endpoint", &self.sqs_endpoint),
            ("aws.s3_endpoint", &self.s3_endpoint),
        ] {
            if let Some(endpoint) = endpoint {
                url::Url::parse(endpoint).map_err(|e| ConfigurationError::Invalid {
                    message: format!("{} '{}': {}", key, endpoint, e),
                })?;
            }
        }

        Ok(())
    }

    /// Fill missing credentials from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`
    pub fn with_environment_credentials(mut self) -> Self {
        if self.access_key_id.is_none() && self.secret_access_key.is_none() {
            if let (Ok(access_key), Ok(secret_key)) = (
                std::env::var("AWS_ACCESS_KEY_ID"),
                std::env::var("AWS_SECRET_ACCESS_KEY"),
            ) {
                self.access_key_id = Some(access_key);
                self.secret_access_key = Some(secret_key);
            }
        }

        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
