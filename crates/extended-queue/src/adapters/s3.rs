//! # S3 Blob Store Adapter
//!
//! Stores offloaded payloads in S3 using path-style REST requests
//! (`<endpoint>/<bucket>/<key>`) signed with AWS Signature V4. Path-style
//! addressing also works against local S3 emulators.

use crate::blob_store::BlobStore;
use crate::config::AwsConfig;
use crate::error::BlobStoreError;
use crate::providers::aws::endpoint_host;
use crate::signing::AwsV4Signer;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Client as HttpClient, Method, StatusCode};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// S3 blob store over the REST API
pub struct S3HttpBlobStore {
    http_client: HttpClient,
    signer: Option<AwsV4Signer>,
    endpoint: String,
    host: String,
}

impl S3HttpBlobStore {
    /// Create new S3 blob store
    ///
    /// The endpoint defaults to `https://s3.<region>.amazonaws.com` unless
    /// `s3_endpoint` overrides it.
    pub fn new(config: &AwsConfig) -> Result<Self, BlobStoreError> {
        if config.region.is_empty() {
            return Err(BlobStoreError::InternalError {
                message: "Region cannot be empty".to_string(),
            });
        }

        let signer = match (&config.access_key_id, &config.secret_access_key) {
            (Some(access_key), Some(secret_key)) => Some(AwsV4Signer::new(
                access_key.as_str(),
                secret_key.as_str(),
                config.region.as_str(),
                "s3",
            )),
            _ => None,
        };

        let endpoint = config
            .s3_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://s3.{}.amazonaws.com", config.region));
        let host = endpoint_host(&endpoint).map_err(|e| BlobStoreError::InternalError {
            message: e.to_string(),
        })?;

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| BlobStoreError::ConnectionFailed {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            signer,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            host,
        })
    }

    /// URI-encoded object path; also the canonical URI for signing
    fn object_path(bucket: &str, key: &str) -> Result<String, BlobStoreError> {
        if bucket.is_empty() || key.is_empty() {
            return Err(BlobStoreError::InvalidKey {
                key: format!("{}/{}", bucket, key),
            });
        }

        Ok(format!(
            "/{}/{}",
            urlencoding::encode(bucket),
            urlencoding::encode(key)
        ))
    }

    async fn send(
        &self,
        method: Method,
        bucket: &str,
        key: &str,
        body: Bytes,
    ) -> Result<Bytes, BlobStoreError> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| BlobStoreError::PermissionDenied {
                operation: "No credentials configured".to_string(),
            })?;

        let path = Self::object_path(bucket, key)?;
        let auth_headers = signer
            .sign_request(method.as_str(), &self.host, &path, "", &body, &Utc::now())
            .map_err(|e| BlobStoreError::InternalError {
                message: format!("Failed to sign request: {}", e),
            })?;

        let mut request = self
            .http_client
            .request(method.clone(), format!("{}{}", self.endpoint, path));
        for (name, value) in auth_headers {
            request = request.header(&name, value);
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BlobStoreError::ConnectionFailed {
                message: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BlobStoreError::ConnectionFailed {
                message: format!("Failed to read response body: {}", e),
            })?;

        match status {
            s if s.is_success() => Ok(bytes),
            StatusCode::NOT_FOUND => Err(BlobStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                Err(BlobStoreError::PermissionDenied {
                    operation: format!("{} {}", method, path),
                })
            }
            s => Err(BlobStoreError::InternalError {
                message: format!(
                    "{} {} returned {}: {}",
                    method,
                    path,
                    s,
                    String::from_utf8_lossy(&bytes)
                ),
            }),
        }
    }
}

impl fmt::Debug for S3HttpBlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3HttpBlobStore")
            .field("endpoint", &self.endpoint)
            .field("signed", &self.signer.is_some())
            .finish()
    }
}

#[async_trait]
impl BlobStore for S3HttpBlobStore {
    #[instrument(skip_all, fields(bucket = %bucket, key = %key, size = body.len()))]
    async fn put(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), BlobStoreError> {
        self.send(Method::PUT, bucket, key, body).await?;
        debug!("Stored object");
        Ok(())
    }

    #[instrument(skip_all, fields(bucket = %bucket, key = %key))]
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, BlobStoreError> {
        self.send(Method::GET, bucket, key, Bytes::new()).await
    }

    #[instrument(skip_all, fields(bucket = %bucket, key = %key))]
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), BlobStoreError> {
        match self.send(Method::DELETE, bucket, key, Bytes::new()).await {
            Ok(_) => Ok(()),
            Err(BlobStoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "s3_tests.rs"]
mod tests;
