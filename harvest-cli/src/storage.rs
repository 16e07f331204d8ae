//! Result storage
//!
//! The orchestrator only sees the [`ObjectStore`] trait; the S3
//! implementation lives behind it so the run logic stays testable
//! without credentials. Uploads are idempotent-by-key writes (same
//! key overwrites) and are never retried: a failed upload fails the
//! run.

use async_trait::async_trait;
use aws_credential_types::Credentials as AwsCredentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use thiserror::Error;
use tracing::info;

use crate::config::Credentials;

/// Storage errors, fatal for the run
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload of {key} failed: {cause}")]
    Upload { key: String, cause: String },
}

/// Destination for the raw output document.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` under `key`; returns a location descriptor for
    /// reporting (e.g. `s3://bucket/key`).
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// S3-backed store using the static credentials from the run config.
pub struct S3Store {
    bucket: String,
    client: aws_sdk_s3::Client,
}

impl S3Store {
    /// Build a store from the credential blob. Region and key pair
    /// come from configuration only; the ambient AWS environment is
    /// not consulted.
    pub fn new(credentials: &Credentials) -> Self {
        let aws_credentials = AwsCredentials::from_keys(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            None,
        );

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(credentials.region.clone()))
            .credentials_provider(aws_credentials)
            .build();

        Self {
            bucket: credentials.bucket_name.clone(),
            client: aws_sdk_s3::Client::from_conf(config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                cause: e.to_string(),
            })?;

        let location = format!("s3://{}/{}", self.bucket, key);
        info!(location = %location, "uploaded raw output");
        Ok(location)
    }
}
