//! S3-compatible object store access
//!
//! Works against MinIO or any other S3-compatible endpoint: static
//! credentials, explicit endpoint URL and path-style addressing.

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{canonical_url, ObjectInfo};

/// Storage backend for uploaded media
#[derive(Clone)]
pub struct ObjectStore {
    client: S3Client,
    bucket: String,
    public_base_url: String,
}

impl ObjectStore {
    /// Build a client for the configured endpoint. No network traffic
    /// happens here; the first request is what actually connects.
    pub async fn connect(config: &Config) -> Result<Self> {
        let endpoint = if config.s3_endpoint.ends_with('/') {
            config.s3_endpoint.clone()
        } else {
            format!("{}/", config.s3_endpoint)
        };

        let base_config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region("auto")
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                config.s3_access_key.clone(),
                config.s3_secret_key.clone(),
                None,
                None,
                "static",
            ))
            .load()
            .await;

        let s3_config = S3ConfigBuilder::from(&base_config)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.clone(),
        })
    }

    /// Create the configured bucket if it does not exist yet
    pub async fn ensure_bucket(&self) -> Result<()> {
        match self
            .client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
        {
            Ok(_) => {
                info!("Created bucket: {}", self.bucket);
                Ok(())
            }
            Err(err) => {
                let already_there = err
                    .as_service_error()
                    .map(|e| e.is_bucket_already_exists() || e.is_bucket_already_owned_by_you())
                    .unwrap_or(false);

                if already_there {
                    debug!("Bucket already exists: {}", self.bucket);
                    Ok(())
                } else {
                    Err(err).with_context(|| format!("Failed to create bucket: {}", self.bucket))
                }
            }
        }
    }

    /// Store an object
    pub async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data.to_vec()))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("Failed to store object: {}", key))?;

        info!("Stored object: {} ({})", key, content_type);
        Ok(())
    }

    /// Look up an object's metadata; `None` if it does not exist
    pub async fn stat(&self, key: &str) -> Result<Option<ObjectInfo>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(head) => Ok(Some(ObjectInfo {
                content_type: head.content_type().map(str::to_string),
                size: head.content_length().unwrap_or(0),
            })),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false);

                if not_found {
                    Ok(None)
                } else {
                    Err(err).with_context(|| format!("Failed to stat object: {}", key))
                }
            }
        }
    }

    /// Delete an object
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to delete object: {}", key))?;

        info!("Deleted object: {}", key);
        Ok(())
    }

    /// Canonical retrieval URL for a stored object
    pub fn object_url(&self, key: &str) -> String {
        canonical_url(&self.public_base_url, &self.bucket, key)
    }
}
