//! Object storage for published images.
//!
//! [`ImageStore`] is the seam the publisher writes through. The production
//! implementation, [`S3ImageStore`], targets any S3-compatible service
//! (AWS S3, MinIO, Cloudflare R2, Backblaze B2) using path-style addressing.

use crate::config::Settings;
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use thiserror::Error;
use tracing::{debug, info};

/// Content type of every uploaded image.
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// A failed object write.
#[derive(Debug, Error)]
#[error("failed to store object '{key}': {detail}")]
pub struct StoreError {
    pub key: String,
    pub detail: String,
}

/// Destination for normalised PNG images.
///
/// Implementations must store `bytes` at `key` with content type
/// [`PNG_CONTENT_TYPE`] and make the object publicly readable. Writes are
/// expected to be idempotent: re-running a pipeline overwrites the same keys.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put_png(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;
}

/// S3-compatible [`ImageStore`].
#[derive(Clone)]
pub struct S3ImageStore {
    client: Client,
    bucket: String,
}

impl S3ImageStore {
    /// Build a client for the endpoint, credentials and bucket in `settings`.
    ///
    /// No request is made here; credentials are first exercised by the
    /// first upload.
    pub fn new(settings: &Settings, region: impl Into<String>) -> Self {
        let credentials = Credentials::new(
            &settings.access_key_id,
            &settings.secret_access_key,
            None,
            None,
            "paper2md",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&settings.storage_endpoint)
            .region(Region::new(region.into()))
            .credentials_provider(credentials)
            // MinIO and most self-hosted services only support path-style URLs
            .force_path_style(true)
            .build();

        info!(
            "Object storage: bucket '{}' at {}",
            settings.bucket, settings.storage_endpoint
        );

        Self {
            client: Client::from_conf(s3_config),
            bucket: settings.bucket.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn put_png(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(PNG_CONTENT_TYPE)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| StoreError {
                key: key.to_string(),
                detail: DisplayErrorContext(&e).to_string(),
            })?;

        debug!("PUT s3://{}/{} ({} bytes)", self.bucket, key, size);
        Ok(())
    }
}
