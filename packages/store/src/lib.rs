#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Remote object-store interface for asset-sync.
//!
//! The sync engine only ever needs two operations from the remote side:
//! list the keys under a prefix, and write an object with its headers.
//! [`ObjectStore`] captures that seam; [`S3Store`] implements it against
//! any S3-compatible provider (AWS itself, Cloudflare R2, and friends)
//! and [`memory::MemoryStore`] implements it in-process for tests.
//!
//! # Environment Variables
//!
//! | Variable | Required | Description |
//! |---|---|---|
//! | `ASSET_SYNC_ACCESS_KEY_ID` | Yes | S3-compatible access key |
//! | `ASSET_SYNC_SECRET_ACCESS_KEY` | Yes | S3-compatible secret key |
//! | `ASSET_SYNC_ENDPOINT` | No | Custom endpoint URL for non-AWS providers |
//! | `ASSET_SYNC_REGION` | No | Region name, defaults to `us-east-1` |

pub mod memory;

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::{Credentials, StalledStreamProtectionConfig};
use aws_sdk_s3::types::ObjectCannedAcl;
use chrono::{DateTime, Utc};

/// Errors that can occur during remote-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Missing required environment variable.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: String,
    },

    /// S3 `ListObjectsV2` failed.
    #[error("Failed to list s3://{bucket}/{prefix}: {source}")]
    List {
        /// Bucket name.
        bucket: String,
        /// Key prefix.
        prefix: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// S3 `PutObject` failed.
    #[error("Failed to upload s3://{bucket}/{key}: {source}")]
    Put {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Metadata attached to an uploaded object.
///
/// Objects are always written with a public-read ACL; that part of the
/// policy is fixed and applied by the store implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHeaders {
    /// MIME type resolved from the asset's extension.
    pub content_type: String,
    /// Cache-control directive.
    pub cache_control: String,
    /// Absolute expiry timestamp.
    pub expires: DateTime<Utc>,
    /// `gzip` for compressed variants, absent otherwise.
    pub content_encoding: Option<String>,
}

/// One year, the fixed max-age for every synced asset.
const ONE_YEAR_SECS: i64 = 365 * 24 * 60 * 60;

impl UploadHeaders {
    /// Builds the fixed long-lived header set for an asset.
    ///
    /// Cache-control is `public, max-age=31536000`, expiry is one year
    /// from now, and `Content-Encoding: gzip` is attached only when
    /// `gzip` is set.
    #[must_use]
    pub fn long_lived(content_type: &str, gzip: bool) -> Self {
        Self {
            content_type: content_type.to_string(),
            cache_control: format!("public, max-age={ONE_YEAR_SECS}"),
            expires: Utc::now() + chrono::Duration::seconds(ONE_YEAR_SECS),
            content_encoding: gzip.then(|| "gzip".to_string()),
        }
    }
}

/// Narrow interface the sync engine consumes from the remote store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists all object keys under a prefix.
    ///
    /// Returns full keys, not stripped of the prefix. An empty prefix
    /// lists the whole bucket.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::List`] on remote failures.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Writes an object with the given headers, public-read.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Put`] on remote failures.
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        headers: &UploadHeaders,
    ) -> Result<(), StoreError>;
}

/// [`ObjectStore`] implementation backed by an S3-compatible bucket.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    /// Creates a store for `bucket` from environment credentials.
    ///
    /// Reads `ASSET_SYNC_ACCESS_KEY_ID` and `ASSET_SYNC_SECRET_ACCESS_KEY`,
    /// plus the optional `ASSET_SYNC_ENDPOINT` (path-style addressing is
    /// enabled automatically for custom endpoints) and `ASSET_SYNC_REGION`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingEnv`] if a required variable is unset.
    pub fn from_env(bucket: &str) -> Result<Self, StoreError> {
        let access_key = require_env("ASSET_SYNC_ACCESS_KEY_ID")?;
        let secret_key = require_env("ASSET_SYNC_SECRET_ACCESS_KEY")?;
        let region =
            std::env::var("ASSET_SYNC_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let creds = Credentials::new(&access_key, &secret_key, None, None, "asset-sync-env");

        let mut builder = aws_sdk_s3::Config::builder()
            .region(Region::new(region))
            .credentials_provider(creds)
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled());

        if let Ok(endpoint) = std::env::var("ASSET_SYNC_ENDPOINT") {
            builder = builder.endpoint_url(&endpoint).force_path_style(true);
        }

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        log::info!("Listing s3://{}/{prefix}*", self.bucket);

        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let output = request.send().await.map_err(|e| StoreError::List {
                bucket: self.bucket.clone(),
                prefix: prefix.to_string(),
                source: Box::new(e),
            })?;

            for obj in output.contents() {
                if let Some(key) = obj.key() {
                    keys.push(key.to_string());
                }
            }

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(String::from);
            } else {
                break;
            }
        }

        log::info!("  found {} existing objects", keys.len());
        Ok(keys)
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        headers: &UploadHeaders,
    ) -> Result<(), StoreError> {
        let body = aws_sdk_s3::primitives::ByteStream::from(body);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .acl(ObjectCannedAcl::PublicRead)
            .content_type(&headers.content_type)
            .cache_control(&headers.cache_control)
            .expires(aws_smithy_types::DateTime::from_secs(
                headers.expires.timestamp(),
            ));

        if let Some(encoding) = &headers.content_encoding {
            request = request.content_encoding(encoding);
        }

        request.send().await.map_err(|e| StoreError::Put {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            source: Box::new(e),
        })?;

        log::debug!("  wrote s3://{}/{key}", self.bucket);
        Ok(())
    }
}

/// Reads a required environment variable.
fn require_env(name: &str) -> Result<String, StoreError> {
    std::env::var(name).map_err(|_| StoreError::MissingEnv {
        name: name.to_string(),
    })
}
