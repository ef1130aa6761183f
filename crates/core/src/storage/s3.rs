//! S3-compatible storage client (Cloudflare R2).

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::error::StorageError;
use super::traits::ObjectStorage;
use crate::config::StorageConfig;

/// R2 ignores the region but the signer needs one.
const R2_REGION: &str = "auto";

/// Object storage backed by the AWS S3 SDK.
pub struct S3Storage {
    client: Client,
}

impl S3Storage {
    /// Build a client for the configured endpoint and credentials.
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "fulfillment-config",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(R2_REGION))
            .endpoint_url(config.endpoint.clone())
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    fn name(&self) -> &str {
        "s3"
    }

    async fn download_to_file(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
    ) -> Result<u64, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if not_found {
                    StorageError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StorageError::request_failed(DisplayErrorContext(&e).to_string())
                }
            })?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut body = response.body.into_async_read();
        let bytes = tokio::io::copy(&mut body, &mut file)
            .await
            .map_err(|e| StorageError::body_failed(e.to_string()))?;
        file.flush().await?;

        debug!(bucket, key, bytes, dest = %dest.display(), "Downloaded object");
        Ok(bytes)
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::body_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::request_failed(DisplayErrorContext(&e).to_string()))?;

        debug!(bucket, key, source = %source.display(), "Uploaded object");
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::presign_failed(DisplayErrorContext(&e).to_string()))?;

        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> StorageConfig {
        StorageConfig {
            account_id: "acc".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            endpoint: "https://acc.r2.cloudflarestorage.com".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_presign_is_local_and_scoped_to_object() {
        let storage = S3Storage::new(&test_config());
        let url = storage
            .presign_get("orders", "ord_1.zip", Duration::from_secs(86_400))
            .await
            .unwrap();

        assert!(url.starts_with("https://acc.r2.cloudflarestorage.com/orders/ord_1.zip?"));
        assert!(url.contains("X-Amz-Expires=86400"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn test_presign_rejects_expiry_over_a_week() {
        let storage = S3Storage::new(&test_config());
        let result = storage
            .presign_get("orders", "ord_1.zip", Duration::from_secs(8 * 24 * 3600))
            .await;
        assert!(matches!(result, Err(StorageError::PresignFailed { .. })));
    }
}
