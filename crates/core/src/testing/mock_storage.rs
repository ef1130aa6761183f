//! Mock object storage for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::storage::{ObjectStorage, StorageError};

/// A recorded upload for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// In-memory implementation of the ObjectStorage trait.
///
/// Objects are seeded with [`put_object`](Self::put_object). Downloads of
/// unknown keys fail with `NotFound`. A failing download still writes a few
/// bytes to the destination first, like a transfer cut off midway.
#[derive(Debug, Default)]
pub struct MockObjectStorage {
    objects: Arc<RwLock<HashMap<(String, String), Vec<u8>>>>,
    downloads: Arc<RwLock<Vec<(String, String)>>>,
    uploads: Arc<RwLock<Vec<RecordedUpload>>>,
    download_errors: Arc<RwLock<HashMap<String, StorageError>>>,
    next_upload_error: Arc<RwLock<Option<StorageError>>>,
    next_presign_error: Arc<RwLock<Option<StorageError>>>,
    presign_counter: AtomicU64,
}

impl MockObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object.
    pub async fn put_object(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), key.to_string()), data.into());
    }

    /// Make the next download of `key` fail with `error`.
    pub async fn fail_next_download(&self, key: &str, error: StorageError) {
        self.download_errors
            .write()
            .await
            .insert(key.to_string(), error);
    }

    /// Make the next upload fail with `error`.
    pub async fn fail_next_upload(&self, error: StorageError) {
        *self.next_upload_error.write().await = Some(error);
    }

    /// Make the next presign fail with `error`.
    pub async fn fail_next_presign(&self, error: StorageError) {
        *self.next_presign_error.write().await = Some(error);
    }

    /// Every download attempted, as `(bucket, key)`.
    pub async fn recorded_downloads(&self) -> Vec<(String, String)> {
        self.downloads.read().await.clone()
    }

    pub async fn download_count(&self) -> usize {
        self.downloads.read().await.len()
    }

    /// Every successful upload.
    pub async fn recorded_uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().await.clone()
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ObjectStorage for MockObjectStorage {
    fn name(&self) -> &str {
        "mock"
    }

    async fn download_to_file(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
    ) -> Result<u64, StorageError> {
        self.downloads
            .write()
            .await
            .push((bucket.to_string(), key.to_string()));

        if let Some(err) = self.download_errors.write().await.remove(key) {
            tokio::fs::write(dest, b"%PDF-partial").await?;
            return Err(err);
        }

        let data = self
            .objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;

        tokio::fs::write(dest, &data).await?;
        Ok(data.len() as u64)
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> Result<(), StorageError> {
        if let Some(err) = self.next_upload_error.write().await.take() {
            return Err(err);
        }

        let data = tokio::fs::read(source).await?;
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), key.to_string()), data.clone());
        self.uploads.write().await.push(RecordedUpload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            data,
        });
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        if let Some(err) = self.next_presign_error.write().await.take() {
            return Err(err);
        }

        let n = self.presign_counter.fetch_add(1, Ordering::Relaxed);
        Ok(format!(
            "https://storage.mock/{}/{}?X-Amz-Expires={}&X-Amz-Signature=sig{}",
            bucket,
            key,
            expires_in.as_secs(),
            n
        ))
    }
}
