//! Trait definitions for the storage module.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::error::StorageError;

/// An S3-compatible object store.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Returns the name of this storage implementation.
    fn name(&self) -> &str;

    /// Streams `bucket/key` into the file at `dest`, creating or truncating it.
    ///
    /// Returns the number of bytes written.
    async fn download_to_file(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
    ) -> Result<u64, StorageError>;

    /// Uploads the file at `source` to `bucket/key`.
    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Produces a time-limited GET URL for `bucket/key`.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError>;
}
