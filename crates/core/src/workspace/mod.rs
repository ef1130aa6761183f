//! Local scratch space for in-flight fulfilment files.
//!
//! Downloaded PDFs and watermarked archives live in one directory. Each
//! fulfilment attempt records what it creates in a [`FulfillmentAttempt`] and
//! deletes it all when done; a sweep at startup removes anything an earlier
//! process left behind.

mod attempt;

pub use attempt::{CleanupResult, FulfillmentAttempt};

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{info, warn};

use crate::metrics;

/// Summary of a startup sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepResult {
    pub files_removed: usize,
    pub bytes_removed: u64,
    pub errors: Vec<String>,
}

/// The worker's temp directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open the workspace, creating the directory if needed.
    pub async fn create(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path for a downloaded source asset.
    pub fn asset_path(&self, order_id: &str, slug: &str) -> PathBuf {
        self.root.join(format!(
            "{}-{}.pdf",
            sanitize_component(order_id),
            sanitize_component(slug)
        ))
    }

    /// Local path for the watermarked archive of an order.
    pub fn archive_path(&self, order_id: &str) -> PathBuf {
        self.root
            .join(format!("processed_{}.zip", sanitize_component(order_id)))
    }

    /// Delete regular files last modified more than `max_age` ago.
    ///
    /// Never fails; problems are collected in the result and logged.
    pub async fn sweep(&self, max_age: Duration) -> SweepResult {
        info!(dir = %self.root.display(), "Cleaning up old temporary files");

        let mut result = SweepResult::default();
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to read temp directory");
                result
                    .errors
                    .push(format!("Failed to read {}: {}", self.root.display(), e));
                return result;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    result.errors.push(format!("Failed to list entry: {}", e));
                    break;
                }
            };

            let path = entry.path();
            let meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => continue,
                Err(e) => {
                    result
                        .errors
                        .push(format!("Failed to stat {}: {}", path.display(), e));
                    continue;
                }
            };

            let stale = meta.modified().map(|m| m < cutoff).unwrap_or(false);
            if !stale {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => {
                    info!(
                        file = %entry.file_name().to_string_lossy(),
                        size = %format_kb(meta.len()),
                        "Removed old file"
                    );
                    result.files_removed += 1;
                    result.bytes_removed += meta.len();
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to remove old file");
                    result
                        .errors
                        .push(format!("Failed to remove {}: {}", path.display(), e));
                }
            }
        }

        metrics::TEMP_FILES_REMOVED
            .with_label_values(&["sweep"])
            .inc_by(result.files_removed as u64);

        if result.files_removed == 0 {
            info!("No old files to clean");
        } else {
            info!(count = result.files_removed, "Cleaned up old files");
        }
        result
    }
}

pub(crate) fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

/// Make an identifier safe to embed in a file name.
///
/// Keeps ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_kb() {
        assert_eq!(format_kb(0), "0.0 KB");
        assert_eq!(format_kb(1536), "1.5 KB");
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("comic-a"), "comic-a");
        assert_eq!(sanitize_component("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize_component("cs_test a/b"), "cs_test_a_b");
        assert_eq!(sanitize_component(""), "_");
    }

    #[tokio::test]
    async fn test_paths_stay_inside_root() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::create(dir.path()).await.unwrap();

        let asset = workspace.asset_path("ord/1", "../comic");
        assert_eq!(asset.parent(), Some(dir.path()));
        assert_eq!(asset.file_name().unwrap(), "ord_1-___comic.pdf");

        let archive = workspace.archive_path("ord_1");
        assert_eq!(archive.file_name().unwrap(), "processed_ord_1.zip");
    }

    #[tokio::test]
    async fn test_create_makes_missing_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("tmp");
        Workspace::create(&root).await.unwrap();
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_stale_files() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::create(dir.path()).await.unwrap();

        let old = dir.path().join("old.pdf");
        let fresh = dir.path().join("fresh.pdf");
        std::fs::write(&old, vec![0u8; 2048]).unwrap();
        std::fs::write(&fresh, b"new").unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        let two_hours_ago = SystemTime::now() - Duration::from_secs(2 * 3600);
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(two_hours_ago)
            .unwrap();

        let result = workspace.sweep(Duration::from_secs(3600)).await;
        assert_eq!(result.files_removed, 1);
        assert_eq!(result.bytes_removed, 2048);
        assert!(result.errors.is_empty());
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(dir.path().join("subdir").exists());
    }

    #[tokio::test]
    async fn test_sweep_of_missing_directory_reports_error() {
        let dir = TempDir::new().unwrap();
        let workspace = Workspace::create(dir.path().join("gone")).await.unwrap();
        std::fs::remove_dir(workspace.root()).unwrap();

        let result = workspace.sweep(Duration::from_secs(3600)).await;
        assert_eq!(result.files_removed, 0);
        assert_eq!(result.errors.len(), 1);
    }
}
