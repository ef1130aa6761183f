use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::format_kb;
use crate::metrics;

/// Outcome of deleting an attempt's files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupResult {
    pub files_removed: usize,
    pub files_missing: usize,
    pub bytes_removed: u64,
    pub errors: Vec<String>,
}

/// Temp files created while fulfilling one order.
///
/// Register a path before anything is written to it. [`cleanup`] consumes the
/// attempt, so each registered path gets exactly one deletion attempt.
///
/// [`cleanup`]: FulfillmentAttempt::cleanup
#[derive(Debug, Default)]
pub struct FulfillmentAttempt {
    paths: Vec<PathBuf>,
}

impl FulfillmentAttempt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `path` for deletion. Registering the same path twice is a no-op.
    pub fn register(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// Delete every registered file. Never fails.
    pub async fn cleanup(self) -> CleanupResult {
        let mut result = CleanupResult::default();
        if self.paths.is_empty() {
            return result;
        }

        debug!(count = self.paths.len(), "Starting cleanup of temp files");

        for path in &self.paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let size = match fs::metadata(path).await {
                Ok(meta) => meta.len(),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(file = %name, "File not found for cleanup");
                    result.files_missing += 1;
                    continue;
                }
                Err(_) => 0,
            };

            match fs::remove_file(path).await {
                Ok(()) => {
                    info!(file = %name, size = %format_kb(size), "Cleaned up");
                    result.files_removed += 1;
                    result.bytes_removed += size;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    result.files_missing += 1;
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to clean up");
                    result
                        .errors
                        .push(format!("Failed to remove {}: {}", path.display(), e));
                }
            }
        }

        metrics::TEMP_FILES_REMOVED
            .with_label_values(&["attempt"])
            .inc_by(result.files_removed as u64);

        result
    }
}
