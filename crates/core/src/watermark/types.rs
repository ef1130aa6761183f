//! Types for the watermark module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One PDF to personalize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkInput {
    /// Local copy of the PDF.
    pub path: PathBuf,
    /// Name the file is uploaded under. The service names its output after it.
    pub file_name: String,
}

impl WatermarkInput {
    /// Input for a product, uploaded as `{slug}.pdf`.
    pub fn for_product(path: impl Into<PathBuf>, slug: &str) -> Self {
        Self {
            path: path.into(),
            file_name: format!("{}.pdf", slug),
        }
    }
}

/// A batch of PDFs to personalize for one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkJob {
    /// Sent in this order.
    pub inputs: Vec<WatermarkInput>,
    /// Customer email stamped on every page.
    pub email: String,
    /// Order reference stamped on every page.
    pub reference: String,
    /// Where the returned ZIP archive is written.
    pub output_path: PathBuf,
}

/// Result of a completed watermark request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkResult {
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    pub duration_ms: u64,
}
