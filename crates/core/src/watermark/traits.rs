use async_trait::async_trait;

use super::error::WatermarkError;
use super::types::{WatermarkJob, WatermarkResult};

/// A service that stamps PDFs with buyer details and bundles them.
#[async_trait]
pub trait Watermarker: Send + Sync {
    /// Returns the name of this implementation.
    fn name(&self) -> &str;

    /// Watermarks every input and writes the resulting archive to
    /// `job.output_path`.
    async fn watermark(&self, job: WatermarkJob) -> Result<WatermarkResult, WatermarkError>;
}
