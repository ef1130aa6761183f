//! Mock watermarker for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::watermark::{WatermarkError, WatermarkJob, WatermarkResult, Watermarker};

/// A recorded watermark call.
#[derive(Debug, Clone)]
pub struct RecordedWatermark {
    pub job: WatermarkJob,
    /// Contents of each input, read when the call was made.
    pub inputs: Vec<Vec<u8>>,
}

/// Mock implementation of the Watermarker trait.
///
/// Writes a fake archive made of the inputs' bytes to the output path.
#[derive(Debug, Default)]
pub struct MockWatermarker {
    calls: Arc<RwLock<Vec<RecordedWatermark>>>,
    next_error: Arc<RwLock<Option<WatermarkError>>>,
}

impl MockWatermarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: WatermarkError) {
        *self.next_error.write().await = Some(error);
    }

    /// Configure the next call to be rejected with an HTTP status.
    pub async fn reject_next(&self, status: u16, body: &str) {
        self.set_next_error(WatermarkError::Rejected {
            status,
            body: body.to_string(),
        })
        .await;
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedWatermark> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl Watermarker for MockWatermarker {
    fn name(&self) -> &str {
        "mock"
    }

    async fn watermark(&self, job: WatermarkJob) -> Result<WatermarkResult, WatermarkError> {
        let mut inputs = Vec::with_capacity(job.inputs.len());
        for input in &job.inputs {
            let data = tokio::fs::read(&input.path).await.map_err(|source| {
                WatermarkError::InputUnreadable {
                    path: input.path.clone(),
                    source,
                }
            })?;
            inputs.push(data);
        }

        self.calls.write().await.push(RecordedWatermark {
            job: job.clone(),
            inputs: inputs.clone(),
        });

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let mut archive = b"PK\x03\x04".to_vec();
        for data in &inputs {
            archive.extend_from_slice(data);
        }
        tokio::fs::write(&job.output_path, &archive).await?;

        Ok(WatermarkResult {
            output_path: job.output_path,
            output_size_bytes: archive.len() as u64,
            duration_ms: 1,
        })
    }
}
