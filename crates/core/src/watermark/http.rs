//! HTTP client for the PDF watermarking service.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{multipart, Body, Client};
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::error::WatermarkError;
use super::traits::Watermarker;
use super::types::{WatermarkJob, WatermarkResult};
use crate::config::WatermarkConfig;

const WATERMARK_PATH: &str = "/api/watermark";

/// Longest error body kept from a rejected request.
const MAX_ERROR_BODY: usize = 1024;

/// Watermarker that posts PDFs to the watermark service as multipart form
/// data and streams the ZIP response to disk.
pub struct HttpWatermarker {
    client: Client,
    endpoint: String,
}

impl HttpWatermarker {
    pub fn new(config: &WatermarkConfig) -> Result<Self, WatermarkError> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder.build().map_err(WatermarkError::from_reqwest)?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", config.url.trim_end_matches('/'), WATERMARK_PATH),
        })
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn build_form(&self, job: &WatermarkJob) -> Result<multipart::Form, WatermarkError> {
        let mut form = multipart::Form::new();

        for input in &job.inputs {
            let unreadable = |source| WatermarkError::InputUnreadable {
                path: input.path.clone(),
                source,
            };
            let file = File::open(&input.path).await.map_err(unreadable)?;
            let len = file.metadata().await.map_err(unreadable)?.len();

            let part = multipart::Part::stream_with_length(
                Body::wrap_stream(ReaderStream::new(file)),
                len,
            )
            .file_name(input.file_name.clone())
            .mime_str("application/pdf")
            .map_err(WatermarkError::from_reqwest)?;

            form = form.part("pdfs", part);
        }

        Ok(form
            .text("email", job.email.clone())
            .text("reference", job.reference.clone()))
    }
}

#[async_trait]
impl Watermarker for HttpWatermarker {
    fn name(&self) -> &str {
        "http"
    }

    async fn watermark(&self, job: WatermarkJob) -> Result<WatermarkResult, WatermarkError> {
        if job.inputs.is_empty() {
            return Err(WatermarkError::NoInputFiles);
        }

        let start = Instant::now();
        info!(
            files = job.inputs.len(),
            reference = %job.reference,
            "Processing PDFs with watermark service"
        );

        let form = self.build_form(&job).await?;
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(WatermarkError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(WatermarkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let mut file = File::create(&job.output_path).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(WatermarkError::from_reqwest)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(WatermarkError::EmptyResponse);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            output = %job.output_path.display(),
            bytes = written,
            duration_ms,
            "Watermarked archive saved"
        );

        Ok(WatermarkResult {
            output_path: job.output_path,
            output_size_bytes: written,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::WatermarkInput;
    use std::path::PathBuf;

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = WatermarkConfig {
            url: "http://watermark:8000/".to_string(),
            timeout_secs: 0,
        };
        let watermarker = HttpWatermarker::new(&config).unwrap();
        assert_eq!(watermarker.endpoint(), "http://watermark:8000/api/watermark");
    }

    #[tokio::test]
    async fn test_empty_job_is_rejected_locally() {
        let watermarker = HttpWatermarker::new(&WatermarkConfig::default()).unwrap();
        let job = WatermarkJob {
            inputs: vec![],
            email: "a@b.c".to_string(),
            reference: "ord_1".to_string(),
            output_path: PathBuf::from("/nonexistent/out.zip"),
        };
        let result = watermarker.watermark(job).await;
        assert!(matches!(result, Err(WatermarkError::NoInputFiles)));
    }

    #[tokio::test]
    async fn test_missing_input_is_reported() {
        let watermarker = HttpWatermarker::new(&WatermarkConfig::default()).unwrap();
        let job = WatermarkJob {
            inputs: vec![WatermarkInput::for_product("/nonexistent/ord_1-comic-a.pdf", "comic-a")],
            email: "a@b.c".to_string(),
            reference: "ord_1".to_string(),
            output_path: PathBuf::from("/nonexistent/out.zip"),
        };
        let result = watermarker.watermark(job).await;
        assert!(matches!(result, Err(WatermarkError::InputUnreadable { .. })));
    }
}
