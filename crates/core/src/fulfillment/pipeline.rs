//! Order fulfilment pipeline.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::messages::{EmailConfirmationMessage, OrderMessage, CONFIRMATION_EMAILS_QUEUE};
use crate::metrics;
use crate::queue::{enqueue, JobQueue};
use crate::storage::ObjectStorage;
use crate::watermark::{WatermarkInput, WatermarkJob, Watermarker};
use crate::workspace::{FulfillmentAttempt, Workspace};

use super::types::{FulfillmentConfig, FulfillmentError, ProcessResult};

const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Turns a paid order into a download link.
///
/// Steps run strictly in order and the first failure aborts the rest:
/// download each distinct PDF, watermark the batch, upload the archive,
/// presign it, and queue the "download ready" email. Temp files are removed
/// whatever the outcome.
pub struct OrderFulfiller<S: ObjectStorage, W: Watermarker> {
    config: FulfillmentConfig,
    storage: Arc<S>,
    watermarker: Arc<W>,
    jobs: Arc<dyn JobQueue>,
    workspace: Workspace,
}

impl<S: ObjectStorage, W: Watermarker> OrderFulfiller<S, W> {
    pub fn new(
        config: FulfillmentConfig,
        storage: Arc<S>,
        watermarker: Arc<W>,
        jobs: Arc<dyn JobQueue>,
        workspace: Workspace,
    ) -> Self {
        Self {
            config,
            storage,
            watermarker,
            jobs,
            workspace,
        }
    }

    /// Run one fulfilment attempt.
    pub async fn process_order(&self, order: &OrderMessage) -> ProcessResult {
        let start = Instant::now();
        info!(
            order_id = %order.order_id,
            customer = %order.customer_email,
            items = order.items.len(),
            "Processing order"
        );

        let mut attempt = FulfillmentAttempt::new();
        let outcome = self.run(order, &mut attempt).await;

        let cleanup = attempt.cleanup().await;
        if !cleanup.errors.is_empty() {
            warn!(
                order_id = %order.order_id,
                errors = ?cleanup.errors,
                "Some temp files could not be removed"
            );
        }

        let elapsed = start.elapsed().as_secs_f64();
        match outcome {
            Ok(url) => {
                metrics::FULFILLMENT_DURATION
                    .with_label_values(&["success"])
                    .observe(elapsed);
                info!(
                    order_id = %order.order_id,
                    duration_secs = elapsed,
                    "Order processed successfully"
                );
                ProcessResult::succeeded(url)
            }
            Err(e) => {
                metrics::FULFILLMENT_DURATION
                    .with_label_values(&["failure"])
                    .observe(elapsed);
                error!(
                    order_id = %order.order_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Failed to process order"
                );
                ProcessResult::failed(&e)
            }
        }
    }

    async fn run(
        &self,
        order: &OrderMessage,
        attempt: &mut FulfillmentAttempt,
    ) -> Result<String, FulfillmentError> {
        if order.items.is_empty() {
            return Err(FulfillmentError::EmptyOrder);
        }

        let slugs = order.distinct_slugs();
        info!(order_id = %order.order_id, slugs = ?slugs, "Unique PDFs to process");

        let mut inputs = Vec::with_capacity(slugs.len());
        for slug in slugs {
            let path = self.workspace.asset_path(&order.order_id, slug);
            attempt.register(&path);

            let key = format!("{}.pdf", slug);
            self.storage
                .download_to_file(&self.config.source_bucket, &key, &path)
                .await
                .map_err(|source| FulfillmentError::Download {
                    slug: slug.to_string(),
                    source,
                })?;
            metrics::ASSETS_DOWNLOADED.inc();
            info!(order_id = %order.order_id, slug, "Downloaded PDF");

            inputs.push(WatermarkInput::for_product(path, slug));
        }

        let archive_path = self.workspace.archive_path(&order.order_id);
        attempt.register(&archive_path);

        let watermarked = self
            .watermarker
            .watermark(WatermarkJob {
                inputs,
                email: order.customer_email.clone(),
                reference: order.order_id.clone(),
                output_path: archive_path,
            })
            .await?;
        info!(
            order_id = %order.order_id,
            bytes = watermarked.output_size_bytes,
            duration_ms = watermarked.duration_ms,
            "PDFs watermarked"
        );

        let key = format!("{}.zip", order.order_id);
        self.storage
            .upload_file(
                &self.config.orders_bucket,
                &key,
                &watermarked.output_path,
                ARCHIVE_CONTENT_TYPE,
            )
            .await
            .map_err(FulfillmentError::Upload)?;
        info!(order_id = %order.order_id, key = %key, "Uploaded archive");

        let url = self
            .storage
            .presign_get(&self.config.orders_bucket, &key, self.config.url_expiry)
            .await
            .map_err(FulfillmentError::Presign)?;

        let expiry = chrono::Duration::from_std(self.config.url_expiry)
            .unwrap_or_else(|_| chrono::Duration::hours(24));
        let confirmation =
            EmailConfirmationMessage::from_order(order, url.clone(), Utc::now() + expiry);
        let job_id = enqueue(
            self.jobs.as_ref(),
            CONFIRMATION_EMAILS_QUEUE,
            &confirmation,
            &self.config.confirmation_retry,
        )?;
        info!(
            order_id = %order.order_id,
            job_id = %job_id,
            customer = %order.customer_email,
            "Confirmation email queued"
        );

        Ok(url)
    }
}
