//! Keeps the consumer tasks under watch until shutdown.

use std::future::Future;

use anyhow::{bail, Result};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Run until `signal` resolves or a consumer exits on its own, then cancel
/// `shutdown` and wait for the remaining consumers.
///
/// Consumers only return once cancelled, so one that finishes first has
/// panicked or stopped unexpectedly, and the worker must not keep running
/// without it. Returns an error if any consumer failed.
pub async fn supervise<F>(
    mut consumers: JoinSet<()>,
    shutdown: CancellationToken,
    signal: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let mut failed = 0;

    tokio::select! {
        _ = signal => {
            info!("Shutdown requested, waiting for in-flight jobs");
        }
        Some(result) = consumers.join_next() => {
            match result {
                Ok(()) => error!("Consumer stopped unexpectedly"),
                Err(e) => error!(error = %e, "Consumer task failed"),
            }
            failed += 1;
            info!("Stopping the remaining consumers");
        }
    }
    shutdown.cancel();

    while let Some(result) = consumers.join_next().await {
        if let Err(e) = result {
            error!(error = %e, "Consumer task failed");
            failed += 1;
        }
    }
    info!("Consumers stopped");

    if failed > 0 {
        bail!("{} consumer task(s) failed", failed);
    }
    Ok(())
}
