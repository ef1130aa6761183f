mod api;
mod metrics;
mod state;
mod supervisor;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fulfillment_core::config::CONFIG_PATH_ENV;
use fulfillment_core::{
    load_config, load_config_from_env, validate_config, Config, DownloadReadyHandler,
    FulfillmentConfig, HttpWatermarker, JobHandler, JobQueue, OrderConfirmationHandler,
    OrderFulfiller, OrderHandler, QueueConsumer, ResendMailer, S3Storage, SanitizedConfig,
    SqliteJobQueue, Workspace, CONFIRMATION_EMAILS_QUEUE, ORDERS_QUEUE,
    ORDER_CONFIRMATIONS_QUEUE,
};

use api::create_router;
use state::{AppState, QUEUES};
use supervisor::supervise;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config file read when `FULFILLMENT_CONFIG` is not set, if present.
const DEFAULT_CONFIG_FILE: &str = "fulfillment.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(version = VERSION, "Starting fulfillment worker");

    let config = load()?;
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    let config_json = serde_json::to_string(&sanitized).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        config_hash = &config_hash[..16],
        source_bucket = %config.storage.bucket_name,
        orders_bucket = %config.storage.orders_bucket,
        watermark_url = %config.watermark.url,
        "Configuration loaded successfully"
    );

    // Scratch space, swept of files a crashed run may have left behind
    let workspace = Workspace::create(config.workspace.tmp_dir.clone())
        .await
        .with_context(|| {
            format!(
                "Failed to create temp directory {:?}",
                config.workspace.tmp_dir
            )
        })?;
    let sweep = workspace
        .sweep(Duration::from_secs(config.workspace.max_file_age_secs))
        .await;
    info!(
        files_removed = sweep.files_removed,
        errors = sweep.errors.len(),
        "Startup sweep finished"
    );

    // Job queue
    let database_path = config.queue.database_path();
    let queue = SqliteJobQueue::new(&database_path)
        .with_context(|| format!("Failed to open queue database {:?}", database_path))?
        .with_expire_in(Duration::from_secs(config.queue.expire_in_secs));
    let jobs: Arc<dyn JobQueue> = Arc::new(queue);
    for name in QUEUES {
        jobs.create_queue(name)
            .with_context(|| format!("Failed to create queue {}", name))?;
    }
    let released = jobs
        .release_active()
        .context("Failed to release active jobs")?;
    if released > 0 {
        warn!(released, "Released jobs left active by a previous run");
    }
    info!(path = ?database_path, "Job queue initialized");

    // External services
    let storage = Arc::new(S3Storage::new(&config.storage));
    let watermarker = Arc::new(
        HttpWatermarker::new(&config.watermark).context("Failed to create watermark client")?,
    );
    let mailer =
        Arc::new(ResendMailer::new(&config.email).context("Failed to create email client")?);
    info!(endpoint = %watermarker.endpoint(), "Service clients initialized");

    let fulfiller = Arc::new(OrderFulfiller::new(
        FulfillmentConfig::from(&config),
        storage,
        watermarker,
        Arc::clone(&jobs),
        workspace,
    ));

    // Status server, bound before any job is taken
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&jobs)));
    let app = create_router(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Status server listening on {}", addr);

    let server_stop = CancellationToken::new();
    let server = {
        let stop = server_stop.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await
        })
    };

    // Consumers
    let shutdown = CancellationToken::new();
    let poll_interval = Duration::from_millis(config.queue.poll_interval_ms);
    let mut consumers = JoinSet::new();
    spawn_consumer(
        &mut consumers,
        QueueConsumer::new(
            ORDERS_QUEUE,
            Arc::clone(&jobs),
            OrderHandler::new(fulfiller),
            poll_interval,
        ),
        shutdown.clone(),
    );
    spawn_consumer(
        &mut consumers,
        QueueConsumer::new(
            CONFIRMATION_EMAILS_QUEUE,
            Arc::clone(&jobs),
            DownloadReadyHandler::new(Arc::clone(&mailer), config.email.from_email.clone()),
            poll_interval,
        ),
        shutdown.clone(),
    );
    spawn_consumer(
        &mut consumers,
        QueueConsumer::new(
            ORDER_CONFIRMATIONS_QUEUE,
            Arc::clone(&jobs),
            OrderConfirmationHandler::new(mailer, config.email.from_email.clone()),
            poll_interval,
        ),
        shutdown.clone(),
    );

    let supervised = supervise(consumers, shutdown, shutdown_signal()).await;

    server_stop.cancel();
    server
        .await
        .context("Status server task failed")?
        .context("Server error")?;
    info!("Status server stopped");

    supervised
}

/// Load configuration from `FULFILLMENT_CONFIG`, else `fulfillment.toml` when
/// present, else from the environment alone.
fn load() -> Result<Config> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        info!("Loading configuration from {:?}", path);
        return load_config(&path)
            .with_context(|| format!("Failed to load config from {:?}", path));
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        info!("Loading configuration from {:?}", default_path);
        return load_config(default_path)
            .with_context(|| format!("Failed to load config from {:?}", default_path));
    }

    info!("No configuration file, reading the environment");
    load_config_from_env().context("Failed to load config from environment")
}

fn spawn_consumer<H>(
    consumers: &mut JoinSet<()>,
    consumer: QueueConsumer<H>,
    shutdown: CancellationToken,
) where
    H: JobHandler + 'static,
{
    consumers.spawn(async move { consumer.run(shutdown).await });
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
