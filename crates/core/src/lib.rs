pub mod config;
pub mod consumer;
pub mod email;
pub mod fulfillment;
pub mod messages;
pub mod metrics;
pub mod queue;
pub mod storage;
pub mod testing;
pub mod watermark;
pub mod workspace;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, SanitizedConfig,
};
pub use consumer::{
    Disposition, DownloadReadyHandler, HandlerError, JobHandler, OrderConfirmationHandler,
    OrderHandler, QueueConsumer,
};
pub use email::{Mailer, MailerError, OutgoingEmail, ResendMailer};
pub use fulfillment::{FulfillmentConfig, FulfillmentError, OrderFulfiller, ProcessResult};
pub use messages::{
    EmailConfirmationMessage, OrderConfirmationMessage, OrderItem, OrderMessage,
    CONFIRMATION_EMAILS_QUEUE, ORDERS_QUEUE, ORDER_CONFIRMATIONS_QUEUE,
};
pub use queue::{
    enqueue, Job, JobQueue, JobState, QueueCounts, QueueError, SendOptions, SqliteJobQueue,
};
pub use storage::{ObjectStorage, S3Storage, StorageError};
pub use watermark::{
    HttpWatermarker, WatermarkError, WatermarkInput, WatermarkJob, Watermarker,
};
pub use workspace::{FulfillmentAttempt, Workspace};
