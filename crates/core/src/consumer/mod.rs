//! Queue consumers.
//!
//! One [`QueueConsumer`] per queue, each generic over the [`JobHandler`] that
//! decodes and processes its payload. A consumer holds at most one job in
//! flight and settles it before fetching the next:
//!
//! - handler success: the job is completed
//! - retryable failure: the job is failed and the queue's retry policy applies
//! - terminal failure or undecodable payload: the job is discarded

mod handler;
mod handlers;
mod runner;

pub use handler::{HandlerError, JobHandler};
pub use handlers::{DownloadReadyHandler, OrderConfirmationHandler, OrderHandler};
pub use runner::{Disposition, QueueConsumer};
