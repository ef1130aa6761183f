//! Durable job queue with manual acknowledgment.
//!
//! Jobs are JSON documents addressed to a named queue. A consumer `fetch`es a
//! job (which becomes `active`), then either `complete`s it, `fail`s it (the
//! job is retried according to the options it was sent with) or `discard`s it
//! (terminal failure, never retried). An active job that is never settled is
//! handed out again once it expires, giving at-least-once delivery.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteJobQueue;
pub use store::{enqueue, JobQueue, QueueError};
pub use types::{Job, JobState, QueueCounts, SendOptions};
