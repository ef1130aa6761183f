//! Job queue types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry behaviour attached to a job when it is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOptions {
    /// How many times a failed job is handed out again.
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// Delay before a failed job becomes visible again.
    #[serde(default)]
    pub retry_delay_secs: u64,
    /// Double the delay after every failed attempt.
    #[serde(default)]
    pub retry_backoff: bool,
}

fn default_retry_limit() -> u32 {
    2
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            retry_limit: default_retry_limit(),
            retry_delay_secs: 0,
            retry_backoff: false,
        }
    }
}

impl SendOptions {
    /// Delay before the next attempt, given how many retries already happened.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let base = self.retry_delay_secs;
        let secs = if self.retry_backoff {
            base.saturating_mul(1u64 << retry_count.min(16))
        } else {
            base
        };
        Duration::from_secs(secs)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for its first delivery.
    Created,
    /// Failed at least once, waiting for redelivery.
    Retry,
    /// Handed to a consumer, not yet settled.
    Active,
    /// Acknowledged.
    Completed,
    /// Retries exhausted or discarded as unprocessable.
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Created => "created",
            JobState::Retry => "retry",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(JobState::Created),
            "retry" => Some(JobState::Retry),
            "active" => Some(JobState::Active),
            "completed" => Some(JobState::Completed),
            "failed" => Some(JobState::Failed),
            _ => None,
        }
    }

    /// Whether the job is settled for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// A job as stored in the queue.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub queue: String,
    /// Raw JSON payload, exactly as sent.
    pub data: String,
    pub state: JobState,
    /// Number of failed attempts so far.
    pub retry_count: u32,
    pub options: SendOptions,
    pub created_at: DateTime<Utc>,
    /// Earliest time the job may be delivered.
    pub start_after: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Number of jobs per state in one queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub created: u64,
    pub retry: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

impl QueueCounts {
    /// Jobs still waiting to be delivered.
    pub fn pending(&self) -> u64 {
        self.created + self.retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_send_options() {
        let options = SendOptions::default();
        assert_eq!(options.retry_limit, 2);
        assert_eq!(options.delay_for(0), Duration::ZERO);
    }

    #[test]
    fn test_fixed_delay() {
        let options = SendOptions {
            retry_limit: 3,
            retry_delay_secs: 30,
            retry_backoff: false,
        };
        assert_eq!(options.delay_for(0), Duration::from_secs(30));
        assert_eq!(options.delay_for(2), Duration::from_secs(30));
    }

    #[test]
    fn test_exponential_backoff() {
        let options = SendOptions {
            retry_limit: 3,
            retry_delay_secs: 30,
            retry_backoff: true,
        };
        assert_eq!(options.delay_for(0), Duration::from_secs(30));
        assert_eq!(options.delay_for(1), Duration::from_secs(60));
        assert_eq!(options.delay_for(2), Duration::from_secs(120));
    }

    #[test]
    fn test_backoff_saturates() {
        let options = SendOptions {
            retry_limit: 100,
            retry_delay_secs: u64::MAX / 2,
            retry_backoff: true,
        };
        assert_eq!(options.delay_for(40), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_job_state_round_trip() {
        for state in [
            JobState::Created,
            JobState::Retry,
            JobState::Active,
            JobState::Completed,
            JobState::Failed,
        ] {
            assert_eq!(JobState::parse(state.as_str()), Some(state));
        }
        assert_eq!(JobState::parse("bogus"), None);
        assert!(JobState::Completed.is_terminal());
        assert!(!JobState::Retry.is_terminal());
    }
}
