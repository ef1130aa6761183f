//! SQLite-backed job queue implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, warn};

use super::{Job, JobQueue, JobState, QueueCounts, QueueError, SendOptions};

/// Default time an active job may stay unsettled before it is redelivered.
const DEFAULT_EXPIRE_IN: Duration = Duration::from_secs(15 * 60);

const JOB_COLUMNS: &str = "id, queue, data, state, retry_count, retry_limit, retry_delay_secs, \
     retry_backoff, created_at, start_after, started_at, completed_at, last_error";

/// SQLite-backed job queue.
///
/// All operations run inside a single connection guarded by a mutex, so
/// fetching and settling a job are atomic with respect to other consumers
/// in the same process.
pub struct SqliteJobQueue {
    conn: Mutex<Connection>,
    expire_in: Duration,
}

impl SqliteJobQueue {
    /// Open (or create) a queue database at `path`.
    pub fn new(path: &Path) -> Result<Self, QueueError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            expire_in: DEFAULT_EXPIRE_IN,
        })
    }

    /// Create an in-memory queue (useful for testing).
    pub fn in_memory() -> Result<Self, QueueError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            expire_in: DEFAULT_EXPIRE_IN,
        })
    }

    /// Sets how long an active job may stay unsettled.
    pub fn with_expire_in(mut self, expire_in: Duration) -> Self {
        self.expire_in = expire_in;
        self
    }

    fn initialize_schema(conn: &Connection) -> Result<(), QueueError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS queues (
                name TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                queue TEXT NOT NULL,
                data TEXT NOT NULL,
                state TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                retry_limit INTEGER NOT NULL,
                retry_delay_secs INTEGER NOT NULL,
                retry_backoff INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                start_after INTEGER NOT NULL,
                started_at INTEGER,
                completed_at INTEGER,
                last_error TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_fetch ON jobs(queue, state, start_after);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, QueueError> {
        self.conn
            .lock()
            .map_err(|_| QueueError::Database("queue connection lock poisoned".to_string()))
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn to_datetime(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap_or_default()
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let state_str: String = row.get(3)?;
        let started_at: Option<i64> = row.get(10)?;
        let completed_at: Option<i64> = row.get(11)?;

        Ok(Job {
            id: row.get(0)?,
            queue: row.get(1)?,
            data: row.get(2)?,
            // Unknown states only come from manual edits; treat them as failed
            state: JobState::parse(&state_str).unwrap_or(JobState::Failed),
            retry_count: row.get(4)?,
            options: SendOptions {
                retry_limit: row.get(5)?,
                retry_delay_secs: row.get::<_, i64>(6)?.max(0) as u64,
                retry_backoff: row.get(7)?,
            },
            created_at: Self::to_datetime(row.get(8)?),
            start_after: Self::to_datetime(row.get(9)?),
            started_at: started_at.map(Self::to_datetime),
            completed_at: completed_at.map(Self::to_datetime),
            last_error: row.get(12)?,
        })
    }

    fn get_in(tx: &Transaction<'_>, job_id: &str) -> Result<Option<Job>, QueueError> {
        let job = tx
            .query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS),
                params![job_id],
                Self::row_to_job,
            )
            .optional()?;
        Ok(job)
    }

    fn get_active(tx: &Transaction<'_>, job_id: &str) -> Result<Job, QueueError> {
        let job = Self::get_in(tx, job_id)?
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;
        if job.state != JobState::Active {
            return Err(QueueError::NotActive {
                job_id: job_id.to_string(),
                state: job.state.as_str().to_string(),
            });
        }
        Ok(job)
    }

    /// Apply the failure transition to an active job: back to `retry` while
    /// retries remain, `failed` otherwise.
    fn record_failure(
        tx: &Transaction<'_>,
        job: &Job,
        error: &str,
        now: i64,
    ) -> Result<JobState, QueueError> {
        if job.retry_count < job.options.retry_limit {
            let delay = job.options.delay_for(job.retry_count);
            let start_after = now.saturating_add(delay.as_millis().min(i64::MAX as u128) as i64);
            tx.execute(
                "UPDATE jobs SET state = ?1, retry_count = ?2, start_after = ?3, started_at = NULL, last_error = ?4 WHERE id = ?5",
                params![
                    JobState::Retry.as_str(),
                    job.retry_count + 1,
                    start_after,
                    error,
                    job.id,
                ],
            )?;
            Ok(JobState::Retry)
        } else {
            tx.execute(
                "UPDATE jobs SET state = ?1, completed_at = ?2, last_error = ?3 WHERE id = ?4",
                params![JobState::Failed.as_str(), now, error, job.id],
            )?;
            Ok(JobState::Failed)
        }
    }

    /// Treat active jobs whose consumer went silent as failed attempts.
    fn expire_stale(
        tx: &Transaction<'_>,
        queue: &str,
        now: i64,
        expire_ms: i64,
    ) -> Result<(), QueueError> {
        let cutoff = now.saturating_sub(expire_ms);
        let stale: Vec<Job> = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM jobs WHERE queue = ? AND state = 'active' AND started_at <= ?",
                JOB_COLUMNS
            ))?;
            let rows = stmt.query_map(params![queue, cutoff], Self::row_to_job)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        for job in stale {
            let state = Self::record_failure(tx, &job, "job expired before it was settled", now)?;
            warn!(job_id = %job.id, queue, state = state.as_str(), "Expired active job");
        }
        Ok(())
    }
}

impl JobQueue for SqliteJobQueue {
    fn create_queue(&self, name: &str) -> Result<(), QueueError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO queues (name, created_at) VALUES (?, ?)",
            params![name, Self::now_ms()],
        )?;
        Ok(())
    }

    fn send(&self, queue: &str, data: &str, options: &SendOptions) -> Result<String, QueueError> {
        let conn = self.lock()?;

        let known: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM queues WHERE name = ?)",
            params![queue],
            |row| row.get(0),
        )?;
        if !known {
            return Err(QueueError::UnknownQueue(queue.to_string()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Self::now_ms();
        conn.execute(
            "INSERT INTO jobs (id, queue, data, state, retry_count, retry_limit, retry_delay_secs, retry_backoff, created_at, start_after) VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?, ?)",
            params![
                id,
                queue,
                data,
                JobState::Created.as_str(),
                options.retry_limit,
                options.retry_delay_secs.min(i64::MAX as u64) as i64,
                options.retry_backoff,
                now,
                now,
            ],
        )?;

        debug!(job_id = %id, queue, "Job sent");
        Ok(id)
    }

    fn fetch(&self, queue: &str) -> Result<Option<Job>, QueueError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Self::now_ms();

        let expire_ms = self.expire_in.as_millis().min(i64::MAX as u128) as i64;
        Self::expire_stale(&tx, queue, now, expire_ms)?;

        let job = tx
            .query_row(
                &format!(
                    "SELECT {} FROM jobs WHERE queue = ? AND state IN ('created', 'retry') AND start_after <= ? ORDER BY created_at, rowid LIMIT 1",
                    JOB_COLUMNS
                ),
                params![queue, now],
                Self::row_to_job,
            )
            .optional()?;

        let job = match job {
            Some(mut job) => {
                tx.execute(
                    "UPDATE jobs SET state = ?1, started_at = ?2 WHERE id = ?3",
                    params![JobState::Active.as_str(), now, job.id],
                )?;
                job.state = JobState::Active;
                job.started_at = Some(Self::to_datetime(now));
                Some(job)
            }
            None => None,
        };

        tx.commit()?;
        Ok(job)
    }

    fn complete(&self, job_id: &str) -> Result<(), QueueError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::get_active(&tx, job_id)?;
        tx.execute(
            "UPDATE jobs SET state = ?1, completed_at = ?2 WHERE id = ?3",
            params![JobState::Completed.as_str(), Self::now_ms(), job_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn fail(&self, job_id: &str, error: &str) -> Result<JobState, QueueError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let job = Self::get_active(&tx, job_id)?;
        let state = Self::record_failure(&tx, &job, error, Self::now_ms())?;
        tx.commit()?;
        Ok(state)
    }

    fn discard(&self, job_id: &str, error: &str) -> Result<(), QueueError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::get_active(&tx, job_id)?;
        tx.execute(
            "UPDATE jobs SET state = ?1, completed_at = ?2, last_error = ?3 WHERE id = ?4",
            params![JobState::Failed.as_str(), Self::now_ms(), error, job_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn release_active(&self) -> Result<usize, QueueError> {
        let conn = self.lock()?;
        let released = conn.execute(
            "UPDATE jobs SET state = ?1, started_at = NULL, start_after = ?2 WHERE state = 'active'",
            params![JobState::Retry.as_str(), Self::now_ms()],
        )?;
        Ok(released)
    }

    fn get(&self, job_id: &str) -> Result<Option<Job>, QueueError> {
        let conn = self.lock()?;
        let job = conn
            .query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS),
                params![job_id],
                Self::row_to_job,
            )
            .optional()?;
        Ok(job)
    }

    fn counts(&self, queue: &str) -> Result<QueueCounts, QueueError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT state, COUNT(*) FROM jobs WHERE queue = ? GROUP BY state")?;
        let rows = stmt.query_map(params![queue], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = QueueCounts::default();
        for row in rows {
            let (state, count) = row?;
            let count = count.max(0) as u64;
            match JobState::parse(&state) {
                Some(JobState::Created) => counts.created = count,
                Some(JobState::Retry) => counts.retry = count,
                Some(JobState::Active) => counts.active = count,
                Some(JobState::Completed) => counts.completed = count,
                Some(JobState::Failed) | None => counts.failed += count,
            }
        }
        Ok(counts)
    }
}
