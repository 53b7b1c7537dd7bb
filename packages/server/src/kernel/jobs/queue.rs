//! PostgreSQL-backed job queue implementation.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use super::job::{ErrorKind, Job, JobPriority};

/// Result type for enqueue operations that handles idempotency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    /// Command was enqueued, returns new job ID
    Created(Uuid),
    /// Command already exists (idempotency hit), returns existing job ID
    Duplicate(Uuid),
}

impl EnqueueResult {
    /// Get the job ID regardless of whether it was created or duplicate
    pub fn job_id(&self) -> Uuid {
        match self {
            EnqueueResult::Created(id) | EnqueueResult::Duplicate(id) => *id,
        }
    }

    /// Returns true if this was a newly created job
    pub fn is_created(&self) -> bool {
        matches!(self, EnqueueResult::Created(_))
    }
}

/// A claimed job ready for execution.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: Uuid,
    pub job: Job,
}

impl ClaimedJob {
    /// Deserialize the command payload.
    pub fn deserialize<C: DeserializeOwned>(&self) -> Result<C> {
        serde_json::from_value(self.job.args.clone())
            .map_err(|e| anyhow!("failed to deserialize command: {}", e))
    }

    /// Get the command type (job_type)
    pub fn command_type(&self) -> &str {
        &self.job.job_type
    }
}

/// Metadata for command serialization.
///
/// Commands implement this trait to provide type information
/// and optional idempotency keys.
pub trait CommandMeta {
    /// The command type name (used as job_type).
    fn command_type(&self) -> &'static str;

    /// If provided, only one pending/running job exists with this key.
    fn idempotency_key(&self) -> Option<String> {
        None
    }

    fn priority(&self) -> JobPriority {
        JobPriority::Normal
    }

    fn max_retries(&self) -> i32 {
        3
    }
}

/// A serialized command ready to be stored.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_type: String,
    pub args: serde_json::Value,
    pub run_at: Option<DateTime<Utc>>,
    pub idempotency_key: Option<String>,
    pub priority: JobPriority,
    pub max_retries: i32,
}

impl NewJob {
    pub fn from_command<C>(command: &C, run_at: Option<DateTime<Utc>>) -> Result<Self>
    where
        C: Serialize + CommandMeta,
    {
        Ok(Self {
            job_type: command.command_type().to_string(),
            args: serde_json::to_value(command)?,
            run_at,
            idempotency_key: command.idempotency_key(),
            priority: command.priority(),
            max_retries: command.max_retries(),
        })
    }
}

/// Storage and retrieval of serialized commands for background execution.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Store a serialized command.
    ///
    /// If the job carries an idempotency key and a matching pending/running
    /// job exists, returns `EnqueueResult::Duplicate` with the existing job ID.
    async fn push(&self, job: NewJob) -> Result<EnqueueResult>;

    /// Claim up to `limit` jobs for processing.
    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>>;

    /// Mark a job as successfully completed.
    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()>;

    /// Mark a job as failed with an error.
    ///
    /// If retries remain, the job is re-queued with exponential backoff.
    /// Otherwise, it is moved to dead letter.
    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: ErrorKind) -> Result<()>;

    /// Cancel a pending job.
    async fn cancel(&self, job_id: Uuid) -> Result<bool>;
}

/// Typed enqueue helpers available on every queue, including `dyn JobQueue`.
#[async_trait]
pub trait JobQueueExt: JobQueue {
    /// Enqueue a command for immediate execution.
    async fn enqueue<C>(&self, command: C) -> Result<EnqueueResult>
    where
        C: Serialize + CommandMeta + Send + Sync,
    {
        self.push(NewJob::from_command(&command, None)?).await
    }

    /// Schedule a command for future execution.
    async fn schedule<C>(&self, command: C, run_at: DateTime<Utc>) -> Result<EnqueueResult>
    where
        C: Serialize + CommandMeta + Send + Sync,
    {
        self.push(NewJob::from_command(&command, Some(run_at))?)
            .await
    }
}

impl<Q: JobQueue + ?Sized> JobQueueExt for Q {}

/// PostgreSQL-backed job queue implementation.
#[derive(Clone)]
pub struct PostgresJobQueue {
    db: PgPool,
    default_lease_ms: i64,
}

impl PostgresJobQueue {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            default_lease_ms: 60_000, // 1 minute
        }
    }
}

#[async_trait]
impl JobQueue for PostgresJobQueue {
    async fn push(&self, new_job: NewJob) -> Result<EnqueueResult> {
        // Check idempotency first
        if let Some(key) = &new_job.idempotency_key {
            if let Some(existing) = Job::find_active_by_idempotency_key(key, &self.db).await? {
                return Ok(EnqueueResult::Duplicate(existing.id));
            }
        }

        let mut job = Job::builder()
            .job_type(new_job.job_type)
            .args(new_job.args)
            .priority(new_job.priority)
            .max_retries(new_job.max_retries)
            .build();
        job.next_run_at = new_job.run_at;
        job.idempotency_key = new_job.idempotency_key;

        let inserted = job.insert(&self.db).await?;
        debug!(job_id = %inserted.id, job_type = %inserted.job_type, "job enqueued");

        Ok(EnqueueResult::Created(inserted.id))
    }

    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>> {
        let jobs = Job::claim_jobs(limit, worker_id, self.default_lease_ms, &self.db).await?;

        Ok(jobs
            .into_iter()
            .map(|job| ClaimedJob { id: job.id, job })
            .collect())
    }

    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()> {
        Job::mark_succeeded(job_id, &self.db).await
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: ErrorKind) -> Result<()> {
        let job = Job::find_by_id(job_id, &self.db).await?;

        if kind.should_retry() && job.has_retries_left() {
            let retry_at = Utc::now() + job.retry_delay();
            Job::schedule_retry(job_id, retry_at, error, kind, &self.db).await
        } else {
            let reason = if kind.should_retry() {
                "max retries exceeded"
            } else {
                "non-retryable error"
            };
            warn!(job_id = %job_id, job_type = %job.job_type, reason, "job dead-lettered");
            Job::mark_dead_letter(job_id, error, kind, reason, &self.db).await
        }
    }

    async fn cancel(&self, job_id: Uuid) -> Result<bool> {
        Job::cancel(job_id, &self.db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize)]
    struct PingCommand {
        target: String,
    }

    impl CommandMeta for PingCommand {
        fn command_type(&self) -> &'static str {
            "ping"
        }

        fn idempotency_key(&self) -> Option<String> {
            Some(format!("ping:{}", self.target))
        }
    }

    #[test]
    fn test_enqueue_result_helpers() {
        let created = EnqueueResult::Created(Uuid::new_v4());
        assert!(created.is_created());

        let duplicate = EnqueueResult::Duplicate(Uuid::new_v4());
        assert!(!duplicate.is_created());
    }

    #[test]
    fn test_new_job_from_command() {
        let job = NewJob::from_command(
            &PingCommand {
                target: "a".into(),
            },
            None,
        )
        .unwrap();

        assert_eq!(job.job_type, "ping");
        assert_eq!(job.args, serde_json::json!({ "target": "a" }));
        assert_eq!(job.idempotency_key.as_deref(), Some("ping:a"));
        assert_eq!(job.max_retries, 3);
    }
}
