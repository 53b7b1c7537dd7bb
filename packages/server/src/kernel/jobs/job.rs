//! Job model for background command execution.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use typed_builder::TypedBuilder;
use uuid::Uuid;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    DeadLetter,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_priority", rename_all = "snake_case")]
pub enum JobPriority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "error_kind", rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transient error - will retry if attempts remain
    #[default]
    Retryable,
    /// Permanent error - will not retry
    NonRetryable,
    /// Job was cancelled by user/system
    Cancelled,
    /// Job was interrupted by graceful shutdown - will retry
    Shutdown,
}

impl ErrorKind {
    /// Whether this error kind should trigger a retry
    pub fn should_retry(&self) -> bool {
        matches!(self, ErrorKind::Retryable | ErrorKind::Shutdown)
    }
}

// ============================================================================
// Job Model
// ============================================================================

const JOB_COLUMNS: &str = "id, job_type, args, status, priority, max_retries, retry_count, \
     next_run_at, last_run_at, lease_expires_at, worker_id, error_message, error_kind, \
     dead_lettered_at, dead_letter_reason, idempotency_key, created_at, updated_at";

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Job {
    #[builder(default = Uuid::now_v7())]
    pub id: Uuid,
    pub job_type: String,
    pub args: serde_json::Value,

    #[builder(default)]
    pub status: JobStatus,
    #[builder(default)]
    pub priority: JobPriority,

    #[builder(default = 3)]
    pub max_retries: i32,
    #[builder(default = 0)]
    pub retry_count: i32,

    #[builder(default, setter(strip_option))]
    pub next_run_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub last_run_at: Option<DateTime<Utc>>,

    // Lease management
    #[builder(default, setter(strip_option))]
    pub lease_expires_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub worker_id: Option<String>,

    // Error tracking
    #[builder(default, setter(strip_option))]
    pub error_message: Option<String>,
    #[builder(default, setter(strip_option))]
    pub error_kind: Option<ErrorKind>,
    #[builder(default, setter(strip_option))]
    pub dead_lettered_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub dead_letter_reason: Option<String>,

    #[builder(default, setter(strip_option))]
    pub idempotency_key: Option<String>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Check if the job is ready to run
    pub fn is_ready(&self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }

        match self.next_run_at {
            None => true,
            Some(next_run) => next_run <= Utc::now(),
        }
    }

    /// Exponential backoff for the next retry: 2^retry_count seconds, capped at one hour.
    pub fn retry_delay(&self) -> chrono::Duration {
        let exponent = self.retry_count.clamp(0, 12) as u32;
        chrono::Duration::seconds(2i64.pow(exponent).min(3600))
    }

    pub fn has_retries_left(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub async fn insert(&self, db: &PgPool) -> Result<Self> {
        let query = format!(
            r#"
            INSERT INTO jobs (
                id, job_type, args, status, priority, max_retries, retry_count,
                next_run_at, idempotency_key, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {JOB_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Self>(&query)
            .bind(self.id)
            .bind(&self.job_type)
            .bind(&self.args)
            .bind(self.status)
            .bind(self.priority)
            .bind(self.max_retries)
            .bind(self.retry_count)
            .bind(self.next_run_at)
            .bind(&self.idempotency_key)
            .bind(self.created_at)
            .bind(self.updated_at)
            .fetch_one(db)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, db: &PgPool) -> Result<Self> {
        let query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Self>(&query)
            .bind(id)
            .fetch_one(db)
            .await
            .map_err(Into::into)
    }

    /// A pending or running job carrying the given idempotency key.
    pub async fn find_active_by_idempotency_key(key: &str, db: &PgPool) -> Result<Option<Self>> {
        let query = format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs
            WHERE idempotency_key = $1
              AND status IN ('pending', 'running')
            LIMIT 1
            "#
        );
        sqlx::query_as::<_, Self>(&query)
            .bind(key)
            .fetch_optional(db)
            .await
            .map_err(Into::into)
    }

    /// Claim jobs atomically using FOR UPDATE SKIP LOCKED.
    /// Also recovers running jobs whose lease has expired.
    pub async fn claim_jobs(
        limit: i64,
        worker_id: &str,
        lease_duration_ms: i64,
        db: &PgPool,
    ) -> Result<Vec<Self>> {
        let query = format!(
            r#"
            WITH next_jobs AS (
                SELECT id
                FROM jobs
                WHERE
                    (status = 'pending' AND (next_run_at IS NULL OR next_run_at <= NOW()))
                    OR (status = 'running' AND lease_expires_at < NOW())
                ORDER BY priority, COALESCE(next_run_at, created_at)
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE jobs
            SET
                status = 'running',
                last_run_at = NOW(),
                lease_expires_at = NOW() + ($2 || ' milliseconds')::INTERVAL,
                worker_id = $3,
                updated_at = NOW()
            WHERE id IN (SELECT id FROM next_jobs)
            RETURNING {JOB_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Self>(&query)
            .bind(limit)
            .bind(lease_duration_ms.to_string())
            .bind(worker_id)
            .fetch_all(db)
            .await
            .map_err(Into::into)
    }

    pub async fn mark_succeeded(id: Uuid, db: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'succeeded',
                lease_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;

        Ok(())
    }

    /// Put the job back in the queue for another attempt at `retry_at`.
    pub async fn schedule_retry(
        id: Uuid,
        retry_at: DateTime<Utc>,
        error: &str,
        kind: ErrorKind,
        db: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'pending',
                retry_count = retry_count + 1,
                next_run_at = $2,
                error_message = $3,
                error_kind = $4,
                lease_expires_at = NULL,
                worker_id = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(retry_at)
        .bind(error)
        .bind(kind)
        .execute(db)
        .await?;

        Ok(())
    }

    pub async fn mark_dead_letter(
        id: Uuid,
        error: &str,
        kind: ErrorKind,
        reason: &str,
        db: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'dead_letter',
                error_message = $2,
                error_kind = $3,
                dead_lettered_at = NOW(),
                dead_letter_reason = $4,
                lease_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(kind)
        .bind(reason)
        .execute(db)
        .await?;

        Ok(())
    }

    pub async fn cancel(id: Uuid, db: &PgPool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'cancelled',
                error_kind = 'cancelled',
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> Job {
        Job::builder()
            .job_type("test_job")
            .args(serde_json::json!({}))
            .build()
    }

    #[test]
    fn new_job_has_default_max_retries_of_3() {
        let job = sample_job();
        assert_eq!(job.max_retries, 3);
        assert_eq!(job.retry_count, 0);
        assert!(job.has_retries_left());
    }

    #[test]
    fn new_job_starts_pending_with_normal_priority() {
        let job = sample_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.priority, JobPriority::Normal);
    }

    #[test]
    fn is_ready_pending_job_without_schedule() {
        assert!(sample_job().is_ready());
    }

    #[test]
    fn is_ready_future_job_is_not_ready() {
        let mut job = sample_job();
        job.next_run_at = Some(Utc::now() + chrono::Duration::minutes(5));
        assert!(!job.is_ready());
    }

    #[test]
    fn is_ready_running_job_is_not_ready() {
        let mut job = sample_job();
        job.status = JobStatus::Running;
        assert!(!job.is_ready());
    }

    #[test]
    fn retry_delay_grows_and_caps() {
        let mut job = sample_job();
        assert_eq!(job.retry_delay(), chrono::Duration::seconds(1));
        job.retry_count = 3;
        assert_eq!(job.retry_delay(), chrono::Duration::seconds(8));
        job.retry_count = 40;
        assert_eq!(job.retry_delay(), chrono::Duration::seconds(3600));
    }

    #[test]
    fn retryable_error_should_retry() {
        assert!(ErrorKind::Retryable.should_retry());
        assert!(ErrorKind::Shutdown.should_retry());
        assert!(!ErrorKind::NonRetryable.should_retry());
        assert!(!ErrorKind::Cancelled.should_retry());
    }
}
