//! Job testing utilities.
//!
//! [`InMemoryJobQueue`] records every pushed job so tests can assert on what
//! was enqueued without a database.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use uuid::Uuid;

use super::job::{ErrorKind, Job, JobStatus};
use super::queue::{ClaimedJob, EnqueueResult, JobQueue, NewJob};

#[derive(Clone, Default)]
pub struct InMemoryJobQueue {
    jobs: Arc<Mutex<Vec<Job>>>,
    fail_pushes: bool,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue whose `push` always fails, for exercising fire-and-forget paths.
    pub fn failing() -> Self {
        Self {
            fail_pushes: true,
            ..Self::default()
        }
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.lock().clone()
    }

    pub fn jobs_of_type(&self, job_type: &str) -> Vec<Job> {
        self.lock()
            .iter()
            .filter(|job| job.job_type == job_type)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Job>> {
        // A poisoned lock only means another test thread panicked.
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(&self, job_id: Uuid, status: JobStatus) -> Result<()> {
        let mut jobs = self.lock();
        let job = jobs
            .iter_mut()
            .find(|job| job.id == job_id)
            .ok_or_else(|| anyhow!("job {} not found", job_id))?;
        job.status = status;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn push(&self, new_job: NewJob) -> Result<EnqueueResult> {
        if self.fail_pushes {
            return Err(anyhow!("job queue unavailable"));
        }

        let mut jobs = self.lock();

        if let Some(key) = &new_job.idempotency_key {
            let existing = jobs.iter().find(|job| {
                job.idempotency_key.as_deref() == Some(key.as_str())
                    && matches!(job.status, JobStatus::Pending | JobStatus::Running)
            });
            if let Some(existing) = existing {
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

        let id = job.id;
        jobs.push(job);
        Ok(EnqueueResult::Created(id))
    }

    async fn claim(&self, worker_id: &str, limit: i64) -> Result<Vec<ClaimedJob>> {
        let mut jobs = self.lock();
        let mut claimed = Vec::new();

        for job in jobs.iter_mut() {
            if claimed.len() as i64 >= limit {
                break;
            }
            if job.is_ready() {
                job.status = JobStatus::Running;
                job.worker_id = Some(worker_id.to_string());
                claimed.push(ClaimedJob {
                    id: job.id,
                    job: job.clone(),
                });
            }
        }

        Ok(claimed)
    }

    async fn mark_succeeded(&self, job_id: Uuid) -> Result<()> {
        self.set_status(job_id, JobStatus::Succeeded)
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str, kind: ErrorKind) -> Result<()> {
        let mut jobs = self.lock();
        let job = jobs
            .iter_mut()
            .find(|job| job.id == job_id)
            .ok_or_else(|| anyhow!("job {} not found", job_id))?;

        job.error_message = Some(error.to_string());
        job.error_kind = Some(kind);
        if kind.should_retry() && job.has_retries_left() {
            job.status = JobStatus::Pending;
            job.retry_count += 1;
        } else {
            job.status = JobStatus::DeadLetter;
        }
        Ok(())
    }

    async fn cancel(&self, job_id: Uuid) -> Result<bool> {
        let mut jobs = self.lock();
        match jobs
            .iter_mut()
            .find(|job| job.id == job_id && job.status == JobStatus::Pending)
        {
            Some(job) => {
                job.status = JobStatus::Cancelled;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::jobs::{CommandMeta, JobQueueExt};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Greet {
        name: String,
    }

    impl CommandMeta for Greet {
        fn command_type(&self) -> &'static str {
            "greet"
        }

        fn idempotency_key(&self) -> Option<String> {
            Some(format!("greet:{}", self.name))
        }
    }

    #[tokio::test]
    async fn test_idempotent_enqueue() {
        let queue = InMemoryJobQueue::new();
        let first = queue.enqueue(Greet { name: "ada".into() }).await.unwrap();
        let second = queue.enqueue(Greet { name: "ada".into() }).await.unwrap();

        assert!(first.is_created());
        assert_eq!(second, EnqueueResult::Duplicate(first.job_id()));
        assert_eq!(queue.jobs_of_type("greet").len(), 1);
    }

    #[tokio::test]
    async fn test_failure_retries_then_dead_letters() {
        let queue = InMemoryJobQueue::new();
        let id = queue
            .enqueue(Greet { name: "bob".into() })
            .await
            .unwrap()
            .job_id();

        for _ in 0..3 {
            queue.claim("w", 10).await.unwrap();
            queue.mark_failed(id, "smtp down", ErrorKind::Retryable).await.unwrap();
        }
        assert_eq!(queue.jobs()[0].status, JobStatus::Pending);
        assert_eq!(queue.jobs()[0].retry_count, 3);

        queue.claim("w", 10).await.unwrap();
        queue.mark_failed(id, "smtp down", ErrorKind::Retryable).await.unwrap();
        assert_eq!(queue.jobs()[0].status, JobStatus::DeadLetter);
    }

    #[tokio::test]
    async fn test_cancel_only_pending() {
        let queue = InMemoryJobQueue::new();
        let id = queue
            .enqueue(Greet { name: "cy".into() })
            .await
            .unwrap()
            .job_id();

        assert!(queue.cancel(id).await.unwrap());
        assert!(!queue.cancel(id).await.unwrap());
    }
}
