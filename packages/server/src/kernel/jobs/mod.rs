//! Job infrastructure for background command execution.
//!
//! - [`PostgresJobQueue`] - Database-backed job queue
//! - [`JobRegistry`] - Maps job types to typed handlers
//! - [`JobRunner`] - Long-running service that polls and executes jobs
//! - [`Job`] - Job model
//!
//! ```text
//! Action calls deps.job_queue.enqueue(cmd)
//!     │
//!     └─► Insert to jobs table
//!
//! JobRunner
//!     │
//!     ├─► Claim jobs (FOR UPDATE SKIP LOCKED)
//!     ├─► JobRegistry.execute(job, deps)
//!     └─► Mark succeeded / retry / dead letter
//! ```
//!
//! Job structs and handlers live in their domains; this module only provides
//! the infrastructure.

mod job;
mod queue;
mod registry;
mod runner;
pub mod testing;

pub use job::{ErrorKind, Job, JobPriority, JobStatus};
pub use queue::{
    ClaimedJob, CommandMeta, EnqueueResult, JobQueue, JobQueueExt, NewJob, PostgresJobQueue,
};
pub use registry::{JobRegistry, SharedJobRegistry};
pub use runner::{JobRunner, JobRunnerConfig};
