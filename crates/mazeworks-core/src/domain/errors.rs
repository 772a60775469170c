//! Errors - エラー型と分類
//!
//! - `StoreError`: persistence failures, propagated to the caller
//! - `ConfigError`: missing or non-numeric settings
//! - `JobError`: anything that stops a job (including cancellation)
//! - `PoolError`: worker pool lifecycle and control errors
//!
//! Validation failures are not errors; see `generator::validation`.

use thiserror::Error;

use super::ids::{FormulaId, JobId, WorkerThreadId};
use super::job::JobStatus;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    Missing(String),

    #[error("setting {name} is not an integer: {value}")]
    NotNumeric { name: String, value: String },

    #[error("setting {name} is out of range: {value}")]
    OutOfRange { name: String, value: i64 },

    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Returned by `JobQueue::push` once the queue is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("job queue is closed")]
pub struct QueueClosed;

#[derive(Debug, Error)]
pub enum JobError {
    /// The job's thread was killed; its writes are refused from now on.
    #[error("job was cancelled")]
    Cancelled,

    #[error("no handler registered for job kind {0}")]
    HandlerNotFound(crate::domain::JobKind),

    #[error("formula not found: {0}")]
    FormulaNotFound(FormulaId),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("a worker pool is already running")]
    AlreadyRunning,

    #[error("no worker pool is running")]
    NotRunning,

    #[error("unknown worker thread: {0}")]
    UnknownThread(WorkerThreadId),

    #[error("job {job_id} is not running on thread {thread_id}")]
    JobNotRunning {
        thread_id: WorkerThreadId,
        job_id: JobId,
    },

    #[error("job {job_id} cannot be deleted while {status}")]
    JobNotDeletable { job_id: JobId, status: JobStatus },

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("formula not found: {0}")]
    FormulaNotFound(FormulaId),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    QueueClosed(#[from] QueueClosed),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
