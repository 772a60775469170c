//! Observability - tracing 初期化と status view
//!
//! status view は store / pool の状態をそのまま数えたもので、
//! serde で JSON にしてダッシュボードや CLI に渡す。

use serde::{Deserialize, Serialize};

use crate::app::WorkerPool;
use crate::domain::{
    FormulaStatus, JobStatus, MazeType, StoreError, ThreadDetail, WorkerId,
};
use crate::ports::Store;

/// Installs a fmt subscriber filtered by `RUST_LOG` (default `info`).
/// Returns `false` if a global subscriber was already set.
pub fn init_tracing() -> bool {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .is_ok()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueCounts {
    pub fn from_store(store: &dyn Store) -> Result<Self, StoreError> {
        Ok(Self {
            queued: store.jobs_with_status(JobStatus::Queued)?.len(),
            running: store.jobs_with_status(JobStatus::Running)?.len(),
            completed: store.jobs_with_status(JobStatus::Completed)?.len(),
            failed: store.jobs_with_status(JobStatus::Failed)?.len(),
        })
    }

    /// Nothing queued or running.
    pub fn is_idle(&self) -> bool {
        self.queued == 0 && self.running == 0
    }
}

/// Formula counts for one maze type, by approval status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaCounts {
    pub maze_type: MazeType,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl FormulaCounts {
    pub fn from_store(store: &dyn Store, maze_type: MazeType) -> Result<Self, StoreError> {
        Ok(Self {
            maze_type,
            pending: store.count_formulas(maze_type, FormulaStatus::Pending)?,
            approved: store.count_formulas(maze_type, FormulaStatus::Approved)?,
            rejected: store.count_formulas(maze_type, FormulaStatus::Rejected)?,
        })
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.rejected
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    pub worker_id: WorkerId,
    pub active: bool,
    pub live_threads: usize,
    pub pending: usize,
    pub threads: Vec<ThreadDetail>,
}

impl PoolStatus {
    pub fn of(pool: &WorkerPool) -> Self {
        Self {
            worker_id: pool.worker_id(),
            active: pool.is_active(),
            live_threads: pool.live_thread_count(),
            pending: pool.pending_count(),
            threads: pool.thread_details(),
        }
    }
}
