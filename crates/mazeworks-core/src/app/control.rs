//! Control - 外部（管理画面や CLI）から呼ばれる操作の表面
//!
//! job は必ず先に store へ queued で保存する。pool が動いていればその
//! 場で enqueue し、動いていなければ次の `start` で拾われる。

use std::sync::Arc;
use tracing::info;

use super::pool::{Services, WorkerPool};
use super::slot::PoolSlot;
use crate::domain::{
    ConfigError, Formula, FormulaId, FormulaStatus, JobId, JobPayload, JobRecord, JobStatus,
    MazeType, PoolError, StoreError, ThreadDetail, ThreadMode, WorkerId, WorkerThreadId,
};
use crate::generator::{FieldValidation, FormulaValidation, TypeRanges};

pub const NUMBER_OF_THREADS: &str = "number_of_threads";
pub const MIN_THREADS: usize = 1;
pub const MAX_THREADS: usize = 10;

fn clamp_threads(n: i64) -> usize {
    n.clamp(MIN_THREADS as i64, MAX_THREADS as i64) as usize
}

pub struct Control<'s> {
    slot: &'s PoolSlot,
    services: Services,
}

impl Control<'static> {
    /// Control over the process-wide slot.
    pub fn global(services: Services) -> Self {
        Self::new(PoolSlot::global(), services)
    }
}

impl<'s> Control<'s> {
    pub fn new(slot: &'s PoolSlot, services: Services) -> Self {
        Self { slot, services }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn pool(&self) -> Option<Arc<WorkerPool>> {
        self.slot.current()
    }

    // ---- lifecycle ----

    /// Starts a pool with the configured number of threads.
    pub fn start(&self) -> Result<Arc<WorkerPool>, PoolError> {
        let threads = self.number_of_threads()?;
        self.slot
            .start(|| WorkerPool::start(self.services.clone(), threads))
    }

    pub fn stop(&self) -> Result<(), PoolError> {
        self.slot.stop()
    }

    pub fn is_active(&self) -> bool {
        self.slot.is_active()
    }

    /// Requeues jobs orphaned by panicked threads.
    pub fn reconcile_orphans(&self) -> Result<Vec<JobId>, PoolError> {
        self.pool()
            .ok_or(PoolError::NotRunning)?
            .reconcile_orphans()
    }

    // ---- settings ----

    pub fn number_of_threads(&self) -> Result<usize, ConfigError> {
        let value = self
            .services
            .store
            .setting(NUMBER_OF_THREADS)?
            .ok_or_else(|| ConfigError::Missing(NUMBER_OF_THREADS.to_string()))?;
        Ok(clamp_threads(value))
    }

    /// Stores the clamped value and returns it. Takes effect on the next
    /// `start`.
    pub fn update_number_of_threads(&self, n: usize) -> Result<usize, StoreError> {
        let n = clamp_threads(i64::try_from(n).unwrap_or(i64::MAX));
        self.services
            .store
            .update_setting(NUMBER_OF_THREADS, n as i64)?;
        Ok(n)
    }

    // ---- jobs ----

    pub fn enqueue_formula_generation_job(&self) -> Result<JobId, PoolError> {
        self.enqueue_formula_generation_job_for(&MazeType::ALL)
    }

    pub fn enqueue_formula_generation_job_for(
        &self,
        maze_types: &[MazeType],
    ) -> Result<JobId, PoolError> {
        self.submit(JobPayload::GenerateFormulas {
            maze_types: maze_types.to_vec(),
        })
    }

    pub fn enqueue_permutation_job(&self, formula_id: FormulaId) -> Result<JobId, PoolError> {
        self.require_formula(formula_id)?;
        self.submit(JobPayload::GeneratePermutations { formula_id })
    }

    pub fn enqueue_solve_job(&self, formula_id: FormulaId) -> Result<JobId, PoolError> {
        self.require_formula(formula_id)?;
        self.submit(JobPayload::SolveCandidates { formula_id })
    }

    pub fn kill_job(&self, thread_id: WorkerThreadId, job_id: JobId) -> Result<(), PoolError> {
        self.pool()
            .ok_or(PoolError::NotRunning)?
            .kill_job(thread_id, job_id)
    }

    /// Deletes a job that has not started. A pool that already queued it
    /// discards it when popped.
    ///
    /// The mark goes in before the row is removed. The row is removed only
    /// while still queued; a thread that claimed the job first wins.
    pub fn delete_job(&self, job_id: JobId) -> Result<(), PoolError> {
        let pool = self.pool();
        if let Some(pool) = &pool {
            pool.mark_deleted(job_id);
        }
        let deleted = self.services.store.delete_queued_job(job_id);
        if !matches!(deleted, Ok(true))
            && let Some(pool) = &pool
        {
            pool.unmark_deleted(job_id);
        }
        match deleted {
            Ok(true) => {
                info!(job_id = %job_id, "deleted job");
                Ok(())
            }
            Ok(false) => {
                let status = self
                    .services
                    .store
                    .job(job_id)?
                    .ok_or(PoolError::JobNotFound(job_id))?
                    .status;
                Err(PoolError::JobNotDeletable { job_id, status })
            }
            Err(StoreError::NotFound { .. }) => Err(PoolError::JobNotFound(job_id)),
            Err(err) => Err(err.into()),
        }
    }

    /// One row per thread the worker ever spawned. Threads no longer in the
    /// running pool are reported dead and waiting.
    pub fn worker_thread_details(&self, worker_id: WorkerId) -> Result<Vec<ThreadDetail>, PoolError> {
        let live = self
            .pool()
            .filter(|pool| pool.worker_id() == worker_id)
            .map(|pool| pool.thread_details())
            .unwrap_or_default();

        let records = self.services.store.threads_by_worker(worker_id)?;
        Ok(records
            .into_iter()
            .map(|record| {
                live.iter()
                    .find(|detail| detail.thread_id == record.id)
                    .cloned()
                    .unwrap_or(ThreadDetail {
                        thread_id: record.id,
                        job_id: None,
                        alive: false,
                        mode: ThreadMode::Waiting,
                    })
            })
            .collect())
    }

    // ---- formulas ----

    pub fn approve_formula(&self, formula_id: FormulaId) -> Result<(), PoolError> {
        self.set_formula_status(formula_id, FormulaStatus::Approved)
    }

    pub fn reject_formula(&self, formula_id: FormulaId) -> Result<(), PoolError> {
        self.set_formula_status(formula_id, FormulaStatus::Rejected)
    }

    /// Field-by-field validation against the formula type's ranges.
    pub fn validate_formula(&self, formula: &Formula) -> Result<Vec<FieldValidation>, ConfigError> {
        let ranges = TypeRanges::load(self.services.store.as_ref(), formula.maze_type)?;
        Ok(FormulaValidation::new(formula, &ranges).fields())
    }

    fn set_formula_status(&self, formula_id: FormulaId, status: FormulaStatus) -> Result<(), PoolError> {
        self.require_formula(formula_id)?;
        self.services
            .store
            .update_formula_status(formula_id, status)?;
        info!(formula_id = %formula_id, ?status, "formula status updated");
        Ok(())
    }

    fn require_formula(&self, formula_id: FormulaId) -> Result<(), PoolError> {
        match self.services.store.formula(formula_id)? {
            Some(_) => Ok(()),
            None => Err(PoolError::FormulaNotFound(formula_id)),
        }
    }

    fn submit(&self, payload: JobPayload) -> Result<JobId, PoolError> {
        let job = JobRecord::new(
            self.services.ids.generate_job_id(),
            payload,
            self.services.clock.now(),
        );
        self.services.store.insert_job(&job)?;
        if let Some(pool) = self.pool() {
            pool.enqueue(job.id)?;
        }
        info!(job_id = %job.id, kind = %job.kind(), "job submitted");
        Ok(job.id)
    }
}
