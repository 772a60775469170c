//! Store port - 永続化の抽象化（source of truth）
//!
//! Store は以下を管理します：
//! - 設定値（settings）
//! - worker / worker thread の記録
//! - job の状態
//! - formula / permutation / candidate
//!
//! # 設計原則
//! - 書き込みは 1 行単位で atomic（複数行トランザクションは不要）
//! - クエリ言語には依存しない
//! - 失敗は `StoreError` で呼び出し元に返す（自動リトライしない）

use crate::domain::{
    CandidateRecord, FormulaId, FormulaKey, FormulaRecord, FormulaStatus, JobId, JobOutcome,
    JobRecord, JobStatus, Label, LiveStatus, MazeType, PermutationRecord, StoreError,
    ThreadRecord, WorkerId, WorkerRecord, WorkerThreadId,
};

/// The persistence collaborator.
///
/// Implementations must be shareable across worker threads.
pub trait Store: Send + Sync {
    // ---- settings ----

    /// Named integer setting, `None` if it was never configured.
    fn setting(&self, name: &str) -> Result<Option<i64>, StoreError>;

    fn update_setting(&self, name: &str, value: i64) -> Result<(), StoreError>;

    // ---- workers / threads ----

    fn insert_worker(&self, worker: &WorkerRecord) -> Result<(), StoreError>;

    fn update_worker_status(&self, id: WorkerId, status: LiveStatus) -> Result<(), StoreError>;

    fn insert_thread(&self, thread: &ThreadRecord) -> Result<(), StoreError>;

    fn update_thread_status(
        &self,
        id: WorkerThreadId,
        status: LiveStatus,
    ) -> Result<(), StoreError>;

    fn threads_by_worker(&self, worker_id: WorkerId) -> Result<Vec<ThreadRecord>, StoreError>;

    // ---- jobs ----

    fn insert_job(&self, job: &JobRecord) -> Result<(), StoreError>;

    fn job(&self, id: JobId) -> Result<Option<JobRecord>, StoreError>;

    /// Jobs in the given status, in creation order.
    fn jobs_with_status(&self, status: JobStatus) -> Result<Vec<JobRecord>, StoreError>;

    fn jobs_by_worker(&self, worker_id: WorkerId) -> Result<Vec<JobRecord>, StoreError>;

    /// Records the worker a job was pushed to and its queue position.
    fn assign_job(&self, id: JobId, worker_id: WorkerId, queue_order: u64)
    -> Result<(), StoreError>;

    /// Claims a queued job for a thread. `false` if the job is gone or no
    /// longer queued; nothing is written then.
    fn mark_job_running(&self, id: JobId, thread_id: WorkerThreadId) -> Result<bool, StoreError>;

    fn mark_job_completed(&self, id: JobId, outcome: JobOutcome) -> Result<(), StoreError>;

    fn mark_job_failed(&self, id: JobId, error: &str) -> Result<(), StoreError>;

    /// Back to queued, unassigned from its thread.
    fn reset_job(&self, id: JobId) -> Result<(), StoreError>;

    /// Every running job back to queued; returns the ids touched.
    fn reset_running_jobs(&self) -> Result<Vec<JobId>, StoreError>;

    /// Deletes the job only while it is still queued. `false` if it exists
    /// in another status.
    fn delete_queued_job(&self, id: JobId) -> Result<bool, StoreError>;

    /// Removes every formula, permutation and candidate the job wrote.
    /// Idempotent; returns the number of rows removed.
    fn delete_job_output(&self, id: JobId) -> Result<usize, StoreError>;

    // ---- formulas ----

    fn insert_formula(&self, formula: &FormulaRecord) -> Result<(), StoreError>;

    fn formula(&self, id: FormulaId) -> Result<Option<FormulaRecord>, StoreError>;

    fn formula_exists(&self, key: &FormulaKey) -> Result<bool, StoreError>;

    /// Formulas of one type ordered by `(x, y, endpoints, barriers)`.
    fn formulas_by_type(&self, maze_type: MazeType) -> Result<Vec<FormulaRecord>, StoreError>;

    fn formulas_by_job(&self, job_id: JobId) -> Result<Vec<FormulaRecord>, StoreError>;

    fn update_formula_status(&self, id: FormulaId, status: FormulaStatus)
    -> Result<(), StoreError>;

    fn count_formulas(&self, maze_type: MazeType, status: FormulaStatus)
    -> Result<usize, StoreError>;

    // ---- permutations / candidates ----

    fn insert_permutation(&self, permutation: &PermutationRecord) -> Result<(), StoreError>;

    /// Natural-key lookup on the placement array.
    fn permutation_exists(&self, formula_id: FormulaId, layout: &[Label])
    -> Result<bool, StoreError>;

    fn permutations_for_formula(
        &self,
        formula_id: FormulaId,
    ) -> Result<Vec<PermutationRecord>, StoreError>;

    fn insert_candidate(&self, candidate: &CandidateRecord) -> Result<(), StoreError>;

    fn candidates_for_formula(
        &self,
        formula_id: FormulaId,
    ) -> Result<Vec<CandidateRecord>, StoreError>;
}
