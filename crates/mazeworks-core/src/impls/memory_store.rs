//! MemoryStore - 開発・テスト用の in-process Store
//!
//! # 実装詳細
//! - 全レコードを 1 つの `parking_lot::Mutex` で保護
//! - 各メソッドは 1 回のロックで完結する（1 行単位で atomic）
//! - 挿入順は `*_order` の Vec で保持する

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::{
    CandidateRecord, FormulaId, FormulaKey, FormulaRecord, FormulaStatus, JobId, JobOutcome,
    JobRecord, JobStatus, Label, LiveStatus, MazeType, PermutationRecord, StoreError,
    ThreadRecord, WorkerId, WorkerRecord, WorkerThreadId,
};
use crate::ports::{Clock, Store, SystemClock};

#[derive(Default)]
struct MemoryState {
    settings: HashMap<String, i64>,
    workers: HashMap<WorkerId, WorkerRecord>,
    threads: HashMap<WorkerThreadId, ThreadRecord>,
    thread_order: Vec<WorkerThreadId>,
    jobs: HashMap<JobId, JobRecord>,
    job_order: Vec<JobId>,
    formulas: HashMap<FormulaId, FormulaRecord>,
    formula_keys: HashMap<FormulaKey, FormulaId>,
    formula_order: Vec<FormulaId>,
    permutations: HashMap<FormulaId, Vec<PermutationRecord>>,
    layouts: HashSet<(FormulaId, Vec<Label>)>,
    candidates: Vec<CandidateRecord>,
}

impl MemoryState {
    fn job_mut(&mut self, id: JobId) -> Result<&mut JobRecord, StoreError> {
        self.jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("job", id))
    }
}

/// In-process [`Store`]. Cloning shares the same state.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            clock: Arc::new(clock),
        }
    }

    /// Seeds settings in one call.
    pub fn with_settings<'a>(self, settings: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        {
            let mut state = self.state.lock();
            for (name, value) in settings {
                state.settings.insert(name.to_string(), value);
            }
        }
        self
    }

    pub fn worker(&self, id: WorkerId) -> Option<WorkerRecord> {
        self.state.lock().workers.get(&id).cloned()
    }

    pub fn thread(&self, id: WorkerThreadId) -> Option<ThreadRecord> {
        self.state.lock().threads.get(&id).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn setting(&self, name: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.state.lock().settings.get(name).copied())
    }

    fn update_setting(&self, name: &str, value: i64) -> Result<(), StoreError> {
        self.state.lock().settings.insert(name.to_string(), value);
        Ok(())
    }

    fn insert_worker(&self, worker: &WorkerRecord) -> Result<(), StoreError> {
        self.state.lock().workers.insert(worker.id, worker.clone());
        Ok(())
    }

    fn update_worker_status(&self, id: WorkerId, status: LiveStatus) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let worker = state
            .workers
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("worker", id))?;
        worker.status = status;
        worker.updated_at = now;
        Ok(())
    }

    fn insert_thread(&self, thread: &ThreadRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.threads.insert(thread.id, thread.clone()).is_none() {
            state.thread_order.push(thread.id);
        }
        Ok(())
    }

    fn update_thread_status(
        &self,
        id: WorkerThreadId,
        status: LiveStatus,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let thread = state
            .threads
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("thread", id))?;
        thread.status = status;
        thread.updated_at = now;
        Ok(())
    }

    fn threads_by_worker(&self, worker_id: WorkerId) -> Result<Vec<ThreadRecord>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .thread_order
            .iter()
            .filter_map(|id| state.threads.get(id))
            .filter(|thread| thread.worker_id == worker_id)
            .cloned()
            .collect())
    }

    fn insert_job(&self, job: &JobRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.jobs.insert(job.id, job.clone()).is_none() {
            state.job_order.push(job.id);
        }
        Ok(())
    }

    fn job(&self, id: JobId) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.state.lock().jobs.get(&id).cloned())
    }

    fn jobs_with_status(&self, status: JobStatus) -> Result<Vec<JobRecord>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .job_order
            .iter()
            .filter_map(|id| state.jobs.get(id))
            .filter(|job| job.status == status)
            .cloned()
            .collect())
    }

    fn jobs_by_worker(&self, worker_id: WorkerId) -> Result<Vec<JobRecord>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .job_order
            .iter()
            .filter_map(|id| state.jobs.get(id))
            .filter(|job| job.worker_id == Some(worker_id))
            .cloned()
            .collect())
    }

    fn assign_job(
        &self,
        id: JobId,
        worker_id: WorkerId,
        queue_order: u64,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.state.lock().job_mut(id)?.assign(worker_id, queue_order, now);
        Ok(())
    }

    fn mark_job_running(&self, id: JobId, thread_id: WorkerThreadId) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        match state.jobs.get_mut(&id) {
            Some(job) if job.status == JobStatus::Queued => {
                job.start(thread_id, now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn mark_job_completed(&self, id: JobId, outcome: JobOutcome) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.state.lock().job_mut(id)?.complete(outcome, now);
        Ok(())
    }

    fn mark_job_failed(&self, id: JobId, error: &str) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.state.lock().job_mut(id)?.fail(error.to_string(), now);
        Ok(())
    }

    fn reset_job(&self, id: JobId) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.state.lock().job_mut(id)?.reset(now);
        Ok(())
    }

    fn reset_running_jobs(&self) -> Result<Vec<JobId>, StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let running: Vec<JobId> = state
            .job_order
            .iter()
            .copied()
            .filter(|id| {
                state
                    .jobs
                    .get(id)
                    .is_some_and(|job| job.status == JobStatus::Running)
            })
            .collect();
        for id in &running {
            state.job_mut(*id)?.reset(now);
        }
        Ok(running)
    }

    fn delete_queued_job(&self, id: JobId) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        if state.job_mut(id)?.status != JobStatus::Queued {
            return Ok(false);
        }
        state.jobs.remove(&id);
        state.job_order.retain(|other| *other != id);
        Ok(true)
    }

    fn delete_job_output(&self, id: JobId) -> Result<usize, StoreError> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let formulas: Vec<FormulaId> = state
            .formula_order
            .iter()
            .copied()
            .filter(|formula_id| {
                state
                    .formulas
                    .get(formula_id)
                    .is_some_and(|record| record.job_id == Some(id))
            })
            .collect();
        for formula_id in &formulas {
            if let Some(record) = state.formulas.remove(formula_id) {
                state.formula_keys.remove(&record.formula.key());
            }
        }
        state.formula_order.retain(|formula_id| !formulas.contains(formula_id));

        let mut removed = formulas.len();
        for (formula_id, permutations) in state.permutations.iter_mut() {
            permutations.retain(|permutation| {
                let keep = permutation.job_id != id && !formulas.contains(formula_id);
                if !keep {
                    state.layouts.remove(&(*formula_id, permutation.layout.clone()));
                    removed += 1;
                }
                keep
            });
        }
        state.permutations.retain(|_, permutations| !permutations.is_empty());

        let before = state.candidates.len();
        state
            .candidates
            .retain(|candidate| candidate.job_id != id && !formulas.contains(&candidate.formula_id));
        removed += before - state.candidates.len();

        Ok(removed)
    }

    fn insert_formula(&self, formula: &FormulaRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.formula_keys.insert(formula.formula.key(), formula.id);
        if state.formulas.insert(formula.id, formula.clone()).is_none() {
            state.formula_order.push(formula.id);
        }
        Ok(())
    }

    fn formula(&self, id: FormulaId) -> Result<Option<FormulaRecord>, StoreError> {
        Ok(self.state.lock().formulas.get(&id).cloned())
    }

    fn formula_exists(&self, key: &FormulaKey) -> Result<bool, StoreError> {
        Ok(self.state.lock().formula_keys.contains_key(key))
    }

    fn formulas_by_type(&self, maze_type: MazeType) -> Result<Vec<FormulaRecord>, StoreError> {
        let state = self.state.lock();
        let mut formulas: Vec<FormulaRecord> = state
            .formulas
            .values()
            .filter(|record| record.formula.maze_type == maze_type)
            .cloned()
            .collect();
        formulas.sort_by_key(|record| {
            let f = &record.formula;
            (f.x, f.y, f.endpoints, f.barriers, f.key())
        });
        Ok(formulas)
    }

    fn formulas_by_job(&self, job_id: JobId) -> Result<Vec<FormulaRecord>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .formula_order
            .iter()
            .filter_map(|id| state.formulas.get(id))
            .filter(|record| record.job_id == Some(job_id))
            .cloned()
            .collect())
    }

    fn update_formula_status(
        &self,
        id: FormulaId,
        status: FormulaStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let record = state
            .formulas
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("formula", id))?;
        record.status = status;
        Ok(())
    }

    fn count_formulas(
        &self,
        maze_type: MazeType,
        status: FormulaStatus,
    ) -> Result<usize, StoreError> {
        let state = self.state.lock();
        Ok(state
            .formulas
            .values()
            .filter(|record| record.formula.maze_type == maze_type && record.status == status)
            .count())
    }

    fn insert_permutation(&self, permutation: &PermutationRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state
            .layouts
            .insert((permutation.formula_id, permutation.layout.clone()));
        state
            .permutations
            .entry(permutation.formula_id)
            .or_default()
            .push(permutation.clone());
        Ok(())
    }

    fn permutation_exists(
        &self,
        formula_id: FormulaId,
        layout: &[Label],
    ) -> Result<bool, StoreError> {
        Ok(self
            .state
            .lock()
            .layouts
            .contains(&(formula_id, layout.to_vec())))
    }

    fn permutations_for_formula(
        &self,
        formula_id: FormulaId,
    ) -> Result<Vec<PermutationRecord>, StoreError> {
        Ok(self
            .state
            .lock()
            .permutations
            .get(&formula_id)
            .cloned()
            .unwrap_or_default())
    }

    fn insert_candidate(&self, candidate: &CandidateRecord) -> Result<(), StoreError> {
        self.state.lock().candidates.push(candidate.clone());
        Ok(())
    }

    fn candidates_for_formula(
        &self,
        formula_id: FormulaId,
    ) -> Result<Vec<CandidateRecord>, StoreError> {
        Ok(self
            .state
            .lock()
            .candidates
            .iter()
            .filter(|candidate| candidate.formula_id == formula_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Formula, JobPayload, PermutationId, Side};
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    fn store() -> MemoryStore {
        MemoryStore::with_clock(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn job(store: &MemoryStore) -> JobRecord {
        let job = JobRecord::new(
            JobId::from_ulid(Ulid::new()),
            JobPayload::GenerateFormulas {
                maze_types: vec![MazeType::Simple],
            },
            Utc::now(),
        );
        store.insert_job(&job).unwrap();
        job
    }

    fn formula(store: &MemoryStore, job_id: Option<JobId>, x: u32) -> FormulaRecord {
        let record = FormulaRecord::new(
            FormulaId::from_ulid(Ulid::new()),
            job_id,
            Formula::new(MazeType::Simple, x, x, 1, 1, 0),
        );
        store.insert_formula(&record).unwrap();
        record
    }

    #[test]
    fn jobs_are_listed_in_creation_order() {
        let store = store();
        let ids: Vec<JobId> = (0..4).map(|_| job(&store).id).collect();

        let queued: Vec<JobId> = store
            .jobs_with_status(JobStatus::Queued)
            .unwrap()
            .into_iter()
            .map(|job| job.id)
            .collect();
        assert_eq!(queued, ids);
    }

    #[test]
    fn reset_running_jobs_returns_touched_ids() {
        let store = store();
        let first = job(&store);
        let second = job(&store);
        let thread_id = WorkerThreadId::from_ulid(Ulid::new());
        assert!(store.mark_job_running(first.id, thread_id).unwrap());

        let reset = store.reset_running_jobs().unwrap();

        assert_eq!(reset, vec![first.id]);
        let first = store.job(first.id).unwrap().unwrap();
        assert_eq!(first.status, JobStatus::Queued);
        assert_eq!(first.thread_id, None);
        assert_eq!(store.job(second.id).unwrap().unwrap().attempts, 0);
    }

    #[test]
    fn only_queued_jobs_are_claimed_or_deleted() {
        let store = store();
        let running = job(&store);
        let queued = job(&store);
        let thread_id = WorkerThreadId::from_ulid(Ulid::new());
        assert!(store.mark_job_running(running.id, thread_id).unwrap());
        assert!(!store.mark_job_running(running.id, thread_id).unwrap());
        assert_eq!(store.job(running.id).unwrap().unwrap().attempts, 1);

        assert!(!store.delete_queued_job(running.id).unwrap());
        assert!(store.job(running.id).unwrap().is_some());

        assert!(store.delete_queued_job(queued.id).unwrap());
        assert!(!store.mark_job_running(queued.id, thread_id).unwrap());
        assert!(matches!(
            store.delete_queued_job(queued.id),
            Err(StoreError::NotFound { kind: "job", .. })
        ));
    }

    #[test]
    fn missing_job_is_not_found() {
        let store = store();
        let err = store
            .mark_job_failed(JobId::from_ulid(Ulid::new()), "boom")
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "job", .. }));
    }

    #[test]
    fn formula_natural_key_lookup() {
        let store = store();
        let record = formula(&store, None, 4);
        assert!(store.formula_exists(&record.formula.key()).unwrap());
        assert!(
            !store
                .formula_exists(&Formula::new(MazeType::Simple, 5, 5, 1, 1, 0).key())
                .unwrap()
        );
    }

    #[test]
    fn formulas_by_type_are_ordered_by_dimensions() {
        let store = store();
        formula(&store, None, 6);
        formula(&store, None, 3);
        formula(&store, None, 4);

        let widths: Vec<u32> = store
            .formulas_by_type(MazeType::Simple)
            .unwrap()
            .iter()
            .map(|record| record.formula.x)
            .collect();
        assert_eq!(widths, vec![3, 4, 6]);
        assert!(store.formulas_by_type(MazeType::Bridge).unwrap().is_empty());
    }

    #[test]
    fn formula_status_counts() {
        let store = store();
        let approved = formula(&store, None, 3);
        formula(&store, None, 4);
        store
            .update_formula_status(approved.id, FormulaStatus::Approved)
            .unwrap();

        assert_eq!(
            store
                .count_formulas(MazeType::Simple, FormulaStatus::Approved)
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .count_formulas(MazeType::Simple, FormulaStatus::Pending)
                .unwrap(),
            1
        );
    }

    #[test]
    fn delete_job_output_removes_only_that_jobs_rows() {
        let store = store();
        let owner = job(&store);
        let other = job(&store);
        let mine = formula(&store, Some(owner.id), 3);
        let theirs = formula(&store, Some(other.id), 4);

        let layout = vec![
            Label::endpoint(1, Side::A),
            Label::endpoint(1, Side::B),
            Label::Barrier,
            Label::Normal,
        ];
        let permutation = PermutationRecord {
            id: PermutationId::from_ulid(Ulid::new()),
            job_id: other.id,
            formula_id: theirs.id,
            layout: layout.clone(),
        };
        store.insert_permutation(&permutation).unwrap();

        assert_eq!(store.delete_job_output(owner.id).unwrap(), 1);
        assert!(store.formula(mine.id).unwrap().is_none());
        assert!(!store.formula_exists(&mine.formula.key()).unwrap());
        assert!(store.formula(theirs.id).unwrap().is_some());
        assert!(store.permutation_exists(theirs.id, &layout).unwrap());

        assert_eq!(store.delete_job_output(other.id).unwrap(), 2);
        assert!(!store.permutation_exists(theirs.id, &layout).unwrap());
        assert_eq!(store.delete_job_output(other.id).unwrap(), 0);
    }

    #[test]
    fn threads_by_worker_filters_owner() {
        let store = store();
        let now = Utc::now();
        let worker_id = WorkerId::from_ulid(Ulid::new());
        for owner in [worker_id, WorkerId::from_ulid(Ulid::new())] {
            store
                .insert_thread(&ThreadRecord {
                    id: WorkerThreadId::from_ulid(Ulid::new()),
                    worker_id: owner,
                    status: LiveStatus::Alive,
                    created_at: now,
                    updated_at: now,
                })
                .unwrap();
        }
        assert_eq!(store.threads_by_worker(worker_id).unwrap().len(), 1);
    }
}
