//! WorkerPool - 固定数の OS thread と JobQueue を束ねる
//!
//! # 共有状態
//! - `queue`: closeable FIFO（thread 間の唯一の受け渡し経路）
//! - `threads`: live な WorkerThread の registry（Mutex）
//! - `deleted`: queue に積まれたまま削除された job id
//!
//! kill / stop は registry ロックを取ってから各 thread の slot を fence
//! し、その後で store 上の undo / reset を行う。

use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{info, warn};

use super::runner::JobRunner;
use super::thread::{self, WorkerThread};
use crate::domain::{
    JobId, JobStatus, LiveStatus, PoolError, ThreadDetail, ThreadRecord, WorkerId, WorkerRecord,
    WorkerThreadId,
};
use crate::ports::{Clock, IdGenerator, Store};
use crate::queue::JobQueue;

/// Collaborators a pool is built from.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn Store>,
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
    pub runner: Arc<JobRunner>,
}

pub(crate) struct PoolShared {
    pub(crate) worker_id: WorkerId,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) runner: Arc<JobRunner>,
    pub(crate) queue: JobQueue<JobId>,
    pub(crate) threads: Mutex<Vec<Arc<WorkerThread>>>,
    deleted: Mutex<HashSet<JobId>>,
    pub(crate) pending: AtomicUsize,
    next_order: AtomicU64,
}

impl PoolShared {
    /// Consumes a deletion mark. A skipped job no longer counts as pending.
    pub(crate) fn take_deleted(&self, job_id: JobId) -> bool {
        let removed = self.deleted.lock().remove(&job_id);
        if removed {
            self.release_pending();
        }
        removed
    }
}

pub struct WorkerPool {
    shared: Arc<PoolShared>,
    clock: Arc<dyn Clock>,
    number_of_threads: usize,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_id", &self.shared.worker_id)
            .field("number_of_threads", &self.number_of_threads)
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Records the worker, queues every persisted `queued` job, then spawns
    /// `number_of_threads` threads.
    pub fn start(services: Services, number_of_threads: usize) -> Result<Self, PoolError> {
        let Services {
            store,
            ids,
            clock,
            runner,
        } = services;

        let now = clock.now();
        let worker = WorkerRecord {
            id: ids.generate_worker_id(),
            number_of_threads,
            status: LiveStatus::Alive,
            created_at: now,
            updated_at: now,
        };
        store.insert_worker(&worker)?;

        let pool = Self {
            shared: Arc::new(PoolShared {
                worker_id: worker.id,
                store,
                ids,
                runner,
                queue: JobQueue::new(),
                threads: Mutex::new(Vec::with_capacity(number_of_threads)),
                deleted: Mutex::new(HashSet::new()),
                pending: AtomicUsize::new(0),
                next_order: AtomicU64::new(0),
            }),
            clock,
            number_of_threads,
        };

        let queued = pool.shared.store.jobs_with_status(JobStatus::Queued)?;
        for job in &queued {
            pool.enqueue(job.id)?;
        }
        for _ in 0..number_of_threads {
            pool.spawn_thread()?;
        }

        info!(
            worker_id = %worker.id,
            threads = number_of_threads,
            queued = queued.len(),
            "worker pool started"
        );
        Ok(pool)
    }

    /// Fences and detaches every thread, undoes and requeues running jobs,
    /// then closes the queue.
    pub fn stop(&self) -> Result<(), PoolError> {
        let threads = std::mem::take(&mut *self.shared.threads.lock());
        for thread in &threads {
            thread.kill();
            thread.detach();
        }
        for thread in &threads {
            if let Err(err) = self
                .shared
                .store
                .update_thread_status(thread.id(), LiveStatus::Dead)
            {
                warn!(thread_id = %thread.id(), error = %err, "failed to record dead thread");
            }
        }

        let running = self.shared.store.jobs_with_status(JobStatus::Running)?;
        for job in &running {
            let removed = self.shared.store.delete_job_output(job.id)?;
            if removed > 0 {
                info!(job_id = %job.id, removed, "undid partial job output");
            }
        }
        let reset = self.shared.store.reset_running_jobs()?;

        self.shared.queue.close();
        self.shared
            .store
            .update_worker_status(self.shared.worker_id, LiveStatus::Dead)?;

        info!(
            worker_id = %self.shared.worker_id,
            threads = threads.len(),
            reset = reset.len(),
            "worker pool stopped"
        );
        Ok(())
    }

    /// Persists the job's worker assignment, then pushes it.
    pub fn enqueue(&self, job_id: JobId) -> Result<(), PoolError> {
        let order = self.shared.next_order.fetch_add(1, Ordering::SeqCst);
        self.shared
            .store
            .assign_job(job_id, self.shared.worker_id, order)?;
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = self.shared.queue.push(job_id) {
            self.shared.release_pending();
            return Err(err.into());
        }
        Ok(())
    }

    /// Cancels `job_id` on `thread_id`: the thread is fenced and dropped
    /// from the pool, a replacement is spawned, the job's output is undone
    /// and the job goes to the back of the queue.
    pub fn kill_job(&self, thread_id: WorkerThreadId, job_id: JobId) -> Result<(), PoolError> {
        let target = {
            let mut threads = self.shared.threads.lock();
            let position = threads
                .iter()
                .position(|thread| thread.id() == thread_id)
                .ok_or(PoolError::UnknownThread(thread_id))?;
            if !threads[position].kill_if_running(job_id) {
                return Err(PoolError::JobNotRunning { thread_id, job_id });
            }
            threads.remove(position)
        };
        target.detach();
        self.shared
            .store
            .update_thread_status(thread_id, LiveStatus::Dead)?;

        let replacement = self.spawn_thread()?;

        let removed = self.shared.store.delete_job_output(job_id)?;
        self.shared.store.reset_job(job_id)?;
        self.enqueue(job_id)?;

        info!(
            thread_id = %thread_id,
            job_id = %job_id,
            replacement = %replacement.id(),
            removed,
            "killed job"
        );
        Ok(())
    }

    /// Requeues the jobs left running by threads that panicked, and
    /// replaces those threads. Returns the requeued job ids.
    pub fn reconcile_orphans(&self) -> Result<Vec<JobId>, PoolError> {
        let orphans: Vec<Arc<WorkerThread>> = {
            let mut threads = self.shared.threads.lock();
            let (orphans, live): (Vec<_>, Vec<_>) = std::mem::take(&mut *threads)
                .into_iter()
                .partition(|thread| thread.is_orphaned());
            *threads = live;
            orphans
        };

        let mut requeued = Vec::new();
        for orphan in orphans {
            orphan.kill();
            orphan.detach();
            self.shared
                .store
                .update_thread_status(orphan.id(), LiveStatus::Dead)?;
            self.spawn_thread()?;

            let Some(job_id) = orphan.current_job() else {
                continue;
            };
            let running = self
                .shared
                .store
                .job(job_id)?
                .is_some_and(|job| job.status == JobStatus::Running);
            if !running {
                continue;
            }
            self.shared.store.delete_job_output(job_id)?;
            self.shared.store.reset_job(job_id)?;
            self.enqueue(job_id)?;
            warn!(thread_id = %orphan.id(), job_id = %job_id, "requeued orphaned job");
            requeued.push(job_id);
        }
        Ok(requeued)
    }

    /// Marks a queued job so the thread that pops it discards it.
    pub fn mark_deleted(&self, job_id: JobId) {
        self.shared.deleted.lock().insert(job_id);
    }

    /// Withdraws a mark whose deletion did not go through.
    pub fn unmark_deleted(&self, job_id: JobId) {
        self.shared.deleted.lock().remove(&job_id);
    }

    /// A thread is alive and the queue is open.
    pub fn is_active(&self) -> bool {
        self.shared.queue.is_open() && self.live_thread_count() > 0
    }

    pub fn is_dead(&self) -> bool {
        !self.is_active()
    }

    pub fn worker_id(&self) -> WorkerId {
        self.shared.worker_id
    }

    pub fn number_of_threads(&self) -> usize {
        self.number_of_threads
    }

    pub fn live_thread_count(&self) -> usize {
        self.shared
            .threads
            .lock()
            .iter()
            .filter(|thread| thread.is_alive())
            .count()
    }

    pub fn thread_details(&self) -> Vec<ThreadDetail> {
        self.shared
            .threads
            .lock()
            .iter()
            .map(|thread| thread.detail())
            .collect()
    }

    /// Jobs still waiting in the queue, front first.
    pub fn queued_job_ids(&self) -> Vec<JobId> {
        self.shared.queue.snapshot()
    }

    /// Jobs enqueued but not yet dispatched.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    fn spawn_thread(&self) -> Result<Arc<WorkerThread>, PoolError> {
        let now = self.clock.now();
        let record = ThreadRecord {
            id: self.shared.ids.generate_thread_id(),
            worker_id: self.shared.worker_id,
            status: LiveStatus::Alive,
            created_at: now,
            updated_at: now,
        };
        self.shared.store.insert_thread(&record)?;

        let me = Arc::new(WorkerThread::new(record.id));
        let mut threads = self.shared.threads.lock();
        let spawned = std::thread::Builder::new()
            .name(format!("mazeworks-{}", record.id))
            .spawn({
                let shared = self.shared.clone();
                let me = me.clone();
                move || thread::run(shared, me)
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                drop(threads);
                if let Err(store_err) = self
                    .shared
                    .store
                    .update_thread_status(record.id, LiveStatus::Dead)
                {
                    warn!(thread_id = %record.id, error = %store_err, "failed to record dead thread");
                }
                return Err(PoolError::Spawn(err));
            }
        };
        me.attach(handle);
        threads.push(me.clone());
        Ok(me)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::context::JobContext;
    use crate::app::runner::{HandlerRegistry, JobHandler, SolveCandidatesHandler};
    use crate::domain::{
        Formula, FormulaId, FormulaRecord, JobError, JobKind, JobOutcome, JobPayload, JobRecord,
        Label, MazeType, PermutationRecord, Side,
    };
    use crate::impls::MemoryStore;
    use crate::ports::{SystemClock, UlidGenerator};
    use std::sync::atomic::AtomicBool;
    use std::time::{Duration, Instant};
    use ulid::Ulid;

    /// Records each job it runs, optionally writes a formula, then spins
    /// while `hold` is set.
    struct Recorder {
        hold: AtomicBool,
        panic_once: AtomicBool,
        seen: Mutex<Vec<JobId>>,
    }

    impl Recorder {
        fn new(hold: bool) -> Arc<Self> {
            Arc::new(Self {
                hold: AtomicBool::new(hold),
                panic_once: AtomicBool::new(false),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn release(&self) {
            self.hold.store(false, Ordering::SeqCst);
        }
    }

    impl JobHandler for Recorder {
        fn handle(&self, ctx: &JobContext, _: &JobPayload) -> Result<JobOutcome, JobError> {
            self.seen.lock().push(ctx.job_id());
            if self.panic_once.swap(false, Ordering::SeqCst) {
                panic!("handler panicked");
            }
            let record = FormulaRecord::new(
                ctx.ids().generate_formula_id(),
                Some(ctx.job_id()),
                Formula::new(MazeType::Simple, 2, 1, 1, 0, 0),
            );
            ctx.write(|store| store.insert_formula(&record))?;
            while self.hold.load(Ordering::SeqCst) {
                ctx.checkpoint()?;
                std::thread::sleep(Duration::from_millis(2));
            }
            Ok(JobOutcome::Permutations { created: 0 })
        }
    }

    struct Fixture {
        store: MemoryStore,
        services: Services,
        recorder: Arc<Recorder>,
    }

    fn fixture(hold: bool) -> Fixture {
        let recorder = Recorder::new(hold);
        let mut registry = HandlerRegistry::new();
        registry
            .register(JobKind::GeneratePermutations, recorder.clone())
            .unwrap();
        registry
            .register(JobKind::SolveCandidates, Arc::new(SolveCandidatesHandler))
            .unwrap();
        let store = MemoryStore::new();
        let services = Services {
            store: Arc::new(store.clone()),
            ids: Arc::new(UlidGenerator::new(SystemClock)),
            clock: Arc::new(SystemClock),
            runner: Arc::new(JobRunner::new(registry)),
        };
        Fixture {
            store,
            services,
            recorder,
        }
    }

    fn submit(fixture: &Fixture) -> JobId {
        let job = JobRecord::new(
            fixture.services.ids.generate_job_id(),
            JobPayload::GeneratePermutations {
                formula_id: FormulaId::from_ulid(Ulid::new()),
            },
            fixture.services.clock.now(),
        );
        fixture.store.insert_job(&job).unwrap();
        job.id
    }

    fn status(store: &MemoryStore, job_id: JobId) -> JobStatus {
        store.job(job_id).unwrap().unwrap().status
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not met in time");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn thread_running(pool: &WorkerPool, job_id: JobId) -> WorkerThreadId {
        let mut found = None;
        wait_until(|| {
            found = pool
                .thread_details()
                .into_iter()
                .find(|detail| detail.job_id == Some(job_id))
                .map(|detail| detail.thread_id);
            found.is_some()
        });
        found.unwrap()
    }

    #[test]
    fn start_then_stop_leaves_nothing_live() {
        let fixture = fixture(true);
        let job_id = submit(&fixture);
        let pool = WorkerPool::start(fixture.services.clone(), 3).unwrap();
        assert_eq!(pool.live_thread_count(), 3);
        assert!(pool.is_active());
        wait_until(|| status(&fixture.store, job_id) == JobStatus::Running);

        pool.stop().unwrap();
        fixture.recorder.release();

        assert_eq!(pool.live_thread_count(), 0);
        assert!(pool.is_dead());
        assert_eq!(status(&fixture.store, job_id), JobStatus::Queued);
        assert!(fixture.store.formulas_by_job(job_id).unwrap().is_empty());
        let threads = fixture.store.threads_by_worker(pool.worker_id()).unwrap();
        assert_eq!(threads.len(), 3);
        assert!(threads.iter().all(|t| t.status == LiveStatus::Dead));
        assert_eq!(
            fixture.store.worker(pool.worker_id()).unwrap().status,
            LiveStatus::Dead
        );
    }

    #[test]
    fn kill_job_requeues_once_and_keeps_concurrency() {
        let fixture = fixture(true);
        let pool = WorkerPool::start(fixture.services.clone(), 1).unwrap();
        let a = submit(&fixture);
        let b = submit(&fixture);
        pool.enqueue(a).unwrap();
        pool.enqueue(b).unwrap();
        let thread_id = thread_running(&pool, a);

        pool.kill_job(thread_id, a).unwrap();

        assert_eq!(status(&fixture.store, a), JobStatus::Queued);
        assert!(fixture.store.formulas_by_job(a).unwrap().is_empty());
        assert_eq!(pool.live_thread_count(), 1);
        assert_eq!(
            fixture.store.thread(thread_id).unwrap().status,
            LiveStatus::Dead
        );
        // 代わりの thread は b で止まっている
        thread_running(&pool, b);
        assert_eq!(pool.queued_job_ids(), vec![a]);

        pool.stop().unwrap();
        fixture.recorder.release();
    }

    #[test]
    fn kill_job_rejects_wrong_thread_or_job() {
        let fixture = fixture(true);
        let pool = WorkerPool::start(fixture.services.clone(), 1).unwrap();
        let a = submit(&fixture);
        pool.enqueue(a).unwrap();
        let thread_id = thread_running(&pool, a);

        let unknown = WorkerThreadId::from_ulid(Ulid::new());
        assert!(matches!(
            pool.kill_job(unknown, a),
            Err(PoolError::UnknownThread(id)) if id == unknown
        ));
        let other = JobId::from_ulid(Ulid::new());
        assert!(matches!(
            pool.kill_job(thread_id, other),
            Err(PoolError::JobNotRunning { .. })
        ));
        assert_eq!(status(&fixture.store, a), JobStatus::Running);

        pool.stop().unwrap();
        fixture.recorder.release();
    }

    #[test]
    fn single_thread_runs_jobs_in_fifo_order() {
        let fixture = fixture(false);
        let pool = WorkerPool::start(fixture.services.clone(), 1).unwrap();
        let jobs: Vec<JobId> = (0..5).map(|_| submit(&fixture)).collect();
        for job_id in &jobs {
            pool.enqueue(*job_id).unwrap();
        }

        wait_until(|| {
            jobs.iter()
                .all(|job_id| status(&fixture.store, *job_id) == JobStatus::Completed)
        });
        assert_eq!(*fixture.recorder.seen.lock(), jobs);
        assert_eq!(pool.pending_count(), 0);
        pool.stop().unwrap();
    }

    #[test]
    fn start_picks_up_persisted_queued_jobs() {
        let fixture = fixture(false);
        let first = submit(&fixture);
        let second = submit(&fixture);

        let pool = WorkerPool::start(fixture.services.clone(), 1).unwrap();
        wait_until(|| status(&fixture.store, second) == JobStatus::Completed);

        assert_eq!(*fixture.recorder.seen.lock(), vec![first, second]);
        let job = fixture.store.job(first).unwrap().unwrap();
        assert_eq!(job.worker_id, Some(pool.worker_id()));
        assert_eq!(job.queue_order, Some(0));
        pool.stop().unwrap();
    }

    #[test]
    fn deleted_job_is_skipped() {
        let fixture = fixture(true);
        let pool = WorkerPool::start(fixture.services.clone(), 1).unwrap();
        let a = submit(&fixture);
        let b = submit(&fixture);
        let c = submit(&fixture);
        pool.enqueue(a).unwrap();
        thread_running(&pool, a);
        pool.enqueue(b).unwrap();
        pool.enqueue(c).unwrap();
        pool.mark_deleted(b);

        fixture.recorder.release();
        wait_until(|| status(&fixture.store, c) == JobStatus::Completed);

        assert_eq!(*fixture.recorder.seen.lock(), vec![a, c]);
        assert_eq!(status(&fixture.store, b), JobStatus::Queued);
        assert_eq!(pool.pending_count(), 0);
        pool.stop().unwrap();
    }

    #[test]
    fn popped_job_that_is_no_longer_queued_is_skipped() {
        let fixture = fixture(true);
        let pool = WorkerPool::start(fixture.services.clone(), 1).unwrap();
        let a = submit(&fixture);
        let b = submit(&fixture);
        let c = submit(&fixture);
        pool.enqueue(a).unwrap();
        thread_running(&pool, a);
        pool.enqueue(b).unwrap();
        pool.enqueue(c).unwrap();

        // b は別の thread が先に claim し、c は mark なしで store から消えた
        let elsewhere = WorkerThreadId::from_ulid(Ulid::new());
        assert!(fixture.store.mark_job_running(b, elsewhere).unwrap());
        assert!(fixture.store.delete_queued_job(c).unwrap());

        fixture.recorder.release();
        wait_until(|| pool.pending_count() == 0);

        assert_eq!(*fixture.recorder.seen.lock(), vec![a]);
        let b = fixture.store.job(b).unwrap().unwrap();
        assert_eq!(b.thread_id, Some(elsewhere));
        assert_eq!(b.attempts, 1);
        assert!(pool.shared.deleted.lock().is_empty());
        pool.stop().unwrap();
    }

    #[test]
    fn panicking_job_is_left_running_until_reconciled() {
        let fixture = fixture(false);
        fixture.recorder.panic_once.store(true, Ordering::SeqCst);
        let pool = WorkerPool::start(fixture.services.clone(), 1).unwrap();
        let job_id = submit(&fixture);
        pool.enqueue(job_id).unwrap();

        wait_until(|| pool.live_thread_count() == 0);
        assert_eq!(status(&fixture.store, job_id), JobStatus::Running);
        assert!(pool.is_dead());

        let requeued = pool.reconcile_orphans().unwrap();
        assert_eq!(requeued, vec![job_id]);
        assert_eq!(pool.live_thread_count(), 1);

        wait_until(|| status(&fixture.store, job_id) == JobStatus::Completed);
        assert_eq!(fixture.store.job(job_id).unwrap().unwrap().attempts, 2);
        pool.stop().unwrap();
    }

    #[test]
    fn debug_names_the_worker() {
        let fixture = fixture(false);
        let pool = WorkerPool::start(fixture.services.clone(), 2).unwrap();
        let printed = format!("{pool:?}");
        assert!(printed.contains(&pool.worker_id().to_string()));
        assert!(printed.contains("number_of_threads: 2"));
        pool.stop().unwrap();
    }

    #[test]
    fn enqueue_after_stop_fails() {
        let fixture = fixture(false);
        let pool = WorkerPool::start(fixture.services.clone(), 1).unwrap();
        pool.stop().unwrap();

        let job_id = submit(&fixture);
        assert!(matches!(pool.enqueue(job_id), Err(PoolError::QueueClosed(_))));
        assert_eq!(pool.pending_count(), 0);
    }

    #[test]
    fn killed_solve_stops_its_thread() {
        let fixture = fixture(true);
        // 6x6 の開いた grid は探索が終わらない
        let formula = FormulaRecord::new(
            fixture.services.ids.generate_formula_id(),
            None,
            Formula::new(MazeType::Simple, 6, 6, 1, 0, 0),
        );
        fixture.store.insert_formula(&formula).unwrap();
        let mut layout = vec![Label::Normal; 36];
        layout[0] = Label::endpoint(1, Side::A);
        layout[35] = Label::endpoint(1, Side::B);
        fixture
            .store
            .insert_permutation(&PermutationRecord {
                id: fixture.services.ids.generate_permutation_id(),
                job_id: JobId::from_ulid(Ulid::new()),
                formula_id: formula.id,
                layout,
            })
            .unwrap();
        let solve = JobRecord::new(
            fixture.services.ids.generate_job_id(),
            JobPayload::SolveCandidates {
                formula_id: formula.id,
            },
            fixture.services.clock.now(),
        );
        fixture.store.insert_job(&solve).unwrap();

        let pool = WorkerPool::start(fixture.services.clone(), 1).unwrap();
        let held = submit(&fixture);
        pool.enqueue(held).unwrap();
        let thread_id = thread_running(&pool, solve.id);
        let victim = pool
            .shared
            .threads
            .lock()
            .iter()
            .find(|thread| thread.id() == thread_id)
            .cloned()
            .unwrap();

        pool.kill_job(thread_id, solve.id).unwrap();

        // registry から外れた後、OS thread が抜ければ参照は手元の 1 つだけ
        wait_until(|| Arc::strong_count(&victim) == 1);
        assert_eq!(pool.live_thread_count(), 1);
        thread_running(&pool, held);
        assert_eq!(pool.queued_job_ids(), vec![solve.id]);
        assert!(fixture.store.candidates_for_formula(formula.id).unwrap().is_empty());

        pool.stop().unwrap();
        fixture.recorder.release();
    }
}
