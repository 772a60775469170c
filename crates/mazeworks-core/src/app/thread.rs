//! WorkerThread - one OS thread of the pool and its body.
//!
//! # 状態遷移
//! - waiting: `pop()` でブロック中
//! - processing: job 実行中（slot に job id を記録）
//! - retiring: queue が close されて drain し終わった
//! - dead: registry から外れ、store 上も dead
//!
//! # Fence
//! `slot` の Mutex が kill との同期点になる。job の状態遷移と、job が行う
//! 全ての書き込みは slot ロックを保持したまま行われ、`killed` が立った
//! 後は何も書かない。ロック順は registry -> slot -> store。

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

use super::context::JobContext;
use super::pool::PoolShared;
use crate::domain::{JobError, JobId, LiveStatus, StoreError, ThreadDetail, ThreadMode, WorkerThreadId};

struct ThreadSlot {
    mode: ThreadMode,
    job: Option<JobId>,
    killed: bool,
}

pub struct WorkerThread {
    id: WorkerThreadId,
    slot: Mutex<ThreadSlot>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerThread {
    pub(crate) fn new(id: WorkerThreadId) -> Self {
        Self {
            id,
            slot: Mutex::new(ThreadSlot {
                mode: ThreadMode::Waiting,
                job: None,
                killed: false,
            }),
            handle: Mutex::new(None),
        }
    }

    pub fn id(&self) -> WorkerThreadId {
        self.id
    }

    pub fn mode(&self) -> ThreadMode {
        self.slot.lock().mode
    }

    pub fn current_job(&self) -> Option<JobId> {
        self.slot.lock().job
    }

    pub fn is_killed(&self) -> bool {
        self.slot.lock().killed
    }

    /// Not killed, and the OS thread has not exited (or panicked).
    pub fn is_alive(&self) -> bool {
        !self.is_killed()
            && self
                .handle
                .lock()
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Exited without being killed: the job it was running panicked.
    pub(crate) fn is_orphaned(&self) -> bool {
        !self.is_killed()
            && self
                .handle
                .lock()
                .as_ref()
                .is_some_and(|handle| handle.is_finished())
    }

    pub fn detail(&self) -> ThreadDetail {
        let (mode, job_id) = {
            let slot = self.slot.lock();
            (slot.mode, slot.job)
        };
        ThreadDetail {
            thread_id: self.id,
            job_id,
            alive: self.is_alive(),
            mode,
        }
    }

    pub(crate) fn attach(&self, handle: JoinHandle<()>) {
        *self.handle.lock() = Some(handle);
    }

    /// Drops the join handle; the OS thread runs on until its next fence.
    pub(crate) fn detach(&self) {
        self.handle.lock().take();
    }

    /// Raises the fence unconditionally.
    pub(crate) fn kill(&self) {
        self.slot.lock().killed = true;
    }

    /// Raises the fence only if the thread is running `job_id`.
    pub(crate) fn kill_if_running(&self, job_id: JobId) -> bool {
        let mut slot = self.slot.lock();
        if slot.killed || slot.job != Some(job_id) {
            return false;
        }
        slot.killed = true;
        true
    }

    /// Runs `op` while holding the slot lock, unless killed.
    pub(crate) fn fenced<R>(
        &self,
        op: impl FnOnce() -> Result<R, StoreError>,
    ) -> Result<R, JobError> {
        let slot = self.slot.lock();
        if slot.killed {
            return Err(JobError::Cancelled);
        }
        Ok(op()?)
    }
}

/// Logs a thread that dies mid-job. The job stays running in the store
/// until it is reconciled.
struct PanicGuard<'a> {
    shared: &'a PoolShared,
    thread: &'a WorkerThread,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }
        let job_id = self.thread.current_job();
        error!(
            thread_id = %self.thread.id,
            ?job_id,
            "worker thread panicked; job left running"
        );
        if let Err(err) = self
            .shared
            .store
            .update_thread_status(self.thread.id, LiveStatus::Dead)
        {
            warn!(thread_id = %self.thread.id, error = %err, "failed to record dead thread");
        }
    }
}

/// Body of every pool thread.
pub(crate) fn run(shared: Arc<PoolShared>, me: Arc<WorkerThread>) {
    let _guard = PanicGuard {
        shared: &shared,
        thread: &me,
    };
    debug!(thread_id = %me.id, "worker thread started");

    loop {
        {
            let mut slot = me.slot.lock();
            if slot.killed {
                return;
            }
            slot.mode = ThreadMode::Waiting;
            slot.job = None;
        }

        let Some(job_id) = shared.queue.pop() else {
            retire(&shared, &me);
            return;
        };

        if shared.take_deleted(job_id) {
            debug!(thread_id = %me.id, job_id = %job_id, "skipping deleted job");
            continue;
        }

        let job = match shared.store.job(job_id) {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(thread_id = %me.id, job_id = %job_id, "queued job no longer exists");
                shared.release_pending();
                continue;
            }
            Err(err) => {
                error!(thread_id = %me.id, job_id = %job_id, error = %err, "failed to load job");
                shared.release_pending();
                continue;
            }
        };

        // dispatch
        {
            let mut slot = me.slot.lock();
            if slot.killed {
                return;
            }
            match shared.store.mark_job_running(job_id, me.id) {
                Ok(true) => {}
                Ok(false) => {
                    // 削除と pop が競合した
                    debug!(thread_id = %me.id, job_id = %job_id, "job no longer queued; skipping");
                    if !shared.take_deleted(job_id) {
                        shared.release_pending();
                    }
                    continue;
                }
                Err(err) => {
                    error!(thread_id = %me.id, job_id = %job_id, error = %err, "failed to mark job running");
                    shared.release_pending();
                    continue;
                }
            }
            slot.mode = ThreadMode::Processing;
            slot.job = Some(job_id);
            shared.release_pending();
        }
        info!(thread_id = %me.id, job_id = %job_id, kind = %job.kind(), "job started");

        let ctx = JobContext::on_thread(job_id, shared.store.clone(), shared.ids.clone(), me.clone());
        let result = shared.runner.run(&ctx, &job.payload);

        let mut slot = me.slot.lock();
        if slot.killed {
            debug!(thread_id = %me.id, job_id = %job_id, "job was cancelled");
            return;
        }
        match result {
            Ok(outcome) => {
                if let Err(err) = shared.store.mark_job_completed(job_id, outcome) {
                    error!(job_id = %job_id, error = %err, "failed to mark job completed");
                } else {
                    info!(thread_id = %me.id, job_id = %job_id, ?outcome, "job completed");
                }
            }
            Err(JobError::Cancelled) => return,
            Err(err) => {
                error!(thread_id = %me.id, job_id = %job_id, error = %err, "job failed");
                if let Err(store_err) = shared.store.mark_job_failed(job_id, &err.to_string()) {
                    error!(job_id = %job_id, error = %store_err, "failed to mark job failed");
                }
            }
        }
        slot.job = None;
        slot.mode = ThreadMode::Waiting;
    }
}

/// Queue closed and drained: leave the registry and record the thread dead.
fn retire(shared: &PoolShared, me: &WorkerThread) {
    {
        let mut threads = shared.threads.lock();
        if me.is_killed() {
            return;
        }
        threads.retain(|thread| thread.id != me.id);
    }
    if let Err(err) = shared.store.update_thread_status(me.id, LiveStatus::Dead) {
        warn!(thread_id = %me.id, error = %err, "failed to record retired thread");
    }
    info!(thread_id = %me.id, "worker thread retired");
}

impl PoolShared {
    pub(crate) fn release_pending(&self) {
        let _ = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}
