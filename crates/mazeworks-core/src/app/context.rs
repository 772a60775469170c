//! JobContext - 実行中の job から見た store / id 生成器
//!
//! 書き込みは必ず `write` を通す。worker thread 上で動いている場合、
//! `write` はその thread の slot ロックを取り、kill 済みなら
//! `JobError::Cancelled` を返して何も書かない。

use std::sync::Arc;

use super::thread::WorkerThread;
use crate::domain::{JobError, JobId, StoreError};
use crate::ports::{IdGenerator, Store};

pub struct JobContext {
    job_id: JobId,
    store: Arc<dyn Store>,
    ids: Arc<dyn IdGenerator>,
    thread: Option<Arc<WorkerThread>>,
}

impl JobContext {
    /// Context for running a job outside any worker thread (tests, CLI
    /// one-shots). Writes are never fenced.
    pub fn detached(job_id: JobId, store: Arc<dyn Store>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            job_id,
            store,
            ids,
            thread: None,
        }
    }

    pub(crate) fn on_thread(
        job_id: JobId,
        store: Arc<dyn Store>,
        ids: Arc<dyn IdGenerator>,
        thread: Arc<WorkerThread>,
    ) -> Self {
        Self {
            job_id,
            store,
            ids,
            thread: Some(thread),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Read access. Reads are not fenced.
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    /// Runs one persisted write, unless the job's thread has been killed.
    pub fn write<R>(
        &self,
        op: impl FnOnce(&dyn Store) -> Result<R, StoreError>,
    ) -> Result<R, JobError> {
        match &self.thread {
            None => Ok(op(self.store.as_ref())?),
            Some(thread) => thread.fenced(|| op(self.store.as_ref())),
        }
    }

    /// Fails with `Cancelled` once the thread is killed. Long computations
    /// call this between writes so a killed job stops early.
    pub fn checkpoint(&self) -> Result<(), JobError> {
        if self.is_cancelled() {
            return Err(JobError::Cancelled);
        }
        Ok(())
    }

    pub fn is_cancelled(&self) -> bool {
        self.thread.as_ref().is_some_and(|thread| thread.is_killed())
    }
}
