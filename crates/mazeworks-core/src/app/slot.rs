//! PoolSlot - process 内で高々 1 つの WorkerPool を保持する
//!
//! `start` は既に pool があれば `AlreadyRunning` で拒否し、上書きしない。
//! `stop` は pool を止めてから slot を空にする。

use parking_lot::Mutex;
use std::sync::Arc;

use super::pool::WorkerPool;
use crate::domain::PoolError;

pub struct PoolSlot {
    current: Mutex<Option<Arc<WorkerPool>>>,
}

static GLOBAL: PoolSlot = PoolSlot::new();

impl PoolSlot {
    pub const fn new() -> Self {
        Self {
            current: parking_lot::const_mutex(None),
        }
    }

    /// The process-wide slot.
    pub fn global() -> &'static PoolSlot {
        &GLOBAL
    }

    /// Runs `start` and stores its pool, unless one is already held.
    pub fn start(
        &self,
        start: impl FnOnce() -> Result<WorkerPool, PoolError>,
    ) -> Result<Arc<WorkerPool>, PoolError> {
        let mut current = self.current.lock();
        if current.is_some() {
            return Err(PoolError::AlreadyRunning);
        }
        let pool = Arc::new(start()?);
        *current = Some(pool.clone());
        Ok(pool)
    }

    pub fn stop(&self) -> Result<(), PoolError> {
        let mut current = self.current.lock();
        let pool = current.as_ref().ok_or(PoolError::NotRunning)?;
        pool.stop()?;
        *current = None;
        Ok(())
    }

    pub fn current(&self) -> Option<Arc<WorkerPool>> {
        self.current.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        self.current().is_some_and(|pool| pool.is_active())
    }
}

impl Default for PoolSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pool::Services;
    use crate::app::runner::JobRunner;
    use crate::impls::MemoryStore;
    use crate::ports::{SystemClock, UlidGenerator};
    use serial_test::serial;

    fn services() -> Services {
        Services {
            store: Arc::new(MemoryStore::new()),
            ids: Arc::new(UlidGenerator::new(SystemClock)),
            clock: Arc::new(SystemClock),
            runner: Arc::new(JobRunner::standard()),
        }
    }

    #[test]
    fn second_start_is_rejected() {
        let slot = PoolSlot::new();
        let first = slot.start(|| WorkerPool::start(services(), 1)).unwrap();

        let err = slot
            .start(|| WorkerPool::start(services(), 1))
            .unwrap_err();
        assert!(matches!(err, PoolError::AlreadyRunning));
        assert_eq!(slot.current().unwrap().worker_id(), first.worker_id());

        slot.stop().unwrap();
    }

    #[test]
    fn stop_clears_the_slot() {
        let slot = PoolSlot::new();
        assert!(matches!(slot.stop(), Err(PoolError::NotRunning)));

        let pool = slot.start(|| WorkerPool::start(services(), 2)).unwrap();
        assert!(slot.is_active());

        slot.stop().unwrap();
        assert!(slot.current().is_none());
        assert!(!slot.is_active());
        assert!(pool.is_dead());
    }

    #[test]
    fn failed_start_leaves_slot_empty() {
        let slot = PoolSlot::new();
        let err = slot.start(|| Err(PoolError::NotRunning)).unwrap_err();
        assert!(matches!(err, PoolError::NotRunning));
        assert!(slot.current().is_none());
    }

    #[test]
    #[serial]
    fn global_slot_restarts_after_stop() {
        let slot = PoolSlot::global();
        slot.start(|| WorkerPool::start(services(), 1)).unwrap();
        slot.stop().unwrap();
        slot.start(|| WorkerPool::start(services(), 1)).unwrap();
        assert!(slot.is_active());
        slot.stop().unwrap();
    }
}
