//! JobQueue - closeable blocking FIFO
//!
//! # 実装詳細
//! - `VecDeque<T>` を parking_lot の Mutex で保護
//! - Condvar で push / close 時に待機中のスレッドを起こす
//! - close 後も残っている要素は pop で取り出せる（drain してから `None`）

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

use crate::domain::QueueClosed;

struct QueueState<T> {
    items: VecDeque<T>,
    open: bool,
}

/// Multi-producer multi-consumer FIFO shared by the worker threads.
///
/// # 使用例
/// ```
/// use mazeworks_core::queue::JobQueue;
///
/// let queue = JobQueue::new();
/// queue.push(1).unwrap();
/// queue.close();
/// assert_eq!(queue.pop(), Some(1));
/// assert_eq!(queue.pop(), None);
/// ```
pub struct JobQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
}

impl<T> JobQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                open: true,
            }),
            available: Condvar::new(),
        }
    }

    /// Appends `item`; fails only once the queue is closed.
    pub fn push(&self, item: T) -> Result<(), QueueClosed> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(QueueClosed);
        }
        state.items.push_back(item);
        // 待機中のスレッドに通知
        self.available.notify_one();
        Ok(())
    }

    /// Blocks until an item is available. Returns `None` once the queue is
    /// closed and drained.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if !state.open {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Idempotent. Wakes every blocked `pop`.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.open = false;
        self.available.notify_all();
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }
}

impl<T: Clone> JobQueue<T> {
    /// Items still waiting, front first.
    pub fn snapshot(&self) -> Vec<T> {
        self.state.lock().items.iter().cloned().collect()
    }
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
