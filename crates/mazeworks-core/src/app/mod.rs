//! App - アプリケーション層
//!
//! ports と domain のロジックを組み合わせて、worker pool と job 実行を
//! 実装します。
//!
//! # 主要コンポーネント
//! - **JobRunner / RunnerBuilder**: job kind ごとの handler dispatch
//! - **JobContext**: job から見た store（書き込みは fence を通す）
//! - **WorkerPool / WorkerThread**: OS thread の pool と各 thread の本体
//! - **PoolSlot**: process 内で 1 つだけの pool を保持する slot
//! - **Control**: 外部から呼ばれる操作（start/stop、enqueue、kill など）

pub mod builder;
pub mod context;
pub mod control;
pub mod pool;
pub mod runner;
pub mod slot;
pub mod thread;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, RunnerBuilder};
pub use self::context::JobContext;
pub use self::control::{Control, MAX_THREADS, MIN_THREADS, NUMBER_OF_THREADS};
pub use self::pool::{Services, WorkerPool};
pub use self::runner::{
    GenerateFormulasHandler, GeneratePermutationsHandler, HandlerRegistry, JobHandler, JobRunner,
    RegistryError, SolveCandidatesHandler,
};
pub use self::slot::PoolSlot;
pub use self::thread::WorkerThread;
