//! Domain model (ids, maze types, squares, formulas, permutations, jobs,
//! workers, errors).

pub mod errors;
pub mod formula;
pub mod ids;
pub mod job;
pub mod maze_type;
pub mod permutation;
pub mod square;
pub mod worker;

pub use errors::{ConfigError, JobError, PoolError, QueueClosed, StoreError};
pub use formula::{Formula, FormulaKey, FormulaRecord, FormulaStatus};
pub use ids::{
    CandidateId, FormulaId, Id, IdMarker, JobId, PermutationId, WorkerId, WorkerThreadId,
};
pub use job::{JobKind, JobOutcome, JobPayload, JobRecord, JobStatus};
pub use maze_type::{ExtraKind, MazeType};
pub use permutation::{CandidateRecord, Layout, PermutationRecord, SolutionPath};
pub use square::{Label, PairKind, Side};
pub use worker::{LiveStatus, ThreadDetail, ThreadMode, ThreadRecord, WorkerRecord};
