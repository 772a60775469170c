//! Job record and status management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{FormulaId, JobId, WorkerId, WorkerThreadId};
use super::maze_type::MazeType;

/// Job status.
///
/// State transitions:
/// - Queued -> Running -> Completed
/// - Queued -> Running -> Failed (the job returned an error)
/// - Running -> Queued (cancelled by `kill_job`, or reconciled by `stop`)
///
/// A job whose thread panicked stays Running until it is reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Discriminant of [`JobPayload`], used to look up handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    GenerateFormulas,
    GeneratePermutations,
    SolveCandidates,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [
        JobKind::GenerateFormulas,
        JobKind::GeneratePermutations,
        JobKind::SolveCandidates,
    ];
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::GenerateFormulas => "generate_formulas",
            JobKind::GeneratePermutations => "generate_permutations",
            JobKind::SolveCandidates => "solve_candidates",
        };
        f.write_str(name)
    }
}

/// What a job generates or solves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    /// Enumerate formulas for the given maze types.
    GenerateFormulas { maze_types: Vec<MazeType> },
    /// Expand one formula into canonical permutations.
    GeneratePermutations { formula_id: FormulaId },
    /// Solve a formula's permutations and keep the solvable ones.
    SolveCandidates { formula_id: FormulaId },
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::GenerateFormulas { .. } => JobKind::GenerateFormulas,
            JobPayload::GeneratePermutations { .. } => JobKind::GeneratePermutations,
            JobPayload::SolveCandidates { .. } => JobKind::SolveCandidates,
        }
    }
}

/// Summary a finished job leaves on its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobOutcome {
    Formulas { created: usize, existed: usize },
    Permutations { created: usize },
    Candidates { checked: usize, solved: usize },
}

/// Persisted job record.
///
/// Design:
/// - State transitions via methods (not direct field access) where the
///   store keeps records in memory.
/// - `worker_id` is set on enqueue, `thread_id` on dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub payload: JobPayload,
    pub status: JobStatus,
    pub worker_id: Option<WorkerId>,
    pub thread_id: Option<WorkerThreadId>,
    /// Position in the queue at the time it was last enqueued.
    pub queue_order: Option<u64>,
    /// Number of times a thread picked this job up.
    pub attempts: u32,
    pub outcome: Option<JobOutcome>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(id: JobId, payload: JobPayload, now: DateTime<Utc>) -> Self {
        Self {
            id,
            payload,
            status: JobStatus::Queued,
            worker_id: None,
            thread_id: None,
            queue_order: None,
            attempts: 0,
            outcome: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> JobKind {
        self.payload.kind()
    }

    pub fn assign(&mut self, worker_id: WorkerId, queue_order: u64, now: DateTime<Utc>) {
        self.worker_id = Some(worker_id);
        self.queue_order = Some(queue_order);
        self.updated_at = now;
    }

    /// Mark as running on `thread_id` (increments attempts).
    pub fn start(&mut self, thread_id: WorkerThreadId, now: DateTime<Utc>) {
        self.status = JobStatus::Running;
        self.thread_id = Some(thread_id);
        self.attempts += 1;
        self.updated_at = now;
    }

    pub fn complete(&mut self, outcome: JobOutcome, now: DateTime<Utc>) {
        self.status = JobStatus::Completed;
        self.outcome = Some(outcome);
        self.last_error = None;
        self.updated_at = now;
    }

    pub fn fail(&mut self, error: String, now: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.last_error = Some(error);
        self.updated_at = now;
    }

    /// Back to Queued, unassigned from any thread.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Queued;
        self.thread_id = None;
        self.outcome = None;
        self.updated_at = now;
    }
}
