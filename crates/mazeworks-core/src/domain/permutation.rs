//! Permutations (placements of a formula's special squares) and the
//! candidates solved from them.

use serde::{Deserialize, Serialize};

use super::ids::{CandidateId, FormulaId, JobId, PermutationId};
use super::square::Label;

/// A full row-major layout, one label per cell.
pub type Layout = Vec<Label>;

/// One cell index path through a grid.
pub type SolutionPath = Vec<usize>;

/// A persisted placement belonging to exactly one formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermutationRecord {
    pub id: PermutationId,
    pub job_id: JobId,
    pub formula_id: FormulaId,
    pub layout: Layout,
}

/// A permutation the solver found at least one solution for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub job_id: JobId,
    pub formula_id: FormulaId,
    pub permutation_id: PermutationId,
    pub solutions: Vec<SolutionPath>,
}

impl CandidateRecord {
    /// Puzzles are only interesting to play when the answer is unique.
    pub fn has_unique_solution(&self) -> bool {
        self.solutions.len() == 1
    }
}
