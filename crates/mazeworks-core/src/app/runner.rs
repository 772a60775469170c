//! JobRunner - job kind ごとに handler へ dispatch する
//!
//! # 設計
//! - HandlerRegistry は初期化時に構築（mutable）
//! - 実行時は immutable に共有（ロック不要）

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::context::JobContext;
use crate::domain::{
    CandidateRecord, FormulaId, JobError, JobKind, JobOutcome, JobPayload, MazeType,
};
use crate::generator::FormulaGenerator;
use crate::reducer::SymmetryReducer;
use crate::solver::MazeSolver;

/// Executes one kind of job.
pub trait JobHandler: Send + Sync {
    fn handle(&self, ctx: &JobContext, payload: &JobPayload) -> Result<JobOutcome, JobError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("handler already registered for job kind {0}")]
    DuplicateHandler(JobKind),
}

/// Registry of handlers (job kind -> handler).
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The handlers for every built-in job kind.
    pub fn standard() -> Self {
        let mut handlers: HashMap<JobKind, Arc<dyn JobHandler>> = HashMap::new();
        handlers.insert(JobKind::GenerateFormulas, Arc::new(GenerateFormulasHandler));
        handlers.insert(JobKind::GeneratePermutations, Arc::new(GeneratePermutationsHandler));
        handlers.insert(JobKind::SolveCandidates, Arc::new(SolveCandidatesHandler));
        Self { handlers }
    }

    pub fn register(
        &mut self,
        kind: JobKind,
        handler: Arc<dyn JobHandler>,
    ) -> Result<(), RegistryError> {
        if self.handlers.contains_key(&kind) {
            return Err(RegistryError::DuplicateHandler(kind));
        }
        self.handlers.insert(kind, handler);
        Ok(())
    }

    pub fn get(&self, kind: JobKind) -> Option<&Arc<dyn JobHandler>> {
        self.handlers.get(&kind)
    }

    pub fn kinds(&self) -> Vec<JobKind> {
        let mut kinds: Vec<JobKind> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Runs a job payload by dispatching to its registered handler.
pub struct JobRunner {
    registry: HandlerRegistry,
}

impl JobRunner {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    pub fn standard() -> Self {
        Self::new(HandlerRegistry::standard())
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn run(&self, ctx: &JobContext, payload: &JobPayload) -> Result<JobOutcome, JobError> {
        let kind = payload.kind();
        let handler = self
            .registry
            .get(kind)
            .ok_or(JobError::HandlerNotFound(kind))?;
        handler.handle(ctx, payload)
    }
}

fn unexpected(payload: &JobPayload) -> JobError {
    JobError::Other(format!("unexpected payload for handler: {}", payload.kind()))
}

/// `GenerateFormulas`: enumerate and persist formulas.
pub struct GenerateFormulasHandler;

impl JobHandler for GenerateFormulasHandler {
    fn handle(&self, ctx: &JobContext, payload: &JobPayload) -> Result<JobOutcome, JobError> {
        let JobPayload::GenerateFormulas { maze_types } = payload else {
            return Err(unexpected(payload));
        };
        let types: &[MazeType] = if maze_types.is_empty() {
            &MazeType::ALL
        } else {
            maze_types.as_slice()
        };
        let stats = FormulaGenerator::new(ctx).generate(types)?;
        Ok(JobOutcome::Formulas {
            created: stats.created,
            existed: stats.existed,
        })
    }
}

/// `GeneratePermutations`: expand one formula into canonical placements.
pub struct GeneratePermutationsHandler;

impl JobHandler for GeneratePermutationsHandler {
    fn handle(&self, ctx: &JobContext, payload: &JobPayload) -> Result<JobOutcome, JobError> {
        let JobPayload::GeneratePermutations { formula_id } = payload else {
            return Err(unexpected(payload));
        };
        let created = SymmetryReducer::new(ctx).generate_permutations(*formula_id)?;
        Ok(JobOutcome::Permutations { created })
    }
}

/// `SolveCandidates`: solve every stored permutation of a formula and keep
/// the solvable ones as candidates.
pub struct SolveCandidatesHandler;

impl JobHandler for SolveCandidatesHandler {
    fn handle(&self, ctx: &JobContext, payload: &JobPayload) -> Result<JobOutcome, JobError> {
        let JobPayload::SolveCandidates { formula_id } = payload else {
            return Err(unexpected(payload));
        };
        let (checked, solved) = solve_candidates(ctx, *formula_id)?;
        Ok(JobOutcome::Candidates { checked, solved })
    }
}

fn solve_candidates(ctx: &JobContext, formula_id: FormulaId) -> Result<(usize, usize), JobError> {
    let record = ctx
        .store()
        .formula(formula_id)?
        .ok_or(JobError::FormulaNotFound(formula_id))?;
    let formula = &record.formula;
    let permutations = ctx.store().permutations_for_formula(formula_id)?;

    let mut solved = 0;
    for permutation in &permutations {
        ctx.checkpoint()?;
        let solver = MazeSolver::from_layout(
            formula.x as usize,
            formula.y as usize,
            permutation.layout.clone(),
            formula.maze_type,
        )
        .map_err(|err| JobError::Other(format!("permutation {}: {err}", permutation.id)))?;

        let solutions = solver
            .solutions_until(|| ctx.is_cancelled())
            .ok_or(JobError::Cancelled)?;
        if solutions.is_empty() {
            continue;
        }
        let candidate = CandidateRecord {
            id: ctx.ids().generate_candidate_id(),
            job_id: ctx.job_id(),
            formula_id,
            permutation_id: permutation.id,
            solutions,
        };
        ctx.write(|store| store.insert_candidate(&candidate))?;
        solved += 1;
    }

    info!(
        job_id = %ctx.job_id(),
        formula_id = %formula_id,
        checked = permutations.len(),
        solved,
        "solved candidates"
    );
    Ok((permutations.len(), solved))
}
