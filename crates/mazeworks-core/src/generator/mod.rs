//! FormulaGenerator - enumerates formulas from per-type ranges.
//!
//! # 列挙順
//! maze type -> 幅 x（各 x について y = x-1, y = x）-> endpoints ->
//! barriers -> type 固有の extra 数
//!
//! 生成されたものは自然キー（8 項目）で既存と照合し、既存ならカウントだけ。

pub mod ranges;
pub mod validation;

pub use ranges::{Range, TypeRanges};
pub use validation::{Field, FieldValidation, FormulaValidation, describe_ranges};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::JobContext;
use crate::domain::{Formula, FormulaRecord, JobError, MazeType};

/// Counts reported by one generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub created: usize,
    pub existed: usize,
}

impl GenerationStats {
    fn add(&mut self, other: GenerationStats) {
        self.created += other.created;
        self.existed += other.existed;
    }
}

/// Every `(x, y)` shape for a width range: `(x, x - 1)` then `(x, x)`.
pub fn dimensions(width: Range) -> Vec<(u32, u32)> {
    width
        .values()
        .flat_map(|x| [(x, x.saturating_sub(1)), (x, x)])
        .filter(|(_, y)| *y > 0)
        .collect()
}

/// Every formula the ranges allow, before checking what is already stored.
///
/// Skips `endpoints == 1 && barriers == 0` (never solvable) and any
/// combination whose special squares would take more than half the grid.
pub fn enumerate(ranges: &TypeRanges) -> Vec<Formula> {
    let maze_type = ranges.maze_type;
    let mut formulas = Vec::new();
    for (x, y) in dimensions(ranges.x) {
        for endpoints in ranges.endpoints.values() {
            for barriers in ranges.barriers.values() {
                if endpoints == 1 && barriers == 0 {
                    continue;
                }
                for extra in ranges.own_extra().values() {
                    let formula = Formula::new(maze_type, x, y, endpoints, barriers, extra);
                    if fits(&formula) {
                        formulas.push(formula);
                    }
                }
            }
        }
    }
    formulas
}

/// Special squares leave at least half the grid (rounded up) for paths.
pub fn fits(formula: &Formula) -> bool {
    formula.special_cells() as usize <= formula.cell_count() / 2
}

/// Generates and persists formulas on behalf of a job.
pub struct FormulaGenerator<'a> {
    ctx: &'a JobContext,
}

impl<'a> FormulaGenerator<'a> {
    pub fn new(ctx: &'a JobContext) -> Self {
        Self { ctx }
    }

    /// Ranges are all loaded before anything is written, so a missing
    /// setting fails the job without partial output.
    pub fn generate(&self, maze_types: &[MazeType]) -> Result<GenerationStats, JobError> {
        let ranges = maze_types
            .iter()
            .map(|maze_type| TypeRanges::load(self.ctx.store(), *maze_type))
            .collect::<Result<Vec<_>, _>>()?;

        let mut stats = GenerationStats::default();
        for ranges in &ranges {
            let type_stats = self.save(enumerate(ranges))?;
            info!(
                job_id = %self.ctx.job_id(),
                maze_type = %ranges.maze_type,
                created = type_stats.created,
                existed = type_stats.existed,
                "generated formulas"
            );
            stats.add(type_stats);
        }
        Ok(stats)
    }

    fn save(&self, formulas: Vec<Formula>) -> Result<GenerationStats, JobError> {
        let mut stats = GenerationStats::default();
        for formula in formulas {
            self.ctx.checkpoint()?;
            if self.ctx.store().formula_exists(&formula.key())? {
                stats.existed += 1;
                continue;
            }
            let record = FormulaRecord::new(
                self.ctx.ids().generate_formula_id(),
                Some(self.ctx.job_id()),
                formula,
            );
            debug!(formula_id = %record.id, "saving formula");
            self.ctx.write(|store| store.insert_formula(&record))?;
            stats.created += 1;
        }
        Ok(stats)
    }
}
