//! SymmetryReducer - expands a formula into canonical placements.
//!
//! # 列挙
//! unique square set の各並び（多重集合として重複なし）について、
//! x·y 個のセルから k 個の位置を昇順に選ぶ組み合わせをすべて回し、
//! 並びの順に special square を置く。残りは normal。
//! 並び × 位置の組で、k 個の special square の全配置になる。
//!
//! # 重複排除
//! 保存前に、grid の対称変換（D4）による像のどれかが既に保存済みなら
//! スキップする。保存されるのは対称クラスごとに 1 つだけ。

use tracing::info;

use crate::app::JobContext;
use crate::domain::{Formula, FormulaId, JobError, Label, Layout, PermutationRecord};
use crate::grid::symmetry;

/// Rearranges `items` into the next lexicographic ordering. Returns
/// `false` (leaving `items` sorted ascending) after the last one.
fn next_permutation<T: Ord>(items: &mut [T]) -> bool {
    let Some(pivot) = items.windows(2).rposition(|pair| pair[0] < pair[1]) else {
        items.reverse();
        return false;
    };
    let Some(successor) = items.iter().rposition(|item| *item > items[pivot]) else {
        return false;
    };
    items.swap(pivot, successor);
    items[pivot + 1..].reverse();
    true
}

/// Advances strictly increasing `positions` to the next k-combination of
/// `0..cells`. Returns `false` after the last one.
fn next_combination(positions: &mut [usize], cells: usize) -> bool {
    let k = positions.len();
    let Some(i) = (0..k).rev().find(|&i| positions[i] < cells - k + i) else {
        return false;
    };
    positions[i] += 1;
    for j in i + 1..k {
        positions[j] = positions[j - 1] + 1;
    }
    true
}

/// Distinct orderings of a multiset of labels, in lexicographic order.
pub fn orderings(set: &[Label]) -> Vec<Vec<Label>> {
    let mut current = set.to_vec();
    current.sort();
    let mut orderings = Vec::new();
    loop {
        if current.last() != Some(&Label::Normal) {
            orderings.push(current.clone());
        }
        if !next_permutation(&mut current) {
            break;
        }
    }
    orderings
}

/// Every way to lay `ordering` out on `cells` squares, keeping its order.
/// Yields C(cells, k) layouts.
pub fn spreads(ordering: &[Label], cells: usize) -> Vec<Layout> {
    let k = ordering.len();
    if k > cells {
        return Vec::new();
    }
    let mut positions: Vec<usize> = (0..k).collect();
    let mut layouts = Vec::new();
    loop {
        let mut layout = vec![Label::Normal; cells];
        for (label, &position) in ordering.iter().zip(&positions) {
            layout[position] = *label;
        }
        layouts.push(layout);
        if !next_combination(&mut positions, cells) {
            break;
        }
    }
    layouts
}

/// Every raw placement for a formula, before symmetry reduction.
pub fn placements(formula: &Formula) -> impl Iterator<Item = Layout> + '_ {
    let cells = formula.cell_count();
    orderings(&formula.unique_square_set)
        .into_iter()
        .flat_map(move |ordering| spreads(&ordering, cells))
}

/// Persists canonical placements for a formula on behalf of a job.
pub struct SymmetryReducer<'a> {
    ctx: &'a JobContext,
}

impl<'a> SymmetryReducer<'a> {
    pub fn new(ctx: &'a JobContext) -> Self {
        Self { ctx }
    }

    /// Returns the number of newly persisted placements.
    pub fn generate_permutations(&self, formula_id: FormulaId) -> Result<usize, JobError> {
        let record = self
            .ctx
            .store()
            .formula(formula_id)?
            .ok_or(JobError::FormulaNotFound(formula_id))?;
        let formula = &record.formula;
        let (width, height) = (formula.x as usize, formula.y as usize);

        let mut created = 0;
        for layout in placements(formula) {
            self.ctx.checkpoint()?;
            if self.seen(formula_id, &layout, width, height)? {
                continue;
            }
            let permutation = PermutationRecord {
                id: self.ctx.ids().generate_permutation_id(),
                job_id: self.ctx.job_id(),
                formula_id,
                layout,
            };
            self.ctx.write(|store| store.insert_permutation(&permutation))?;
            created += 1;
        }

        info!(
            job_id = %self.ctx.job_id(),
            formula_id = %formula_id,
            created,
            "generated permutations"
        );
        Ok(created)
    }

    /// Whether the layout or any of its symmetric images is stored.
    fn seen(
        &self,
        formula_id: FormulaId,
        layout: &[Label],
        width: usize,
        height: usize,
    ) -> Result<bool, JobError> {
        for image in symmetry::images(layout, width, height) {
            if self.ctx.store().permutation_exists(formula_id, &image)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
