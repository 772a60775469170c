//! Maze formulas: a fully specified parameter set for one class of maze.

use serde::{Deserialize, Serialize};

use super::ids::{FormulaId, JobId};
use super::maze_type::{ExtraKind, MazeType};
use super::square::{Label, Side};

/// Approval status of a persisted formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaStatus {
    Pending,
    Approved,
    Rejected,
}

/// Parameters of one maze class plus the special squares it requires.
///
/// Exactly one of `bridges`/`tunnels`/`portals` may be non-zero, matching
/// `maze_type` (validation reports anything else).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    pub maze_type: MazeType,
    pub x: u32,
    pub y: u32,
    pub endpoints: u32,
    pub barriers: u32,
    pub bridges: u32,
    pub tunnels: u32,
    pub portals: u32,
    /// Relaxes range validation for off-catalogue mazes.
    #[serde(default)]
    pub experiment: bool,
    pub unique_square_set: Vec<Label>,
}

/// Natural key of a formula: everything but the experiment flag and set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormulaKey {
    pub maze_type: MazeType,
    pub x: u32,
    pub y: u32,
    pub endpoints: u32,
    pub barriers: u32,
    pub bridges: u32,
    pub tunnels: u32,
    pub portals: u32,
}

impl Formula {
    /// Builds a formula for `maze_type`, placing `extra` squares of the
    /// type's own extra kind (ignored for simple mazes).
    pub fn new(maze_type: MazeType, x: u32, y: u32, endpoints: u32, barriers: u32, extra: u32) -> Self {
        let (bridges, tunnels, portals) = match maze_type.extra() {
            None => (0, 0, 0),
            Some(ExtraKind::Bridge) => (extra, 0, 0),
            Some(ExtraKind::Tunnel) => (0, extra, 0),
            Some(ExtraKind::Portal) => (0, 0, extra),
        };
        Self::from_counts(maze_type, x, y, endpoints, barriers, bridges, tunnels, portals)
    }

    /// Builds a formula from raw counts, e.g. as submitted by a form.
    #[allow(clippy::too_many_arguments)]
    pub fn from_counts(
        maze_type: MazeType,
        x: u32,
        y: u32,
        endpoints: u32,
        barriers: u32,
        bridges: u32,
        tunnels: u32,
        portals: u32,
    ) -> Self {
        let mut formula = Self {
            maze_type,
            x,
            y,
            endpoints,
            barriers,
            bridges,
            tunnels,
            portals,
            experiment: false,
            unique_square_set: Vec::new(),
        };
        formula.unique_square_set = formula.build_unique_square_set();
        formula
    }

    pub fn experiment(mut self) -> Self {
        self.experiment = true;
        self
    }

    pub fn key(&self) -> FormulaKey {
        FormulaKey {
            maze_type: self.maze_type,
            x: self.x,
            y: self.y,
            endpoints: self.endpoints,
            barriers: self.barriers,
            bridges: self.bridges,
            tunnels: self.tunnels,
            portals: self.portals,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.x as usize * self.y as usize
    }

    /// Count of the type's own extra square kind.
    pub fn extra_count(&self) -> u32 {
        match self.maze_type.extra() {
            None => 0,
            Some(kind) => self.count_of(kind),
        }
    }

    pub fn count_of(&self, kind: ExtraKind) -> u32 {
        match kind {
            ExtraKind::Bridge => self.bridges,
            ExtraKind::Tunnel => self.tunnels,
            ExtraKind::Portal => self.portals,
        }
    }

    /// Cells taken by special squares.
    pub fn special_cells(&self) -> u32 {
        2 * self.endpoints + 2 * self.portals + 2 * self.tunnels + self.bridges + self.barriers
    }

    /// Endpoint pairs first, then portal pairs, tunnel pairs, bridges and
    /// barriers.
    fn build_unique_square_set(&self) -> Vec<Label> {
        let mut set = Vec::with_capacity(self.special_cells() as usize);
        push_pairs(&mut set, self.endpoints, Label::endpoint);
        push_pairs(&mut set, self.portals, Label::portal);
        push_pairs(&mut set, self.tunnels, Label::tunnel);
        set.extend(std::iter::repeat_n(Label::Bridge, self.bridges as usize));
        set.extend(std::iter::repeat_n(Label::Barrier, self.barriers as usize));
        set
    }
}

fn push_pairs(set: &mut Vec<Label>, count: u32, label: fn(u8, Side) -> Label) {
    for group in 1..=count {
        // グループ番号は 1 始まり。u8 を超える数は生成範囲に入らない
        let group = u8::try_from(group).unwrap_or(u8::MAX);
        set.push(label(group, Side::A));
        set.push(label(group, Side::B));
    }
}

/// A persisted formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaRecord {
    pub id: FormulaId,
    /// The job that generated it; `None` for hand-entered formulas.
    pub job_id: Option<JobId>,
    pub formula: Formula,
    pub status: FormulaStatus,
}

impl FormulaRecord {
    pub fn new(id: FormulaId, job_id: Option<JobId>, formula: Formula) -> Self {
        Self {
            id,
            job_id,
            formula,
            status: FormulaStatus::Pending,
        }
    }
}
