//! MazeSolver - breadth-first search for one-line solutions.
//!
//! A solution is a path that starts on `endpoint_1_a`, visits every
//! square, and links each endpoint pair in order: on reaching
//! `endpoint_i_b` the path continues from `endpoint_{i+1}_a`, and the
//! search accepts once the last pair's `_b` is reached with nothing left
//! open.
//!
//! # 実装詳細
//! - 探索は明示的な `VecDeque` のワークリスト（再帰しない）
//! - grid は全ブランチで共有し、各 attempt は自分の `marks` を持つ
//! - 特殊マスの扱いは maze type ごとの `TraversalStrategy` に委譲

pub mod strategy;

pub use strategy::{
    BridgeTraversal, PortalTraversal, SimpleTraversal, TraversalStrategy, TunnelTraversal,
    strategy_for,
};

use std::collections::VecDeque;

use crate::domain::{Label, MazeType, PairKind, Side, SolutionPath};
use crate::grid::{Direction, GridError, SquareGrid};

/// Per-square solving state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Open,
    /// Bridge crossed left-right only.
    Horizontal,
    /// Bridge crossed top-bottom only.
    Vertical,
    Taken,
}

/// One in-progress branch of the search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub path: Vec<usize>,
    pub marks: Vec<Mark>,
    /// Endpoint group currently being linked.
    pub pair: u8,
    /// Direction the next step is forced to take, if any.
    pub heading: Option<Direction>,
}

impl Attempt {
    /// The initial attempt: standing on `endpoint_1_a`, barriers taken.
    pub fn start(grid: &SquareGrid) -> Option<Self> {
        let start = grid.position_of(Label::endpoint(1, Side::A))?;
        let mut marks: Vec<Mark> = grid
            .squares()
            .iter()
            .map(|label| match label {
                Label::Barrier => Mark::Taken,
                _ => Mark::Open,
            })
            .collect();
        marks[start] = Mark::Taken;
        Some(Self {
            path: vec![start],
            marks,
            pair: 1,
            heading: None,
        })
    }

    pub fn current(&self) -> usize {
        self.path[self.path.len() - 1]
    }

    fn all_taken(&self) -> bool {
        self.marks.iter().all(|mark| *mark == Mark::Taken)
    }
}

enum Step {
    Continue(Attempt),
    Solved(SolutionPath),
}

/// Solver for one grid.
pub struct MazeSolver {
    grid: SquareGrid,
    strategy: &'static dyn TraversalStrategy,
}

impl MazeSolver {
    pub fn new(grid: SquareGrid, maze_type: MazeType) -> Self {
        Self {
            grid,
            strategy: strategy_for(maze_type),
        }
    }

    /// Builds the grid from a persisted row-major layout.
    pub fn from_layout(
        width: usize,
        height: usize,
        layout: Vec<Label>,
        maze_type: MazeType,
    ) -> Result<Self, GridError> {
        Ok(Self::new(SquareGrid::new(width, height, layout)?, maze_type))
    }

    pub fn grid(&self) -> &SquareGrid {
        &self.grid
    }

    /// Every accepted path, in the order the search finds them.
    pub fn solutions(&self) -> Vec<SolutionPath> {
        self.solutions_until(|| false).unwrap_or_default()
    }

    /// Like [`solutions`](Self::solutions), but polls `cancelled` before
    /// expanding each attempt and gives up with `None` once it returns true.
    pub fn solutions_until(&self, cancelled: impl Fn() -> bool) -> Option<Vec<SolutionPath>> {
        let Some(start) = Attempt::start(&self.grid) else {
            return Some(Vec::new());
        };
        let last_pair = self.grid.endpoint_pairs();

        let mut solutions = Vec::new();
        let mut attempts = VecDeque::from([start]);
        while let Some(attempt) = attempts.pop_front() {
            if cancelled() {
                return None;
            }
            for direction in Direction::ALL {
                if attempt.heading.is_some_and(|heading| heading != direction) {
                    continue;
                }
                match self.advance(&attempt, direction, last_pair) {
                    Some(Step::Continue(next)) => attempts.push_back(next),
                    Some(Step::Solved(path)) => solutions.push(path),
                    None => {}
                }
            }
        }
        Some(solutions)
    }

    pub fn is_solvable(&self) -> bool {
        !self.solutions().is_empty()
    }

    fn advance(&self, attempt: &Attempt, direction: Direction, last_pair: u8) -> Option<Step> {
        let to = self.grid.neighbor(attempt.current(), direction)?;
        match self.grid.label(to) {
            Label::Barrier => None,
            Label::Normal => {
                if attempt.marks[to] != Mark::Open {
                    return None;
                }
                let mut next = attempt.clone();
                next.marks[to] = Mark::Taken;
                next.path.push(to);
                next.heading = None;
                Some(Step::Continue(next))
            }
            Label::Paired {
                kind: PairKind::Endpoint,
                group,
                side,
            } => {
                if group != attempt.pair || side != Side::B || attempt.marks[to] != Mark::Open {
                    return None;
                }
                let mut next = attempt.clone();
                next.marks[to] = Mark::Taken;
                next.path.push(to);

                if group == last_pair {
                    return next.all_taken().then_some(Step::Solved(next.path));
                }

                // 次のペアの _a から続ける
                let resume = self.grid.position_of(Label::endpoint(group + 1, Side::A))?;
                if next.marks[resume] != Mark::Open {
                    return None;
                }
                next.marks[resume] = Mark::Taken;
                next.path.push(resume);
                next.pair = group + 1;
                next.heading = None;
                Some(Step::Continue(next))
            }
            _ => self
                .strategy
                .enter_special(&self.grid, attempt, to, direction)
                .map(Step::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn solve(width: usize, height: usize, names: &[&str], maze_type: MazeType) -> Vec<SolutionPath> {
        let layout = names.iter().map(|name| name.parse().unwrap()).collect();
        MazeSolver::from_layout(width, height, layout, maze_type)
            .unwrap()
            .solutions()
    }

    #[test]
    fn two_adjacent_endpoints_have_one_solution() {
        let solutions = solve(2, 1, &["endpoint_1_a", "endpoint_1_b"], MazeType::Simple);
        assert_eq!(solutions, vec![vec![0, 1]]);
    }

    #[test]
    fn path_must_cover_every_square() {
        // 0 1
        // 2 3
        let solutions = solve(
            2,
            2,
            &["endpoint_1_a", "endpoint_1_b", "normal", "normal"],
            MazeType::Simple,
        );
        assert_eq!(solutions, vec![vec![0, 2, 3, 1]]);
    }

    #[rstest]
    #[case::walled_off(3, 1, &["endpoint_1_a", "barrier", "endpoint_1_b"], 0)]
    #[case::around_barrier(2, 2, &["endpoint_1_a", "normal", "barrier", "endpoint_1_b"], 1)]
    #[case::dead_end(2, 2, &["endpoint_1_a", "endpoint_1_b", "barrier", "normal"], 0)]
    fn barriers_are_never_entered(
        #[case] width: usize,
        #[case] height: usize,
        #[case] names: &[&str],
        #[case] expected: usize,
    ) {
        assert_eq!(solve(width, height, names, MazeType::Simple).len(), expected);
    }

    #[test]
    fn endpoint_pairs_are_linked_in_order() {
        let solutions = solve(
            2,
            2,
            &["endpoint_1_a", "endpoint_1_b", "endpoint_2_a", "endpoint_2_b"],
            MazeType::Simple,
        );
        assert_eq!(solutions, vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn grid_without_endpoints_has_no_solutions() {
        assert!(solve(2, 1, &["normal", "normal"], MazeType::Simple).is_empty());
    }

    #[test]
    fn bridge_is_crossed_on_both_axes() {
        // X  E2a X
        // E1a B  E1b
        // X  E2b X
        let names = [
            "barrier",
            "endpoint_2_a",
            "barrier",
            "endpoint_1_a",
            "bridge",
            "endpoint_1_b",
            "barrier",
            "endpoint_2_b",
            "barrier",
        ];
        assert_eq!(
            solve(3, 3, &names, MazeType::Bridge),
            vec![vec![3, 4, 5, 1, 4, 7]]
        );
        // simple maze では bridge を通れない
        assert!(solve(3, 3, &names, MazeType::Simple).is_empty());
    }

    #[test]
    fn bridge_crossed_once_is_not_taken() {
        let solutions = solve(3, 1, &["endpoint_1_a", "bridge", "endpoint_1_b"], MazeType::Bridge);
        assert!(solutions.is_empty());
    }

    #[test]
    fn tunnel_keeps_heading() {
        // E1a N
        // T1a T1b
        // N   E1b
        let names = [
            "endpoint_1_a",
            "normal",
            "tunnel_1_a",
            "tunnel_1_b",
            "normal",
            "endpoint_1_b",
        ];
        assert_eq!(
            solve(2, 3, &names, MazeType::Tunnel),
            vec![vec![0, 1, 3, 2, 4, 5]]
        );
    }

    #[test]
    fn portal_may_turn_where_tunnel_cannot() {
        // E1a P1a
        // N   N
        // E1b P1b
        let portal = [
            "endpoint_1_a",
            "portal_1_a",
            "normal",
            "normal",
            "endpoint_1_b",
            "portal_1_b",
        ];
        let mut solutions = solve(2, 3, &portal, MazeType::Portal);
        solutions.sort();
        assert_eq!(
            solutions,
            vec![vec![0, 1, 5, 3, 2, 4], vec![0, 2, 3, 1, 5, 4]]
        );

        let tunnel = portal.map(|name| name.replace("portal", "tunnel"));
        let tunnel: Vec<&str> = tunnel.iter().map(String::as_str).collect();
        assert!(solve(2, 3, &tunnel, MazeType::Tunnel).is_empty());
    }

    #[test]
    fn cancelled_search_stops_early() {
        let mut names = vec!["normal"; 36];
        names[0] = "endpoint_1_a";
        names[35] = "endpoint_1_b";
        let layout = names.iter().map(|name| name.parse().unwrap()).collect();
        let solver = MazeSolver::from_layout(6, 6, layout, MazeType::Simple).unwrap();

        let polls = std::cell::Cell::new(0);
        let result = solver.solutions_until(|| {
            polls.set(polls.get() + 1);
            polls.get() > 100
        });

        assert_eq!(result, None);
        assert_eq!(polls.get(), 101);
    }

    #[test]
    fn uncancelled_search_matches_solutions() {
        let names = ["endpoint_1_a", "normal", "normal", "endpoint_1_b"];
        let layout: Vec<Label> = names.iter().map(|name| name.parse().unwrap()).collect();
        let solver = MazeSolver::from_layout(2, 2, layout, MazeType::Simple).unwrap();
        assert_eq!(solver.solutions_until(|| false), Some(solver.solutions()));
    }
}
