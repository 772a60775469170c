//! Per-type traversal rules for the special squares a maze type allows.
//!
//! Normal squares, endpoints and barriers behave the same on every maze
//! and are handled by the solver itself; a strategy only decides what
//! happens when the path steps onto a bridge, tunnel or portal. A square
//! the strategy does not recognise is impassable.

use crate::domain::{Label, MazeType, PairKind};
use crate::grid::{Axis, Direction, SquareGrid};

use super::{Attempt, Mark};

/// Rules for entering the special squares of one maze type.
pub trait TraversalStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Steps from the attempt's current cell onto the special square at
    /// `to`, moving in `direction`. Returns `None` if the move is illegal.
    fn enter_special(
        &self,
        grid: &SquareGrid,
        attempt: &Attempt,
        to: usize,
        direction: Direction,
    ) -> Option<Attempt>;
}

/// Plain mazes: no special squares besides endpoints and barriers.
pub struct SimpleTraversal;

/// Bridges are crossed once horizontally and once vertically, each time
/// straight through.
pub struct BridgeTraversal;

/// Tunnels carry the path to the paired cell; it must keep its heading.
pub struct TunnelTraversal;

/// Portals carry the path to the paired cell; it may leave in any
/// direction.
pub struct PortalTraversal;

impl TraversalStrategy for SimpleTraversal {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn enter_special(&self, _: &SquareGrid, _: &Attempt, _: usize, _: Direction) -> Option<Attempt> {
        None
    }
}

impl TraversalStrategy for BridgeTraversal {
    fn name(&self) -> &'static str {
        "bridge"
    }

    fn enter_special(
        &self,
        grid: &SquareGrid,
        attempt: &Attempt,
        to: usize,
        direction: Direction,
    ) -> Option<Attempt> {
        if grid.label(to) != Label::Bridge {
            return None;
        }
        let mark = match (attempt.marks[to], direction.axis()) {
            (Mark::Open, Axis::Horizontal) => Mark::Horizontal,
            (Mark::Open, Axis::Vertical) => Mark::Vertical,
            (Mark::Vertical, Axis::Horizontal) | (Mark::Horizontal, Axis::Vertical) => Mark::Taken,
            _ => return None,
        };

        let mut next = attempt.clone();
        next.marks[to] = mark;
        next.path.push(to);
        next.heading = Some(direction);
        Some(next)
    }
}

impl TraversalStrategy for TunnelTraversal {
    fn name(&self) -> &'static str {
        "tunnel"
    }

    fn enter_special(
        &self,
        grid: &SquareGrid,
        attempt: &Attempt,
        to: usize,
        direction: Direction,
    ) -> Option<Attempt> {
        teleport(grid, attempt, to, PairKind::Tunnel, Some(direction))
    }
}

impl TraversalStrategy for PortalTraversal {
    fn name(&self) -> &'static str {
        "portal"
    }

    fn enter_special(
        &self,
        grid: &SquareGrid,
        attempt: &Attempt,
        to: usize,
        _: Direction,
    ) -> Option<Attempt> {
        teleport(grid, attempt, to, PairKind::Portal, None)
    }
}

/// Takes both halves of a pair and continues from the far side.
fn teleport(
    grid: &SquareGrid,
    attempt: &Attempt,
    to: usize,
    kind: PairKind,
    heading: Option<Direction>,
) -> Option<Attempt> {
    match grid.label(to) {
        Label::Paired { kind: found, .. } if found == kind => {}
        _ => return None,
    }
    let exit = grid.partner(to)?;
    if attempt.marks[to] != Mark::Open || attempt.marks[exit] != Mark::Open {
        return None;
    }

    let mut next = attempt.clone();
    next.marks[to] = Mark::Taken;
    next.marks[exit] = Mark::Taken;
    next.path.push(to);
    next.path.push(exit);
    next.heading = heading;
    Some(next)
}

static SIMPLE: SimpleTraversal = SimpleTraversal;
static BRIDGE: BridgeTraversal = BridgeTraversal;
static TUNNEL: TunnelTraversal = TunnelTraversal;
static PORTAL: PortalTraversal = PortalTraversal;

/// The strategy for a grid of the given maze type.
pub fn strategy_for(maze_type: MazeType) -> &'static dyn TraversalStrategy {
    match maze_type {
        MazeType::Simple => &SIMPLE,
        MazeType::Bridge => &BRIDGE,
        MazeType::Tunnel => &TUNNEL,
        MazeType::Portal => &PORTAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(MazeType::Simple, "simple")]
    #[case(MazeType::Bridge, "bridge")]
    #[case(MazeType::Tunnel, "tunnel")]
    #[case(MazeType::Portal, "portal")]
    fn strategy_matches_maze_type(#[case] maze_type: MazeType, #[case] name: &str) {
        assert_eq!(strategy_for(maze_type).name(), name);
    }

    #[test]
    fn bridge_needs_both_axes_to_be_taken() {
        // E1a B N
        let grid = SquareGrid::new(
            3,
            1,
            vec![
                Label::endpoint(1, crate::domain::Side::A),
                Label::Bridge,
                Label::endpoint(1, crate::domain::Side::B),
            ],
        )
        .unwrap();
        let attempt = Attempt::start(&grid).unwrap();

        let crossed = BridgeTraversal
            .enter_special(&grid, &attempt, 1, Direction::Right)
            .unwrap();
        assert_eq!(crossed.marks[1], Mark::Horizontal);
        assert_eq!(crossed.heading, Some(Direction::Right));

        // 同じ向きでもう一度渡ることはできない
        assert!(
            BridgeTraversal
                .enter_special(&grid, &crossed, 1, Direction::Left)
                .is_none()
        );
        let twice = BridgeTraversal
            .enter_special(&grid, &crossed, 1, Direction::Down)
            .unwrap();
        assert_eq!(twice.marks[1], Mark::Taken);
    }

    #[test]
    fn simple_traversal_refuses_special_squares() {
        let grid = SquareGrid::new(
            3,
            1,
            vec![
                Label::endpoint(1, crate::domain::Side::A),
                Label::Bridge,
                Label::endpoint(1, crate::domain::Side::B),
            ],
        )
        .unwrap();
        let attempt = Attempt::start(&grid).unwrap();
        assert!(
            SimpleTraversal
                .enter_special(&grid, &attempt, 1, Direction::Right)
                .is_none()
        );
    }
}
