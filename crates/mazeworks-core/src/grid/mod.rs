//! SquareGrid - typed grid of squares with adjacency helpers.
//!
//! Cells are stored row-major: index `i` is column `i % width`, row
//! `i / width`. Row 0 is the top row.

pub mod symmetry;

pub use symmetry::Symmetry;

use thiserror::Error;

use crate::domain::{Label, PairKind, Side};

/// Compass directions, in the order the solver tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

/// Crossing axis of a move, used by bridge squares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    pub fn axis(self) -> Axis {
        match self {
            Direction::Up | Direction::Down => Axis::Vertical,
            Direction::Left | Direction::Right => Axis::Horizontal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid {width}x{height} needs {expected} squares, got {actual}")]
    SizeMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("grid dimensions must be positive, got {width}x{height}")]
    Empty { width: usize, height: usize },

    #[error("{0} has no partner square")]
    Unpaired(Label),
}

/// Immutable grid of labelled squares.
///
/// Solving state (which squares are taken) lives outside the grid so that
/// one grid can be shared by every branch of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquareGrid {
    width: usize,
    height: usize,
    squares: Vec<Label>,
    /// `partners[i]` is the cell holding the other half of a paired square.
    partners: Vec<Option<usize>>,
}

impl SquareGrid {
    pub fn new(width: usize, height: usize, squares: Vec<Label>) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::Empty { width, height });
        }
        if squares.len() != width * height {
            return Err(GridError::SizeMismatch {
                width,
                height,
                expected: width * height,
                actual: squares.len(),
            });
        }

        let mut partners = vec![None; squares.len()];
        for (index, label) in squares.iter().enumerate() {
            let Some(partner) = label.partner() else {
                continue;
            };
            let found = squares
                .iter()
                .position(|other| *other == partner)
                .ok_or(GridError::Unpaired(*label))?;
            partners[index] = Some(found);
        }

        Ok(Self {
            width,
            height,
            squares,
            partners,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.squares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.squares.is_empty()
    }

    pub fn squares(&self) -> &[Label] {
        &self.squares
    }

    pub fn label(&self, index: usize) -> Label {
        self.squares[index]
    }

    pub fn partner(&self, index: usize) -> Option<usize> {
        self.partners[index]
    }

    pub fn position_of(&self, label: Label) -> Option<usize> {
        self.squares.iter().position(|square| *square == label)
    }

    /// Number of endpoint pairs on the grid.
    pub fn endpoint_pairs(&self) -> u8 {
        self.squares
            .iter()
            .filter_map(|label| match label {
                Label::Paired {
                    kind: PairKind::Endpoint,
                    group,
                    side: Side::A,
                } => Some(*group),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Index of the neighbour in `direction`, if it is on the grid.
    pub fn neighbor(&self, index: usize, direction: Direction) -> Option<usize> {
        let column = index % self.width;
        let row = index / self.width;
        match direction {
            Direction::Up => (row > 0).then(|| index - self.width),
            Direction::Down => (row + 1 < self.height).then(|| index + self.width),
            Direction::Left => (column > 0).then(|| index - 1),
            Direction::Right => (column + 1 < self.width).then(|| index + 1),
        }
    }

    /// The direction that leads from `from` to the adjacent cell `to`.
    pub fn direction_between(&self, from: usize, to: usize) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|direction| self.neighbor(from, *direction) == Some(to))
    }
}
