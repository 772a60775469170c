//! Grid symmetries (the dihedral group D4) over row-major layouts.
//!
//! Rotations are clockwise. On non-square grids the quarter turns and the
//! two transposes change the grid's shape, so they are not symmetries of
//! that grid and `apply` returns `None` for them.

/// One element of D4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symmetry {
    Identity,
    Rotate90,
    Rotate180,
    Rotate270,
    /// Mirror left-right.
    FlipHorizontal,
    /// Mirror top-bottom.
    FlipVertical,
    /// Mirror across the main diagonal.
    Transpose,
    /// Mirror across the anti-diagonal.
    AntiTranspose,
}

impl Symmetry {
    pub const ALL: [Symmetry; 8] = [
        Symmetry::Identity,
        Symmetry::Rotate90,
        Symmetry::Rotate180,
        Symmetry::Rotate270,
        Symmetry::FlipHorizontal,
        Symmetry::FlipVertical,
        Symmetry::Transpose,
        Symmetry::AntiTranspose,
    ];

    /// Whether this element swaps width and height.
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Symmetry::Rotate90 | Symmetry::Rotate270 | Symmetry::Transpose | Symmetry::AntiTranspose
        )
    }

    /// Elements that map a `width`x`height` grid onto itself.
    pub fn for_grid(width: usize, height: usize) -> impl Iterator<Item = Symmetry> {
        Symmetry::ALL
            .into_iter()
            .filter(move |symmetry| width == height || !symmetry.swaps_axes())
    }

    /// Destination `(column, row)` of the cell at `(x, y)`.
    fn map(self, x: usize, y: usize, width: usize, height: usize) -> (usize, usize) {
        match self {
            Symmetry::Identity => (x, y),
            Symmetry::Rotate90 => (height - 1 - y, x),
            Symmetry::Rotate180 => (width - 1 - x, height - 1 - y),
            Symmetry::Rotate270 => (y, width - 1 - x),
            Symmetry::FlipHorizontal => (width - 1 - x, y),
            Symmetry::FlipVertical => (x, height - 1 - y),
            Symmetry::Transpose => (y, x),
            Symmetry::AntiTranspose => (height - 1 - y, width - 1 - x),
        }
    }

    /// Image of `layout` under this symmetry, or `None` when the element
    /// does not preserve the grid's shape or the layout has the wrong size.
    pub fn apply<T: Clone>(self, layout: &[T], width: usize, height: usize) -> Option<Vec<T>> {
        if layout.len() != width * height || (self.swaps_axes() && width != height) {
            return None;
        }
        let mut image = layout.to_vec();
        for (index, value) in layout.iter().enumerate() {
            let (x, y) = self.map(index % width, index / width, width, height);
            image[y * width + x] = value.clone();
        }
        Some(image)
    }
}

/// Every distinct image of `layout` under the grid's symmetries, the
/// layout itself included.
pub fn images<T: Clone + PartialEq>(layout: &[T], width: usize, height: usize) -> Vec<Vec<T>> {
    let mut images: Vec<Vec<T>> = Vec::with_capacity(Symmetry::ALL.len());
    for symmetry in Symmetry::for_grid(width, height) {
        if let Some(image) = symmetry.apply(layout, width, height)
            && !images.contains(&image)
        {
            images.push(image);
        }
    }
    images
}
