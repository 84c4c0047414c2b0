//! Enumerated state spaces.
//!
//! Every environment exposes its states through a [`StateSpace`], which maps
//! each state to a dense index in `0..len()`. The sweep driver only ever walks
//! indices, so integer-labelled MDPs and grid worlds share one implementation.

use std::fmt::Debug;

/// A finite, enumerable set of states with a dense index.
pub trait StateSpace: Sync {
    /// The state label handed to the environment.
    type State: Copy + Debug + PartialEq + Send + Sync;

    /// Number of states.
    fn len(&self) -> usize;

    /// Returns true if the space has no states.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The state stored at `index`, or `None` when out of range.
    fn state_at(&self, index: usize) -> Option<Self::State>;

    /// The dense index of `state`, or `None` when the state is not in the space.
    fn index_of(&self, state: Self::State) -> Option<usize>;

    /// Layout used when the value table is returned to the caller.
    fn shape(&self) -> TableShape;
}

/// Layout of a value table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableShape {
    /// One entry per integer state.
    Linear(usize),
    /// Row-major grid of cells.
    Grid { rows: usize, cols: usize },
}

impl TableShape {
    pub fn len(&self) -> usize {
        match *self {
            TableShape::Linear(n) => n,
            TableShape::Grid { rows, cols } => rows * cols,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Integer states `0..len`, enumerated in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpace {
    len: usize,
}

impl IndexSpace {
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl StateSpace for IndexSpace {
    type State = usize;

    fn len(&self) -> usize {
        self.len
    }

    fn state_at(&self, index: usize) -> Option<usize> {
        (index < self.len).then_some(index)
    }

    fn index_of(&self, state: usize) -> Option<usize> {
        (state < self.len).then_some(state)
    }

    fn shape(&self) -> TableShape {
        TableShape::Linear(self.len)
    }
}

/// A grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<(usize, usize)> for Cell {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

/// Cells of a `rows x cols` grid, enumerated row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpace {
    rows: usize,
    cols: usize,
}

impl GridSpace {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Cell::new(row, col)))
    }
}

impl StateSpace for GridSpace {
    type State = Cell;

    fn len(&self) -> usize {
        self.rows * self.cols
    }

    fn state_at(&self, index: usize) -> Option<Cell> {
        if self.cols == 0 || index >= self.len() {
            return None;
        }
        Some(Cell::new(index / self.cols, index % self.cols))
    }

    fn index_of(&self, cell: Cell) -> Option<usize> {
        self.contains(cell).then(|| cell.row * self.cols + cell.col)
    }

    fn shape(&self) -> TableShape {
        TableShape::Grid {
            rows: self.rows,
            cols: self.cols,
        }
    }
}
