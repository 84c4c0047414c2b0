use crate::dynamic::oracle::{DeterministicGrid, Transition};
use crate::dynamic::space::{Cell, GridSpace, StateSpace};
use crate::dynamic::Real;
use crate::error::{Error, Result};

/// The four moves of a grid world. The discriminant is the action index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn from_index(action: usize) -> Option<Self> {
        Self::ALL.get(action).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// The two directions at right angles to `self`.
    pub fn perpendicular(self) -> [Direction; 2] {
        match self {
            Direction::Up | Direction::Down => [Direction::Left, Direction::Right],
            Direction::Left | Direction::Right => [Direction::Up, Direction::Down],
        }
    }

    fn offset(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

/// A deterministic grid world.
///
/// Each move costs `step_reward` unless the destination cell carries its own
/// reward. Moves off the edge leave the agent where it is.
#[derive(Debug, Clone)]
pub struct GridWorld<T> {
    space: GridSpace,
    step_reward: T,
    rewards: Vec<Option<T>>,
    terminal: Vec<bool>,
}

impl<T: Real> GridWorld<T> {
    pub fn new(rows: usize, cols: usize, step_reward: T) -> Self {
        let space = GridSpace::new(rows, cols);
        Self {
            space,
            step_reward,
            rewards: vec![None; space.len()],
            terminal: vec![false; space.len()],
        }
    }

    /// Marks `cell` as terminal.
    pub fn with_terminal(mut self, cell: Cell) -> Result<Self> {
        let index = self.index(cell)?;
        self.terminal[index] = true;
        Ok(self)
    }

    /// Reward for any move that ends in `cell`.
    pub fn with_reward(mut self, cell: Cell, reward: T) -> Result<Self> {
        let index = self.index(cell)?;
        self.rewards[index] = Some(reward);
        Ok(self)
    }

    pub fn space(&self) -> &GridSpace {
        &self.space
    }

    pub fn step_reward(&self) -> T {
        self.step_reward
    }

    /// Cell reached by moving from `cell` in `direction`, clamped to the grid.
    pub fn move_from(&self, cell: Cell, direction: Direction) -> Cell {
        let (dr, dc) = direction.offset();
        let row = clamp_step(cell.row, dr, self.space.rows());
        let col = clamp_step(cell.col, dc, self.space.cols());
        Cell::new(row, col)
    }

    /// Reward collected when a move ends in `cell`.
    pub fn reward_for(&self, cell: Cell) -> Result<T> {
        let index = self.index(cell)?;
        Ok(self.rewards[index].unwrap_or(self.step_reward))
    }

    pub(crate) fn index(&self, cell: Cell) -> Result<usize> {
        self.space.index_of(cell).ok_or_else(|| {
            Error::invalid_index(format!(
                "cell {:?} outside {}x{} grid",
                cell,
                self.space.rows(),
                self.space.cols()
            ))
        })
    }

    pub(crate) fn direction(&self, action: usize) -> Result<Direction> {
        Direction::from_index(action).ok_or_else(|| {
            Error::invalid_index(format!(
                "action {action} outside {} grid moves",
                Direction::ALL.len()
            ))
        })
    }
}

fn clamp_step(position: usize, delta: isize, limit: usize) -> usize {
    match position.checked_add_signed(delta) {
        Some(next) if next < limit => next,
        _ => position,
    }
}

impl<T: Real> DeterministicGrid<T> for GridWorld<T> {
    fn shape(&self) -> (usize, usize) {
        (self.space.rows(), self.space.cols())
    }

    fn num_actions(&self) -> usize {
        Direction::ALL.len()
    }

    fn is_terminal(&self, cell: Cell) -> Result<bool> {
        Ok(self.terminal[self.index(cell)?])
    }

    fn step_from(&self, cell: Cell, action: usize) -> Result<Transition<Cell, T>> {
        self.index(cell)?;
        let next_state = self.move_from(cell, self.direction(action)?);
        Ok(Transition {
            next_state,
            reward: self.reward_for(next_state)?,
            terminal: self.terminal[self.index(next_state)?],
        })
    }
}
