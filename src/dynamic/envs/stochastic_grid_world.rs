use ndarray::Array3;

use crate::dynamic::envs::grid_world::{Direction, GridWorld};
use crate::dynamic::oracle::{DeterministicGrid, Outcome, StochasticGrid};
use crate::dynamic::space::Cell;
use crate::dynamic::Real;
use crate::error::{Error, Result};

/// A grid world with slippery moves.
///
/// The intended direction is taken with `success_probability`; otherwise the
/// agent slips to one of the two perpendicular directions with equal chance.
/// Separately, each `(cell, action)` carries an execution probability (one by
/// default) for models where the action itself may fail to happen.
#[derive(Debug, Clone)]
pub struct StochasticGridWorld<T> {
    grid: GridWorld<T>,
    success_probability: T,
    execution: Array3<T>,
}

impl<T: Real> StochasticGridWorld<T> {
    pub fn new(grid: GridWorld<T>, success_probability: T) -> Result<Self> {
        check_probability(success_probability, "success probability")?;
        let (rows, cols) = grid.shape();
        Ok(Self {
            execution: Array3::from_elem((rows, cols, Direction::ALL.len()), T::one()),
            grid,
            success_probability,
        })
    }

    /// Sets the probability that `direction` is executed at all from `cell`.
    pub fn with_execution_probability(
        mut self,
        cell: Cell,
        direction: Direction,
        probability: T,
    ) -> Result<Self> {
        check_probability(probability, "execution probability")?;
        self.grid.index(cell)?;
        self.execution[[cell.row, cell.col, direction.index()]] = probability;
        Ok(self)
    }

    pub fn grid(&self) -> &GridWorld<T> {
        &self.grid
    }

    pub fn success_probability(&self) -> T {
        self.success_probability
    }
}

fn check_probability<T: Real>(p: T, what: &str) -> Result<()> {
    if p.is_finite() && p >= T::zero() && p <= T::one() {
        Ok(())
    } else {
        Err(Error::invalid_config(format!("{what} {p:?} outside [0, 1]")))
    }
}

impl<T: Real> StochasticGrid<T> for StochasticGridWorld<T> {
    fn shape(&self) -> (usize, usize) {
        self.grid.shape()
    }

    fn num_actions(&self) -> usize {
        self.grid.num_actions()
    }

    fn is_terminal(&self, cell: Cell) -> Result<bool> {
        self.grid.is_terminal(cell)
    }

    fn enumerate_outcomes(&self, cell: Cell, action: usize) -> Result<Vec<Outcome<Cell, T>>> {
        self.grid.index(cell)?;
        let intended = self.grid.direction(action)?;
        let two = T::one() + T::one();
        let slip = (T::one() - self.success_probability) / two;

        let mut outcomes = Vec::with_capacity(3);
        for (direction, probability) in [
            (intended, self.success_probability),
            (intended.perpendicular()[0], slip),
            (intended.perpendicular()[1], slip),
        ] {
            if probability > T::zero() {
                let next_state = self.grid.move_from(cell, direction);
                outcomes.push(Outcome::new(
                    next_state,
                    self.grid.reward_for(next_state)?,
                    probability,
                ));
            }
        }
        Ok(outcomes)
    }

    fn action_execution_probability(&self, cell: Cell, action: usize) -> Result<T> {
        self.grid.index(cell)?;
        let direction = self.grid.direction(action)?;
        Ok(self.execution[[cell.row, cell.col, direction.index()]])
    }
}
