//! Environment oracles consumed by value iteration.
//!
//! [`Environment`] is the one interface the sweep driver understands: a pure
//! function from `(state, action)` to an enumerated list of outcomes. The other
//! traits describe the environment shapes callers usually have at hand; the
//! adapters in [`crate::dynamic::adapters`] turn each of them into an
//! `Environment`.

use crate::dynamic::space::{Cell, StateSpace};
use crate::dynamic::Real;
use crate::error::Result;

/// One possible result of taking an action: `(next_state, reward, probability)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome<S, T> {
    pub next_state: S,
    pub reward: T,
    pub probability: T,
}

impl<S, T: Real> Outcome<S, T> {
    pub fn new(next_state: S, reward: T, probability: T) -> Self {
        Self {
            next_state,
            reward,
            probability,
        }
    }

    /// An outcome that happens with probability one.
    pub fn certain(next_state: S, reward: T) -> Self {
        Self::new(next_state, reward, T::one())
    }
}

/// Result of a single deterministic step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition<S, T> {
    pub next_state: S,
    pub reward: T,
    /// Whether `next_state` ends the episode.
    pub terminal: bool,
}

/// State label of an environment.
pub type StateOf<E, T> = <<E as Environment<T>>::Space as StateSpace>::State;

/// A known model of a finite MDP.
///
/// Implementations must not mutate anything observable from `outcomes`, so
/// that any number of backups can query the model concurrently.
pub trait Environment<T: Real>: Sync {
    type Space: StateSpace;

    fn space(&self) -> &Self::Space;

    /// Actions are `0..num_actions()` in every state.
    fn num_actions(&self) -> usize;

    fn is_terminal(&self, state: <Self::Space as StateSpace>::State) -> Result<bool>;

    /// Every outcome of taking `action` in `state`. An empty list marks the
    /// action as unavailable.
    fn outcomes(
        &self,
        state: <Self::Space as StateSpace>::State,
        action: usize,
    ) -> Result<Vec<Outcome<<Self::Space as StateSpace>::State, T>>>;

    /// Factor applied to the whole expected return of `action` in `state`.
    fn action_weight(&self, _state: <Self::Space as StateSpace>::State, _action: usize) -> Result<T> {
        Ok(T::one())
    }
}

/// A discrete MDP with integer states and a deterministic, side-effect free step.
pub trait DiscreteMdp<T: Real>: Sync {
    /// `(state_count, action_count)`.
    fn declare_spaces(&self) -> (usize, usize);

    /// What would happen if the process were in `state` and took `action`.
    fn step_from(&self, state: usize, action: usize) -> Result<Transition<usize, T>>;

    fn is_terminal(&self, _state: usize) -> Result<bool> {
        Ok(false)
    }
}

/// A grid world where every action moves to one cell with certainty.
pub trait DeterministicGrid<T: Real>: Sync {
    /// `(rows, cols)`.
    fn shape(&self) -> (usize, usize);

    fn num_actions(&self) -> usize;

    fn is_terminal(&self, cell: Cell) -> Result<bool>;

    fn step_from(&self, cell: Cell, action: usize) -> Result<Transition<Cell, T>>;
}

/// A grid world whose actions lead to a distribution over cells.
pub trait StochasticGrid<T: Real>: Sync {
    /// `(rows, cols)`.
    fn shape(&self) -> (usize, usize);

    fn num_actions(&self) -> usize;

    fn is_terminal(&self, cell: Cell) -> Result<bool>;

    /// Outcomes of `action` from `cell`; probabilities sum to one.
    fn enumerate_outcomes(&self, cell: Cell, action: usize) -> Result<Vec<Outcome<Cell, T>>>;

    /// Probability that `action` is executed at all in `cell`, independent of
    /// where it leads.
    fn action_execution_probability(&self, _cell: Cell, _action: usize) -> Result<T> {
        Ok(T::one())
    }
}

/// A stateful, gym-style MDP that is probed by repositioning it and stepping.
pub trait SteppableMdp<T: Real>: Send {
    /// `(state_count, action_count)`.
    fn declare_spaces(&self) -> (usize, usize);

    fn current_state(&self) -> usize;

    /// Moves the process to `state` without emitting a transition.
    fn force_state(&mut self, state: usize) -> Result<()>;

    /// Takes `action` from the current state. With `commit == false` the
    /// process must stay where it was.
    fn step(&mut self, action: usize, commit: bool) -> Result<Transition<usize, T>>;

    fn is_terminal(&self, _state: usize) -> Result<bool> {
        Ok(false)
    }
}
