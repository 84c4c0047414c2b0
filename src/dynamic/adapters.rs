//! Adapters from the caller-facing oracle traits to [`Environment`].
//!
//! - [`GenericMdpAdapter`]: integer states, one reported `(next_state, reward)` per action.
//! - [`DeterministicGridAdapter`]: grid coordinates, one reported cell per action.
//! - [`StochasticGridAdapter`]: grid coordinates with an outcome distribution per
//!   action and, optionally, a separate action-execution probability.
//! - [`DryRun`]: turns a stateful [`SteppableMdp`] into a pure [`DiscreteMdp`].

use std::sync::Mutex;

use crate::dynamic::oracle::{
    DeterministicGrid, DiscreteMdp, Environment, Outcome, SteppableMdp, StochasticGrid,
    Transition,
};
use crate::dynamic::space::{Cell, GridSpace, IndexSpace};
use crate::dynamic::value_iteration::{ValueIteration, ValueIterationConfig, ValueIterationResult};
use crate::dynamic::Real;
use crate::error::{Error, Result};

fn check_action(action: usize, num_actions: usize) -> Result<()> {
    if action < num_actions {
        Ok(())
    } else {
        Err(Error::invalid_index(format!(
            "action {action} outside {num_actions} actions"
        )))
    }
}

/// Exposes a [`DiscreteMdp`] as an environment over `0..state_count`.
#[derive(Debug)]
pub struct GenericMdpAdapter<'a, M: ?Sized> {
    mdp: &'a M,
    space: IndexSpace,
    num_actions: usize,
}

impl<'a, M: ?Sized> GenericMdpAdapter<'a, M> {
    pub fn new<T: Real>(mdp: &'a M) -> Self
    where
        M: DiscreteMdp<T>,
    {
        let (num_states, num_actions) = mdp.declare_spaces();
        Self {
            mdp,
            space: IndexSpace::new(num_states),
            num_actions,
        }
    }
}

impl<T, M> Environment<T> for GenericMdpAdapter<'_, M>
where
    T: Real,
    M: DiscreteMdp<T> + ?Sized,
{
    type Space = IndexSpace;

    fn space(&self) -> &IndexSpace {
        &self.space
    }

    fn num_actions(&self) -> usize {
        self.num_actions
    }

    fn is_terminal(&self, state: usize) -> Result<bool> {
        self.mdp.is_terminal(state)
    }

    fn outcomes(&self, state: usize, action: usize) -> Result<Vec<Outcome<usize, T>>> {
        check_action(action, self.num_actions)?;
        let step = self.mdp.step_from(state, action)?;
        Ok(vec![Outcome::certain(step.next_state, step.reward)])
    }
}

/// Exposes a [`DeterministicGrid`] as an environment over its cells.
#[derive(Debug)]
pub struct DeterministicGridAdapter<'a, G: ?Sized> {
    grid: &'a G,
    space: GridSpace,
    num_actions: usize,
}

impl<'a, G: ?Sized> DeterministicGridAdapter<'a, G> {
    pub fn new<T: Real>(grid: &'a G) -> Self
    where
        G: DeterministicGrid<T>,
    {
        let (rows, cols) = grid.shape();
        Self {
            grid,
            space: GridSpace::new(rows, cols),
            num_actions: grid.num_actions(),
        }
    }
}

impl<T, G> Environment<T> for DeterministicGridAdapter<'_, G>
where
    T: Real,
    G: DeterministicGrid<T> + ?Sized,
{
    type Space = GridSpace;

    fn space(&self) -> &GridSpace {
        &self.space
    }

    fn num_actions(&self) -> usize {
        self.num_actions
    }

    fn is_terminal(&self, cell: Cell) -> Result<bool> {
        self.grid.is_terminal(cell)
    }

    fn outcomes(&self, cell: Cell, action: usize) -> Result<Vec<Outcome<Cell, T>>> {
        check_action(action, self.num_actions)?;
        let step = self.grid.step_from(cell, action)?;
        Ok(vec![Outcome::certain(step.next_state, step.reward)])
    }
}

/// How the stochastic grid adapter weighs an action's expected return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionWeighting {
    /// Only the per-outcome probabilities.
    OutcomeOnly,
    /// Outcome probabilities multiplied by the per-cell action-execution probability.
    #[default]
    OutcomeAndExecution,
}

/// Exposes a [`StochasticGrid`] as an environment over its cells.
#[derive(Debug)]
pub struct StochasticGridAdapter<'a, G: ?Sized> {
    grid: &'a G,
    space: GridSpace,
    num_actions: usize,
    weighting: ActionWeighting,
}

impl<'a, G: ?Sized> StochasticGridAdapter<'a, G> {
    pub fn new<T: Real>(grid: &'a G) -> Self
    where
        G: StochasticGrid<T>,
    {
        let (rows, cols) = grid.shape();
        Self {
            grid,
            space: GridSpace::new(rows, cols),
            num_actions: grid.num_actions(),
            weighting: ActionWeighting::default(),
        }
    }

    pub fn with_weighting(mut self, weighting: ActionWeighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn weighting(&self) -> ActionWeighting {
        self.weighting
    }
}

impl<T, G> Environment<T> for StochasticGridAdapter<'_, G>
where
    T: Real,
    G: StochasticGrid<T> + ?Sized,
{
    type Space = GridSpace;

    fn space(&self) -> &GridSpace {
        &self.space
    }

    fn num_actions(&self) -> usize {
        self.num_actions
    }

    fn is_terminal(&self, cell: Cell) -> Result<bool> {
        self.grid.is_terminal(cell)
    }

    fn outcomes(&self, cell: Cell, action: usize) -> Result<Vec<Outcome<Cell, T>>> {
        check_action(action, self.num_actions)?;
        self.grid.enumerate_outcomes(cell, action)
    }

    fn action_weight(&self, cell: Cell, action: usize) -> Result<T> {
        match self.weighting {
            ActionWeighting::OutcomeOnly => Ok(T::one()),
            ActionWeighting::OutcomeAndExecution => {
                self.grid.action_execution_probability(cell, action)
            }
        }
    }
}

/// Probes a stateful MDP without disturbing it.
///
/// Each query locks the wrapped process, repositions it with `force_state`,
/// takes an uncommitted step and puts the process back where it was.
#[derive(Debug)]
pub struct DryRun<M> {
    inner: Mutex<M>,
    spaces: (usize, usize),
}

impl<M> DryRun<M> {
    pub fn new<T: Real>(mdp: M) -> Self
    where
        M: SteppableMdp<T>,
    {
        let spaces = mdp.declare_spaces();
        Self {
            inner: Mutex::new(mdp),
            spaces,
        }
    }

    pub fn into_inner(self) -> Result<M> {
        self.inner.into_inner().map_err(|_| poisoned())
    }
}

fn poisoned() -> Error {
    Error::OracleUnavailable("a previous probe panicked while holding the environment".into())
}

impl<T, M> DiscreteMdp<T> for DryRun<M>
where
    T: Real,
    M: SteppableMdp<T>,
{
    fn declare_spaces(&self) -> (usize, usize) {
        self.spaces
    }

    fn step_from(&self, state: usize, action: usize) -> Result<Transition<usize, T>> {
        let mut mdp = self.inner.lock().map_err(|_| poisoned())?;
        let saved = mdp.current_state();
        mdp.force_state(state)?;
        let step = mdp.step(action, false);
        mdp.force_state(saved)?;
        step
    }

    fn is_terminal(&self, state: usize) -> Result<bool> {
        self.inner.lock().map_err(|_| poisoned())?.is_terminal(state)
    }
}

/// Value iteration over a generic discrete MDP.
pub fn mdp_value_iteration<T, M>(
    mdp: &M,
    max_iterations: usize,
    gamma: T,
    theta: T,
) -> Result<ValueIterationResult<T>>
where
    T: Real,
    M: DiscreteMdp<T> + ?Sized,
{
    let env = GenericMdpAdapter::new::<T>(mdp);
    ValueIteration::new(ValueIterationConfig::new(max_iterations, gamma, theta))?.run(&env)
}

/// Value iteration over a deterministic grid world.
pub fn grid_world_value_iteration<T, G>(
    grid: &G,
    max_iterations: usize,
    gamma: T,
    theta: T,
) -> Result<ValueIterationResult<T>>
where
    T: Real,
    G: DeterministicGrid<T> + ?Sized,
{
    let env = DeterministicGridAdapter::new::<T>(grid);
    ValueIteration::new(ValueIterationConfig::new(max_iterations, gamma, theta))?.run(&env)
}

/// Value iteration over a stochastic grid world.
pub fn stochastic_grid_world_value_iteration<T, G>(
    grid: &G,
    weighting: ActionWeighting,
    max_iterations: usize,
    gamma: T,
    theta: T,
) -> Result<ValueIterationResult<T>>
where
    T: Real,
    G: StochasticGrid<T> + ?Sized,
{
    let env = StochasticGridAdapter::new::<T>(grid).with_weighting(weighting);
    ValueIteration::new(ValueIterationConfig::new(max_iterations, gamma, theta))?.run(&env)
}
