//! Value iteration: repeated synchronous Bellman sweeps until the largest
//! per-state change drops below `theta` or the sweep budget runs out.
//!
//! ```text
//! INIT ──▶ SWEEPING ──▶ CONVERGED
//!              │
//!              ├──────▶ BUDGET_EXHAUSTED
//!              └──────▶ INTERRUPTED
//! ```
//!
//! Every end state returns the current value table; running out of budget is
//! reported through [`ValueIterationResult::converged`], not as an error.

use std::ops::ControlFlow;

use crate::dynamic::convergence::{ConvergenceMonitor, Status, Termination};
use crate::dynamic::oracle::Environment;
use crate::dynamic::space::StateSpace;
use crate::dynamic::sweep::{DoubleBuffer, SweepDriver, SweepOrder};
use crate::dynamic::table::ValueTable;
use crate::dynamic::Real;
use crate::error::{Error, Result};

/// Configuration options for value iteration.
#[derive(Debug, Clone)]
pub struct ValueIterationConfig<T> {
    /// Maximum number of sweeps
    pub max_iterations: usize,
    /// Discount factor, in [0, 1]
    pub gamma: T,
    /// Convergence threshold on the largest per-state change of a sweep
    pub theta: T,
    /// Visiting order of a serial sweep
    pub order: SweepOrder,
    /// Back up the states of a sweep in parallel
    pub parallel: bool,
    /// Check every outcome set reported during the first sweep
    pub validate_transitions: bool,
    /// Allowed deviation of an outcome set's total probability from one
    pub probability_tolerance: T,
}

impl<T: Real> Default for ValueIterationConfig<T> {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            gamma: T::one(),
            theta: T::from(1e-5).unwrap_or_else(T::epsilon),
            order: SweepOrder::default(),
            parallel: false,
            validate_transitions: cfg!(debug_assertions),
            probability_tolerance: T::from(1e-6).unwrap_or_else(T::epsilon),
        }
    }
}

impl<T: Real> ValueIterationConfig<T> {
    pub fn new(max_iterations: usize, gamma: T, theta: T) -> Self {
        Self {
            max_iterations,
            gamma,
            theta,
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: SweepOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_validation(mut self, validate_transitions: bool) -> Self {
        self.validate_transitions = validate_transitions;
        self
    }

    pub fn with_probability_tolerance(mut self, tolerance: T) -> Self {
        self.probability_tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.gamma.is_finite() || self.gamma < T::zero() || self.gamma > T::one() {
            return Err(Error::invalid_config(format!(
                "discount factor gamma must be between 0 and 1, got {:?}",
                self.gamma
            )));
        }
        if !self.theta.is_finite() || self.theta <= T::zero() {
            return Err(Error::invalid_config(format!(
                "convergence threshold theta must be positive, got {:?}",
                self.theta
            )));
        }
        if !self.probability_tolerance.is_finite() || self.probability_tolerance < T::zero() {
            return Err(Error::invalid_config(format!(
                "probability tolerance must be non-negative, got {:?}",
                self.probability_tolerance
            )));
        }
        Ok(())
    }
}

/// Result of a value iteration run.
#[derive(Debug, Clone)]
pub struct ValueIterationResult<T> {
    /// Value of every state after the last completed sweep
    pub values: ValueTable<T>,
    /// Number of sweeps performed
    pub iterations: usize,
    /// Whether the last sweep's delta fell below `theta`
    pub converged: bool,
    pub termination: Termination,
    /// Delta of the last sweep, `None` if no sweep ran
    pub final_delta: Option<T>,
    /// Delta of every sweep, in order
    pub deltas: Vec<T>,
}

/// Value iteration solver.
#[derive(Debug, Clone)]
pub struct ValueIteration<T> {
    config: ValueIterationConfig<T>,
}

impl<T: Real> ValueIteration<T> {
    pub fn new(config: ValueIterationConfig<T>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ValueIterationConfig<T> {
        &self.config
    }

    /// Solves `env` starting from an all-zero table.
    pub fn run<E>(&self, env: &E) -> Result<ValueIterationResult<T>>
    where
        E: Environment<T> + ?Sized,
    {
        let initial = ValueTable::zeros(env.space().shape());
        self.run_from(env, initial)
    }

    /// Solves `env` starting from `initial`. Terminal states keep their
    /// initial values.
    pub fn run_from<E>(&self, env: &E, initial: ValueTable<T>) -> Result<ValueIterationResult<T>>
    where
        E: Environment<T> + ?Sized,
    {
        self.run_with(env, initial, |_, _| ControlFlow::Continue(()))
    }

    /// Like [`ValueIteration::run_from`], calling `on_sweep(iteration, delta)`
    /// after every sweep. Returning `ControlFlow::Break` stops the run at that
    /// sweep boundary with [`Termination::Interrupted`], unless the sweep has
    /// already converged or used up the budget.
    pub fn run_with<E, F>(
        &self,
        env: &E,
        initial: ValueTable<T>,
        mut on_sweep: F,
    ) -> Result<ValueIterationResult<T>>
    where
        E: Environment<T> + ?Sized,
        F: FnMut(usize, T) -> ControlFlow<()>,
    {
        let config = &self.config;
        let shape = env.space().shape();
        if initial.shape() != shape {
            return Err(Error::invalid_index(format!(
                "initial table of shape {:?} does not match state space {:?}",
                initial.shape(),
                shape
            )));
        }
        if initial.values().iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid_config("initial values must be finite"));
        }

        let driver = SweepDriver::new(env, config.gamma, config.order, config.parallel)?;
        let mut buffers = DoubleBuffer::new(initial.to_vec());
        let mut monitor = ConvergenceMonitor::new(config.theta, config.max_iterations);
        let tolerance = config
            .validate_transitions
            .then_some(config.probability_tolerance);

        let termination = if monitor.is_exhausted() {
            Termination::BudgetExhausted
        } else {
            loop {
                let iteration = monitor.iterations();
                let check = if iteration == 0 { tolerance } else { None };
                let delta = driver.sweep(&mut buffers, iteration, check)?;
                log::debug!("sweep {}: delta = {:?}", iteration + 1, delta);

                let status = monitor.observe(delta);
                let flow = on_sweep(monitor.iterations(), delta);
                match status {
                    Status::Done(termination) => break termination,
                    Status::Continue if flow.is_break() => break Termination::Interrupted,
                    Status::Continue => {}
                }
            }
        };

        log::info!(
            "value iteration over {} states finished: {:?} after {} sweeps (last delta {:?})",
            driver.len(),
            termination,
            monitor.iterations(),
            monitor.last_delta()
        );

        let iterations = monitor.iterations();
        let final_delta = monitor.last_delta();
        Ok(ValueIterationResult {
            values: ValueTable::from_vec(shape, buffers.into_current())?,
            iterations,
            converged: termination == Termination::Converged,
            termination,
            final_delta,
            deltas: monitor.into_deltas(),
        })
    }
}

/// Computes the optimal state values of `env` by value iteration.
///
/// # Arguments
/// - `env`: the environment model
/// - `max_iterations`: maximum number of sweeps
/// - `gamma`: discount factor in [0, 1]
/// - `theta`: stop once no state changes by `theta` or more in a sweep
///
/// # Examples
///
/// ```
/// use valiter::dynamic::{run_value_iteration, TabularMdp};
///
/// // 2 states, 2 actions: for each (state, action), a list of (next_state, probability, reward)
/// let transitions = vec![
///     vec![vec![(0, 0.7, 1.0), (1, 0.3, 0.5)], vec![(1, 1.0, 2.0)]],
///     vec![vec![(0, 0.4, 0.8), (1, 0.6, 0.0)], vec![(0, 0.1, 0.0), (1, 0.9, 1.5)]],
/// ];
/// let mdp = TabularMdp::new(2, 2, transitions).unwrap();
///
/// let result = run_value_iteration(&mdp, 1000, 0.9, 1e-8).unwrap();
/// assert!(result.converged);
/// assert_eq!(result.values.len(), 2);
/// ```
pub fn run_value_iteration<T, E>(
    env: &E,
    max_iterations: usize,
    gamma: T,
    theta: T,
) -> Result<ValueIterationResult<T>>
where
    T: Real,
    E: Environment<T> + ?Sized,
{
    ValueIteration::new(ValueIterationConfig::new(max_iterations, gamma, theta))?.run(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::adapters::{DeterministicGridAdapter, StochasticGridAdapter};
    use crate::dynamic::backup::bellman_backup;
    use crate::dynamic::envs::{random_tabular_mdp, GridWorld, StochasticGridWorld, TabularMdp};
    use crate::dynamic::oracle::Outcome;
    use crate::dynamic::space::{Cell, IndexSpace, TableShape};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn goal_grid() -> GridWorld<f64> {
        GridWorld::new(4, 4, -1.0).with_terminal(Cell::new(0, 3)).unwrap()
    }

    #[test]
    fn test_self_loop_converges_to_geometric_sum() {
        let mdp = TabularMdp::new(1, 1, vec![vec![vec![(0, 1.0, 2.0)]]]).unwrap();
        let result = run_value_iteration(&mdp, 10_000, 0.9, 1e-10).unwrap();
        assert!(result.converged);
        assert_relative_eq!(result.values.get(0).unwrap(), 20.0, epsilon = 1e-6);
    }

    #[test]
    fn test_probability_weighting_single_sweep() {
        let mdp = TabularMdp::new(
            3,
            1,
            vec![
                vec![vec![(1, 0.8, 10.0), (2, 0.2, 0.0)]],
                vec![vec![(1, 1.0, 0.0)]],
                vec![vec![(2, 1.0, 0.0)]],
            ],
        )
        .unwrap();
        let config = ValueIterationConfig::new(1, 0.0, 1e-6);
        let result = ValueIteration::new(config).unwrap().run(&mdp).unwrap();
        assert_abs_diff_eq!(result.values.get(0).unwrap(), 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_deterministic_grid_start_value() {
        let grid = goal_grid();
        let env = DeterministicGridAdapter::new::<f64>(&grid);
        let result = run_value_iteration(&env, 1000, 1.0, 1e-5).unwrap();

        assert!(result.converged);
        assert_eq!(result.values.get_cell(0, 0), Some(-3.0));
        assert_eq!(result.values.get_cell(0, 3), Some(0.0));
        assert_eq!(result.values.get_cell(3, 0), Some(-6.0));

        let table = result.values.to_grid().unwrap();
        for row in 0..4 {
            for col in 0..4 {
                let distance = row + (3 - col);
                assert_eq!(table[[row, col]], -(distance as f64));
            }
        }
    }

    #[test]
    fn test_budget_exhaustion_returns_one_sweep() {
        let grid = goal_grid();
        let env = DeterministicGridAdapter::new::<f64>(&grid);
        let result = run_value_iteration(&env, 1, 1.0, 1e-5).unwrap();

        assert!(!result.converged);
        assert_eq!(result.termination, Termination::BudgetExhausted);
        assert_eq!(result.iterations, 1);

        let zeros = vec![0.0; 16];
        for (index, cell) in grid.space().cells().enumerate() {
            let expected = bellman_backup(&env, cell, &zeros, 1.0)
                .unwrap()
                .map_or(0.0, |b| b.value);
            assert_eq!(result.values.get(index), Some(expected));
        }
    }

    #[test]
    fn test_zero_budget_returns_initial_table() {
        let mdp = TabularMdp::new(1, 1, vec![vec![vec![(0, 1.0, 1.0)]]]).unwrap();
        let result = run_value_iteration(&mdp, 0, 0.5, 1e-5).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.final_delta, None);
        assert_eq!(result.values.to_vec(), vec![0.0]);
    }

    #[test]
    fn test_terminal_values_never_change() {
        let grid = goal_grid().with_terminal(Cell::new(3, 3)).unwrap();
        let env = DeterministicGridAdapter::new::<f64>(&grid);
        let mut initial = vec![0.0; 16];
        initial[3] = 4.0;
        initial[15] = -2.0;
        let initial = ValueTable::from_vec(TableShape::Grid { rows: 4, cols: 4 }, initial).unwrap();

        let solver = ValueIteration::new(ValueIterationConfig::new(1000, 1.0, 1e-6)).unwrap();
        for budget in [1, 2, 5] {
            let mut sweeps = 0;
            let result = solver
                .run_with(&env, initial.clone(), |_, _| {
                    sweeps += 1;
                    if sweeps == budget {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                })
                .unwrap();
            assert_eq!(result.values.get_cell(0, 3), Some(4.0));
            assert_eq!(result.values.get_cell(3, 3), Some(-2.0));
        }
    }

    #[test]
    fn test_deltas_never_increase_on_discounted_mdp() {
        let mdp = random_tabular_mdp(30, 4, 3, 42).unwrap();
        let result = run_value_iteration(&mdp, 10_000, 0.9, 1e-9).unwrap();

        assert!(result.converged);
        assert!(result.iterations > 1);
        for pair in result.deltas.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12, "{:?}", pair);
        }
    }

    #[test]
    fn test_order_independence() {
        let mdp = random_tabular_mdp(25, 3, 4, 7).unwrap();
        let base = ValueIterationConfig::new(10_000, 0.95, 1e-9);

        let ascending = ValueIteration::new(base.clone()).unwrap().run(&mdp).unwrap();
        let descending = ValueIteration::new(base.clone().with_order(SweepOrder::Descending))
            .unwrap()
            .run(&mdp)
            .unwrap();
        let parallel = ValueIteration::new(base.with_parallel(true))
            .unwrap()
            .run(&mdp)
            .unwrap();

        assert_eq!(ascending.iterations, descending.iterations);
        for other in [&descending, &parallel] {
            let diff = ascending.values.max_abs_diff(&other.values).unwrap();
            assert_abs_diff_eq!(diff, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_interrupt_returns_best_so_far() {
        let mdp = random_tabular_mdp(10, 2, 2, 3).unwrap();
        let solver = ValueIteration::new(ValueIterationConfig::new(1000, 0.99, 1e-12)).unwrap();
        let result = solver
            .run_with(&mdp, ValueTable::zeros(TableShape::Linear(10)), |iteration, _| {
                if iteration == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();

        assert_eq!(result.termination, Termination::Interrupted);
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.deltas.len(), 3);
    }

    #[test]
    fn test_stochastic_grid_matches_hand_computed_sweep() {
        let grid = GridWorld::new(1, 2, 1.0).with_terminal(Cell::new(0, 1)).unwrap();
        let world = StochasticGridWorld::new(grid, 0.8).unwrap();
        let env = StochasticGridAdapter::new::<f64>(&world);

        let result = run_value_iteration(&env, 1, 0.5, 1e-9).unwrap();
        // Every move collects 1.0 wherever it lands, so one sweep gives 1.0.
        assert_abs_diff_eq!(result.values.get(0).unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(result.values.get(1), Some(0.0));
    }

    /// Reports whatever outcome list it was built with.
    struct Broken {
        space: IndexSpace,
        outcomes: Vec<Outcome<usize, f64>>,
    }

    impl Environment<f64> for Broken {
        type Space = IndexSpace;

        fn space(&self) -> &IndexSpace {
            &self.space
        }

        fn num_actions(&self) -> usize {
            1
        }

        fn is_terminal(&self, _state: usize) -> Result<bool> {
            Ok(false)
        }

        fn outcomes(&self, _state: usize, _action: usize) -> Result<Vec<Outcome<usize, f64>>> {
            Ok(self.outcomes.clone())
        }
    }

    #[test]
    fn test_validation_reports_malformed_transitions() {
        let env = Broken {
            space: IndexSpace::new(1),
            outcomes: vec![Outcome::new(0, 1.0, 0.6)],
        };
        let strict = ValueIterationConfig::new(10, 0.5, 1e-6).with_validation(true);
        let err = ValueIteration::new(strict).unwrap().run(&env).unwrap_err();
        assert!(matches!(err, Error::MalformedTransition { .. }));

        let lax = ValueIterationConfig::new(10, 0.5, 1e-6).with_validation(false);
        assert!(ValueIteration::new(lax).unwrap().run(&env).is_ok());
    }

    #[test]
    fn test_out_of_range_successor_propagates() {
        let env = Broken {
            space: IndexSpace::new(1),
            outcomes: vec![Outcome::certain(9, 1.0)],
        };
        let err = run_value_iteration(&env, 10, 0.5, 1e-6).unwrap_err();
        assert!(matches!(err, Error::InvalidIndex(_)));
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(ValueIteration::new(ValueIterationConfig::new(10, 1.5, 1e-3)).is_err());
        assert!(ValueIteration::new(ValueIterationConfig::new(10, -0.1, 1e-3)).is_err());
        assert!(ValueIteration::new(ValueIterationConfig::new(10, 0.9, 0.0)).is_err());
        assert!(ValueIteration::new(ValueIterationConfig::new(10, 0.9, f64::NAN)).is_err());
        let bad_tolerance = ValueIterationConfig::new(10, 0.9, 1e-3).with_probability_tolerance(-1.0);
        assert!(ValueIteration::new(bad_tolerance).is_err());
    }

    #[test]
    fn test_initial_table_shape_must_match() {
        let mdp = TabularMdp::new(1, 1, vec![vec![vec![(0, 1.0, 1.0)]]]).unwrap();
        let solver = ValueIteration::new(ValueIterationConfig::default()).unwrap();
        let err = solver
            .run_from(&mdp, ValueTable::zeros(TableShape::Linear(2)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidIndex(_)));
    }

    #[test]
    fn test_default_config() {
        let config = ValueIterationConfig::<f64>::default();
        assert_eq!(config.max_iterations, 1000);
        assert_eq!(config.gamma, 1.0);
        assert_eq!(config.theta, 1e-5);
        assert!(config.validate().is_ok());
    }
}
