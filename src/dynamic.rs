pub mod adapters;
pub mod backup;
pub mod convergence;
pub mod envs;
pub mod oracle;
pub mod space;
pub mod sweep;
pub mod table;
pub mod value_iteration;

use approx::AbsDiffEq;
use num_traits::Float;
use std::fmt::Debug;

/// Scalar type of rewards, probabilities and values.
pub trait Real: Float + AbsDiffEq<Epsilon = Self> + Debug + Send + Sync + 'static {}

impl<T> Real for T where T: Float + AbsDiffEq<Epsilon = T> + Debug + Send + Sync + 'static {}

// Re-export value iteration with descriptive names
pub use adapters::{
    grid_world_value_iteration, mdp_value_iteration, stochastic_grid_world_value_iteration,
    ActionWeighting, DeterministicGridAdapter, DryRun, GenericMdpAdapter, StochasticGridAdapter,
};
pub use backup::{bellman_backup, q_value, Backup};
pub use convergence::{ConvergenceMonitor, Status, Termination};
pub use envs::{random_tabular_mdp, Direction, GridWorld, StochasticGridWorld, TabularMdp};
pub use oracle::{
    DeterministicGrid, DiscreteMdp, Environment, Outcome, StateOf, SteppableMdp, StochasticGrid,
    Transition,
};
pub use space::{Cell, GridSpace, IndexSpace, StateSpace, TableShape};
pub use sweep::{DoubleBuffer, SweepDriver, SweepOrder};
pub use table::ValueTable;
pub use value_iteration::{
    run_value_iteration, ValueIteration, ValueIterationConfig, ValueIterationResult,
};
