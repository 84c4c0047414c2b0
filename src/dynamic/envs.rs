//! Ready-made environments: explicit tabular MDPs and grid worlds.

pub mod grid_world;
pub mod random;
pub mod stochastic_grid_world;
pub mod tabular;

pub use grid_world::{Direction, GridWorld};
pub use random::random_tabular_mdp;
pub use stochastic_grid_world::StochasticGridWorld;
pub use tabular::TabularMdp;
