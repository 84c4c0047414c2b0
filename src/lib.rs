pub mod dynamic;
pub mod error;

pub use dynamic::{
    grid_world_value_iteration, mdp_value_iteration, run_value_iteration,
    stochastic_grid_world_value_iteration, ValueIteration, ValueIterationConfig,
    ValueIterationResult,
};
pub use error::{Error, Result};
