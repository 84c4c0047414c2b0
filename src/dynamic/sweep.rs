//! One synchronous sweep of the Bellman backup over every non-terminal state.
//!
//! Values are double-buffered: every backup of a sweep reads the previous
//! sweep's table and writes only its own slot of the next one, so the result
//! does not depend on the order states are visited in and the states can be
//! processed in parallel.

use rayon::prelude::*;

use crate::dynamic::backup::backup_state;
use crate::dynamic::oracle::{Environment, StateOf};
use crate::dynamic::space::StateSpace;
use crate::dynamic::Real;
use crate::error::{Error, Result};

/// Order in which a serial sweep visits the state indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepOrder {
    /// `0, 1, ..., n - 1` (row-major for grids).
    #[default]
    Ascending,
    /// `n - 1, ..., 1, 0`.
    Descending,
}

/// Two value buffers swapped after every sweep.
#[derive(Debug, Clone)]
pub struct DoubleBuffer<T> {
    read: Vec<T>,
    write: Vec<T>,
}

impl<T: Real> DoubleBuffer<T> {
    pub fn new(initial: Vec<T>) -> Self {
        Self {
            write: initial.clone(),
            read: initial,
        }
    }

    /// Values produced by the last completed sweep.
    pub fn current(&self) -> &[T] {
        &self.read
    }

    pub fn into_current(self) -> Vec<T> {
        self.read
    }

    fn swap(&mut self) {
        std::mem::swap(&mut self.read, &mut self.write);
    }
}

/// Applies the backup to every non-terminal state of an environment.
pub struct SweepDriver<'a, T: Real, E: Environment<T> + ?Sized> {
    env: &'a E,
    states: Vec<StateOf<E, T>>,
    terminal: Vec<bool>,
    gamma: T,
    order: SweepOrder,
    parallel: bool,
}

impl<'a, T, E> SweepDriver<'a, T, E>
where
    T: Real,
    E: Environment<T> + ?Sized,
{
    /// Enumerates the state space and queries each state's terminal flag once.
    pub fn new(env: &'a E, gamma: T, order: SweepOrder, parallel: bool) -> Result<Self> {
        let space = env.space();
        let mut states = Vec::with_capacity(space.len());
        let mut terminal = Vec::with_capacity(space.len());
        for index in 0..space.len() {
            let state = space.state_at(index).ok_or_else(|| {
                Error::invalid_index(format!(
                    "state space of {} states has no state at index {}",
                    space.len(),
                    index
                ))
            })?;
            terminal.push(env.is_terminal(state)?);
            states.push(state);
        }

        Ok(Self {
            env,
            states,
            terminal,
            gamma,
            order,
            parallel,
        })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn is_terminal(&self, index: usize) -> bool {
        self.terminal.get(index).copied().unwrap_or(false)
    }

    /// Runs one sweep, leaving the new values as `buffers.current()`.
    ///
    /// Returns the largest absolute change over the non-terminal states, or
    /// negative infinity when there are none. `tolerance` enables validation
    /// of every outcome set queried during this sweep.
    pub fn sweep(
        &self,
        buffers: &mut DoubleBuffer<T>,
        iteration: usize,
        tolerance: Option<T>,
    ) -> Result<T> {
        if buffers.read.len() != self.len() || buffers.write.len() != self.len() {
            return Err(Error::invalid_index(format!(
                "value buffers of {} entries do not match {} states",
                buffers.read.len(),
                self.len()
            )));
        }

        let read = &buffers.read;
        let write = &mut buffers.write;
        if self.parallel {
            write
                .par_iter_mut()
                .enumerate()
                .filter(|(index, _)| !self.terminal[*index])
                .try_for_each(|(index, slot)| -> Result<()> {
                    *slot = self.update(index, read, iteration, tolerance)?;
                    Ok(())
                })?;
        } else {
            let indices: Box<dyn Iterator<Item = usize>> = match self.order {
                SweepOrder::Ascending => Box::new(0..self.len()),
                SweepOrder::Descending => Box::new((0..self.len()).rev()),
            };
            for index in indices.filter(|&index| !self.terminal[index]) {
                write[index] = self.update(index, read, iteration, tolerance)?;
            }
        }

        let delta = self.max_change(read, write);
        buffers.swap();
        Ok(delta)
    }

    fn update(&self, index: usize, read: &[T], iteration: usize, tolerance: Option<T>) -> Result<T> {
        let state = self.states[index];
        match backup_state(self.env, state, read, self.gamma, tolerance)? {
            Some(backup) => Ok(backup.value),
            None => {
                if iteration == 0 {
                    log::warn!("state {:?} has no available action, keeping its value", state);
                }
                Ok(read[index])
            }
        }
    }

    fn max_change(&self, read: &[T], write: &[T]) -> T {
        let mut delta = T::neg_infinity();
        for (index, (&old, &new)) in read.iter().zip(write.iter()).enumerate() {
            if !self.terminal[index] {
                delta = delta.max((new - old).abs());
            }
        }
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::adapters::DeterministicGridAdapter;
    use crate::dynamic::envs::{GridWorld, TabularMdp};
    use crate::dynamic::space::Cell;

    fn chain() -> TabularMdp<f64> {
        // 0 -> 1 -> 2 (terminal), reward 1 per move; action 1 stays put for free.
        TabularMdp::new(
            3,
            2,
            vec![
                vec![vec![(1, 1.0, 1.0)], vec![(0, 1.0, 0.0)]],
                vec![vec![(2, 1.0, 1.0)], vec![(1, 1.0, 0.0)]],
                vec![vec![(2, 1.0, 0.0)], vec![(2, 1.0, 0.0)]],
            ],
        )
        .unwrap()
        .with_terminal_states(&[2])
        .unwrap()
    }

    #[test]
    fn test_sweep_reads_only_previous_values() {
        let mdp = chain();
        let driver = SweepDriver::new(&mdp, 1.0, SweepOrder::Ascending, false).unwrap();
        let mut buffers = DoubleBuffer::new(vec![0.0; 3]);

        let delta = driver.sweep(&mut buffers, 0, None).unwrap();
        // State 0 must not see state 1's fresh value within the same sweep.
        assert_eq!(buffers.current(), &[1.0, 1.0, 0.0]);
        assert_eq!(delta, 1.0);

        driver.sweep(&mut buffers, 1, None).unwrap();
        assert_eq!(buffers.current(), &[2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_orders_and_parallel_agree() {
        let mdp = chain();
        let mut results = Vec::new();
        for (order, parallel) in [
            (SweepOrder::Ascending, false),
            (SweepOrder::Descending, false),
            (SweepOrder::Ascending, true),
        ] {
            let driver = SweepDriver::new(&mdp, 0.9, order, parallel).unwrap();
            let mut buffers = DoubleBuffer::new(vec![0.0; 3]);
            for iteration in 0..3 {
                driver.sweep(&mut buffers, iteration, None).unwrap();
            }
            results.push(buffers.into_current());
        }
        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], results[2]);
    }

    #[test]
    fn test_terminal_slots_are_untouched() {
        let grid = GridWorld::new(2, 2, -1.0)
            .with_terminal(Cell::new(0, 0))
            .unwrap();
        let env = DeterministicGridAdapter::new::<f64>(&grid);
        let driver = SweepDriver::new(&env, 1.0, SweepOrder::Ascending, false).unwrap();
        assert!(driver.is_terminal(0));

        let mut buffers = DoubleBuffer::new(vec![7.0, 0.0, 0.0, 0.0]);
        driver.sweep(&mut buffers, 0, None).unwrap();
        driver.sweep(&mut buffers, 1, None).unwrap();
        assert_eq!(buffers.current()[0], 7.0);
    }

    #[test]
    fn test_all_terminal_sweep_reports_negative_infinity() {
        let mdp = TabularMdp::new(1, 1, vec![vec![vec![(0, 1.0, 1.0)]]])
            .unwrap()
            .with_terminal_states(&[0])
            .unwrap();
        let driver = SweepDriver::new(&mdp, 0.5, SweepOrder::Ascending, false).unwrap();
        let mut buffers = DoubleBuffer::new(vec![0.0]);
        let delta = driver.sweep(&mut buffers, 0, None).unwrap();
        assert_eq!(delta, f64::NEG_INFINITY);
    }

    #[test]
    fn test_mismatched_buffers_are_rejected() {
        let mdp = chain();
        let driver = SweepDriver::new(&mdp, 1.0, SweepOrder::Ascending, false).unwrap();
        let mut buffers = DoubleBuffer::new(vec![0.0; 2]);
        assert!(matches!(
            driver.sweep(&mut buffers, 0, None),
            Err(Error::InvalidIndex(_))
        ));
    }
}
