use crate::dynamic::Real;

/// Why a run of value iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The last sweep changed no value by `theta` or more.
    Converged,
    /// `max_iterations` sweeps ran without converging. Not an error.
    BudgetExhausted,
    /// The caller asked to stop at a sweep boundary.
    Interrupted,
}

/// Verdict after observing one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Continue,
    Done(Termination),
}

/// Tracks sweep deltas against the threshold and the iteration budget.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor<T> {
    theta: T,
    max_iterations: usize,
    deltas: Vec<T>,
}

impl<T: Real> ConvergenceMonitor<T> {
    pub fn new(theta: T, max_iterations: usize) -> Self {
        Self {
            theta,
            max_iterations,
            deltas: Vec::new(),
        }
    }

    /// Number of sweeps observed so far.
    pub fn iterations(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.iterations() >= self.max_iterations
    }

    /// Records the largest change of a finished sweep and decides whether to go on.
    pub fn observe(&mut self, delta: T) -> Status {
        self.deltas.push(delta);
        if delta < self.theta {
            Status::Done(Termination::Converged)
        } else if self.is_exhausted() {
            Status::Done(Termination::BudgetExhausted)
        } else {
            Status::Continue
        }
    }

    pub fn last_delta(&self) -> Option<T> {
        self.deltas.last().copied()
    }

    pub fn deltas(&self) -> &[T] {
        &self.deltas
    }

    pub fn into_deltas(self) -> Vec<T> {
        self.deltas
    }
}
