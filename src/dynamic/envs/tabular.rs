//! A Markov decision process given as explicit transition tables.

use crate::dynamic::oracle::{Environment, Outcome};
use crate::dynamic::space::IndexSpace;
use crate::dynamic::Real;
use crate::error::{Error, Result};

/// A discrete MDP in tabular form.
///
/// For each `(state, action)` the model lists `(next_state, probability, reward)`
/// triples. An empty list marks the action as unavailable in that state.
#[derive(Debug, Clone)]
pub struct TabularMdp<T> {
    space: IndexSpace,
    num_actions: usize,
    transitions: Vec<Vec<Vec<(usize, T, T)>>>,
    terminal: Vec<bool>,
}

impl<T: Real> TabularMdp<T> {
    /// Creates a new MDP from `transitions[s][a] = vec![(s_next, p, r), ...]`.
    ///
    /// Fails if the dimensions don't match `num_states` and `num_actions`, if a
    /// successor is out of range, or if a non-empty probability list doesn't
    /// sum to 1.0 (within 1e-8).
    pub fn new(
        num_states: usize,
        num_actions: usize,
        transitions: Vec<Vec<Vec<(usize, T, T)>>>,
    ) -> Result<Self> {
        if transitions.len() != num_states {
            return Err(Error::invalid_index(format!(
                "expected transitions for {} states, got {}",
                num_states,
                transitions.len()
            )));
        }
        let tolerance = T::from(1e-8).unwrap_or_else(T::epsilon);
        for (s, per_action) in transitions.iter().enumerate() {
            if per_action.len() != num_actions {
                return Err(Error::invalid_index(format!(
                    "state {} lists {} actions, expected {}",
                    s,
                    per_action.len(),
                    num_actions
                )));
            }
            for (a, outcomes) in per_action.iter().enumerate() {
                if let Some(&(next, _, _)) = outcomes.iter().find(|(next, _, _)| *next >= num_states) {
                    return Err(Error::invalid_index(format!(
                        "state {s}, action {a} leads to state {next} of {num_states}"
                    )));
                }
                if outcomes.is_empty() {
                    continue;
                }
                let prob_sum = outcomes.iter().fold(T::zero(), |acc, &(_, p, _)| acc + p);
                if (prob_sum - T::one()).abs() > tolerance {
                    return Err(Error::malformed(
                        s,
                        a,
                        format!("probabilities must sum to 1.0, but got {prob_sum:?}"),
                    ));
                }
            }
        }

        Ok(Self {
            space: IndexSpace::new(num_states),
            num_actions,
            transitions,
            terminal: vec![false; num_states],
        })
    }

    /// Marks `states` as terminal.
    pub fn with_terminal_states(mut self, states: &[usize]) -> Result<Self> {
        for &s in states {
            let flag = self.terminal.get_mut(s).ok_or_else(|| {
                Error::invalid_index(format!("terminal state {s} out of range"))
            })?;
            *flag = true;
        }
        Ok(self)
    }

    pub fn num_states(&self) -> usize {
        self.terminal.len()
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// The `(next_state, probability, reward)` list of `(state, action)`.
    pub fn transitions(&self, state: usize, action: usize) -> Option<&[(usize, T, T)]> {
        self.transitions
            .get(state)
            .and_then(|per_action| per_action.get(action))
            .map(Vec::as_slice)
    }
}

impl<T: Real> Environment<T> for TabularMdp<T> {
    type Space = IndexSpace;

    fn space(&self) -> &IndexSpace {
        &self.space
    }

    fn num_actions(&self) -> usize {
        self.num_actions
    }

    fn is_terminal(&self, state: usize) -> Result<bool> {
        self.terminal
            .get(state)
            .copied()
            .ok_or_else(|| Error::invalid_index(format!("state {state} out of range")))
    }

    fn outcomes(&self, state: usize, action: usize) -> Result<Vec<Outcome<usize, T>>> {
        let list = self.transitions(state, action).ok_or_else(|| {
            Error::invalid_index(format!(
                "(state {state}, action {action}) outside {} states x {} actions",
                self.num_states(),
                self.num_actions
            ))
        })?;
        Ok(list
            .iter()
            .map(|&(next, probability, reward)| Outcome::new(next, reward, probability))
            .collect())
    }
}
