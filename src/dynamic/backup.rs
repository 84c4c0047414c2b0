//! The Bellman optimality backup for a single state.
//!
//! ```text
//! V'(s) = max_a  w(s, a) * sum_{s'} P(s' | s, a) * [ R(s, a, s') + gamma * V(s') ]
//! ```
//!
//! `w(s, a)` is the environment's action weight, one unless the model carries
//! an action-execution probability on top of its outcome probabilities.

use std::fmt::Debug;

use approx::abs_diff_eq;

use crate::dynamic::oracle::{Environment, Outcome, StateOf};
use crate::dynamic::space::StateSpace;
use crate::dynamic::Real;
use crate::error::{Error, Result};

/// Best value of a state and the first action achieving it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backup<T> {
    pub value: T,
    pub action: usize,
}

/// Computes the backed-up value of `state` from the snapshot `values`.
///
/// Returns `Ok(None)` when `state` is terminal or no action has any outcome;
/// in both cases the state has no decision to make and keeps its value.
///
/// # Examples
///
/// ```
/// use valiter::dynamic::{bellman_backup, TabularMdp};
///
/// // One state, two actions: a sure 1.0 or a coin flip between 10.0 and 0.0.
/// let mdp = TabularMdp::new(
///     1,
///     2,
///     vec![vec![
///         vec![(0, 1.0, 1.0)],
///         vec![(0, 0.5, 10.0), (0, 0.5, 0.0)],
///     ]],
/// )
/// .unwrap();
///
/// let backup = bellman_backup(&mdp, 0, &[0.0], 0.0).unwrap().unwrap();
/// assert_eq!(backup.value, 5.0);
/// assert_eq!(backup.action, 1);
/// ```
pub fn bellman_backup<T, E>(
    env: &E,
    state: StateOf<E, T>,
    values: &[T],
    gamma: T,
) -> Result<Option<Backup<T>>>
where
    T: Real,
    E: Environment<T> + ?Sized,
{
    if env.is_terminal(state)? {
        return Ok(None);
    }
    backup_state(env, state, values, gamma, None)
}

/// Expected return of taking `action` in `state` and then valuing successors
/// with `values`. `Ok(None)` if the action has no outcomes.
pub fn q_value<T, E>(
    env: &E,
    state: StateOf<E, T>,
    action: usize,
    values: &[T],
    gamma: T,
) -> Result<Option<T>>
where
    T: Real,
    E: Environment<T> + ?Sized,
{
    action_value(env, state, action, values, gamma, None)
}

/// Max over actions without the terminal check. `tolerance` turns on
/// validation of every outcome set the environment reports.
pub(crate) fn backup_state<T, E>(
    env: &E,
    state: StateOf<E, T>,
    values: &[T],
    gamma: T,
    tolerance: Option<T>,
) -> Result<Option<Backup<T>>>
where
    T: Real,
    E: Environment<T> + ?Sized,
{
    let mut best: Option<Backup<T>> = None;
    for action in 0..env.num_actions() {
        let Some(value) = action_value(env, state, action, values, gamma, tolerance)? else {
            continue;
        };
        // Strict comparison: the first action reaching the maximum is kept.
        match best {
            Some(current) if value <= current.value => {}
            _ => best = Some(Backup { value, action }),
        }
    }
    Ok(best)
}

fn action_value<T, E>(
    env: &E,
    state: StateOf<E, T>,
    action: usize,
    values: &[T],
    gamma: T,
    tolerance: Option<T>,
) -> Result<Option<T>>
where
    T: Real,
    E: Environment<T> + ?Sized,
{
    let outcomes = env.outcomes(state, action)?;
    let weight = env.action_weight(state, action)?;
    if let Some(tolerance) = tolerance {
        check_outcomes(state, action, &outcomes, weight, tolerance)?;
    }
    if outcomes.is_empty() {
        return Ok(None);
    }
    let expected = expected_return(env.space(), &outcomes, values, gamma)?;
    Ok(Some(weight * expected))
}

fn expected_return<S, T>(
    space: &S,
    outcomes: &[Outcome<S::State, T>],
    values: &[T],
    gamma: T,
) -> Result<T>
where
    S: StateSpace + ?Sized,
    T: Real,
{
    outcomes.iter().try_fold(T::zero(), |acc, outcome| {
        let next = space
            .index_of(outcome.next_state)
            .and_then(|index| values.get(index).copied())
            .ok_or_else(|| {
                Error::invalid_index(format!(
                    "successor {:?} is outside the state space of {} states",
                    outcome.next_state,
                    space.len()
                ))
            })?;
        Ok(acc + outcome.probability * (outcome.reward + gamma * next))
    })
}

/// Checks that `outcomes` form a probability distribution with finite rewards
/// and that `weight` is a probability.
pub(crate) fn check_outcomes<S, T>(
    state: S,
    action: usize,
    outcomes: &[Outcome<S, T>],
    weight: T,
    tolerance: T,
) -> Result<()>
where
    S: Debug + Copy,
    T: Real,
{
    if !weight.is_finite() || weight < T::zero() || weight > T::one() {
        return Err(Error::malformed(
            state,
            action,
            format!("action weight {weight:?} is not a probability"),
        ));
    }
    if outcomes.is_empty() {
        return Ok(());
    }

    let mut total = T::zero();
    for outcome in outcomes {
        if !outcome.probability.is_finite() || outcome.probability < T::zero() {
            return Err(Error::malformed(
                state,
                action,
                format!(
                    "probability {:?} of successor {:?} is negative or not finite",
                    outcome.probability, outcome.next_state
                ),
            ));
        }
        if !outcome.reward.is_finite() {
            return Err(Error::malformed(
                state,
                action,
                format!(
                    "reward {:?} for successor {:?} is not finite",
                    outcome.reward, outcome.next_state
                ),
            ));
        }
        total = total + outcome.probability;
    }
    if !abs_diff_eq!(total, T::one(), epsilon = tolerance) {
        return Err(Error::malformed(
            state,
            action,
            format!("probabilities sum to {total:?}"),
        ));
    }

    log::trace!(
        "validated {} outcomes for state {:?}, action {}",
        outcomes.len(),
        state,
        action
    );
    Ok(())
}
