use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Dirichlet, Distribution, Uniform};

use crate::dynamic::envs::TabularMdp;
use crate::error::{Error, Result};

/// Generates a reproducible random MDP.
///
/// Every `(state, action)` pair leads to `branching` distinct successors with
/// Dirichlet(1, ..., 1) probabilities and rewards drawn uniformly from [-1, 1].
pub fn random_tabular_mdp(
    num_states: usize,
    num_actions: usize,
    branching: usize,
    seed: u64,
) -> Result<TabularMdp<f64>> {
    if branching == 0 || branching > num_states {
        return Err(Error::invalid_config(format!(
            "branching factor {branching} must be in 1..={num_states}"
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let rewards = Uniform::new_inclusive(-1.0, 1.0);
    let dirichlet = if branching > 1 {
        Some(
            Dirichlet::new_with_size(1.0, branching)
                .map_err(|e| Error::invalid_config(format!("{e:?}")))?,
        )
    } else {
        None
    };

    let mut transitions = Vec::with_capacity(num_states);
    for _ in 0..num_states {
        let mut per_action = Vec::with_capacity(num_actions);
        for _ in 0..num_actions {
            let successors = index::sample(&mut rng, num_states, branching).into_vec();
            let probabilities = match &dirichlet {
                Some(d) => d.sample(&mut rng),
                None => vec![1.0],
            };
            per_action.push(
                successors
                    .into_iter()
                    .zip(probabilities)
                    .map(|(next, p)| (next, p, rewards.sample(&mut rng)))
                    .collect(),
            );
        }
        transitions.push(per_action);
    }

    TabularMdp::new(num_states, num_actions, transitions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_model() {
        let a = random_tabular_mdp(6, 3, 2, 7).unwrap();
        let b = random_tabular_mdp(6, 3, 2, 7).unwrap();
        for s in 0..6 {
            for action in 0..3 {
                assert_eq!(a.transitions(s, action), b.transitions(s, action));
            }
        }
    }

    #[test]
    fn test_branching_and_rewards() {
        let mdp = random_tabular_mdp(5, 2, 3, 11).unwrap();
        for s in 0..5 {
            for action in 0..2 {
                let list = mdp.transitions(s, action).unwrap();
                assert_eq!(list.len(), 3);
                assert!(list.iter().all(|&(_, _, r)| (-1.0..=1.0).contains(&r)));
            }
        }
    }

    #[test]
    fn test_single_successor() {
        let mdp = random_tabular_mdp(3, 1, 1, 0).unwrap();
        assert_eq!(mdp.transitions(0, 0).unwrap()[0].1, 1.0);
    }

    #[test]
    fn test_bad_branching() {
        assert!(random_tabular_mdp(3, 1, 0, 0).is_err());
        assert!(random_tabular_mdp(3, 1, 4, 0).is_err());
    }
}
