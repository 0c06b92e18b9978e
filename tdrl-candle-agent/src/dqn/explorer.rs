//! Exploration strategy of DQN.
use anyhow::Result;
use candle_core::{shape::D, DType, Tensor};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tdrl_core::schedule::ExplorationSchedule;

/// Epsilon-greedy explorer for DQN.
///
/// The probability of a random action follows `schedule` over the global
/// environment step. `seed` initializes the random number generator of the agent.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonGreedy {
    /// Epsilon as a function of the environment step.
    pub schedule: ExplorationSchedule,

    /// Random seed of action selection.
    pub seed: u64,
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self {
            schedule: ExplorationSchedule::default(),
            seed: 42,
        }
    }
}

impl EpsilonGreedy {
    /// Constructs epsilon-greedy explorer.
    pub fn new(schedule: ExplorationSchedule, seed: u64) -> Self {
        Self { schedule, seed }
    }

    /// Takes an action based on action values `q` of shape `[batch_size, n_actions]`.
    ///
    /// Returns an `i64` tensor of shape `[batch_size]` and the epsilon at `env_steps`.
    /// With probability epsilon, all actions in the batch are drawn uniformly
    /// from `0..n_actions`. Otherwise they are the `argmax` of `q`.
    pub fn action(&self, q: &Tensor, env_steps: usize, rng: &mut impl Rng) -> Result<(Tensor, f64)> {
        let eps = self.schedule.value_at(env_steps);
        let is_random = rng.gen::<f64>() < eps;

        let act = if is_random {
            let (n_samples, n_actions) = q.dims2()?;
            let act = (0..n_samples)
                .map(|_| rng.gen_range(0..n_actions) as i64)
                .collect::<Vec<_>>();
            Tensor::from_vec(act, (n_samples,), q.device())?
        } else {
            greedy(q)?
        };

        Ok((act, eps))
    }
}

/// Returns the `argmax` of action values as an `i64` tensor of shape `[batch_size]`.
pub(super) fn greedy(q: &Tensor) -> Result<Tensor> {
    Ok(q.argmax(D::Minus1)?.to_dtype(DType::I64)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use rand::{rngs::StdRng, SeedableRng};

    fn q() -> Result<Tensor> {
        Ok(Tensor::new(&[[0f32, 1.0, 5.0, 2.0]], &Device::Cpu)?)
    }

    #[test]
    fn test_greedy_at_zero_epsilon() -> Result<()> {
        let explorer = EpsilonGreedy::new(ExplorationSchedule::Constant(0.0), 0);
        let mut rng = StdRng::seed_from_u64(0);
        for step in 0..100 {
            let (a, eps) = explorer.action(&q()?, step, &mut rng)?;
            assert_eq!(a.to_vec1::<i64>()?, vec![2]);
            assert_eq!(eps, 0.0);
        }
        Ok(())
    }

    #[test]
    fn test_uniform_at_epsilon_one() -> Result<()> {
        let explorer = EpsilonGreedy::new(ExplorationSchedule::Constant(1.0), 0);
        let mut rng = StdRng::seed_from_u64(0);
        let mut counts = [0usize; 4];
        for step in 0..4000 {
            let (a, _) = explorer.action(&q()?, step, &mut rng)?;
            counts[a.to_vec1::<i64>()?[0] as usize] += 1;
        }
        assert!(counts.iter().all(|&c| c > 800 && c < 1200), "{:?}", counts);
        Ok(())
    }

    #[test]
    fn test_epsilon_follows_schedule() -> Result<()> {
        let schedule = ExplorationSchedule::Exponential {
            eps_start: 1.0,
            eps_end: 0.05,
            decay: 100.0,
        };
        let explorer = EpsilonGreedy::new(schedule.clone(), 0);
        let mut rng = StdRng::seed_from_u64(0);
        for step in [0, 50, 100, 1000].iter() {
            let (_, eps) = explorer.action(&q()?, *step, &mut rng)?;
            assert_eq!(eps, schedule.value_at(*step));
        }
        Ok(())
    }
}
