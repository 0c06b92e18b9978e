use super::Evaluator;
use crate::{record::Record, Env, Policy};
use anyhow::Result;

/// Runs a fixed number of episodes and returns the average return as
/// `"eval_return"`.
///
/// The `ix`-th episode starts with [`Env::reset_with_index`], so every evaluation
/// sees the same initial states.
///
/// # Examples
///
/// ```ignore
/// let mut evaluator = DefaultEvaluator::new(CartPole::build(&config, 0)?, 5)?;
/// let record = evaluator.evaluate(&mut agent)?;
/// println!("Average return: {}", record.get_scalar("eval_return")?);
/// ```
pub struct DefaultEvaluator<E: Env> {
    n_episodes: usize,
    env: E,
}

impl<E: Env> Evaluator<E> for DefaultEvaluator<E> {
    fn evaluate<P: Policy<E>>(&mut self, policy: &mut P) -> Result<Record> {
        let mut r_total = 0f32;

        for ix in 0..self.n_episodes {
            let mut prev_obs = self.env.reset_with_index(ix)?;

            loop {
                let act = policy.sample(&prev_obs)?;
                let (step, _) = self.env.step(&act)?;
                r_total += step.reward[0];
                if step.is_done() {
                    break;
                }
                prev_obs = step.obs;
            }
        }

        Ok(Record::from_scalar(
            "eval_return",
            r_total / self.n_episodes as f32,
        ))
    }
}

impl<E: Env> DefaultEvaluator<E> {
    /// Constructs an evaluator running `n_episodes` episodes on `env`.
    pub fn new(env: E, n_episodes: usize) -> Result<Self> {
        if n_episodes == 0 {
            anyhow::bail!("n_episodes must be positive");
        }
        Ok(Self { n_episodes, env })
    }
}
