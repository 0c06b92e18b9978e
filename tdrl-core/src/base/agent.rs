//! Agent.
use super::{Env, Policy, ReplayBufferBase};
use crate::record::Record;
use anyhow::Result;
use std::path::Path;

/// Represents a trainable policy on an environment.
pub trait Agent<E: Env, R: ReplayBufferBase>: Policy<E> {
    /// Set the policy to training mode.
    fn train(&mut self);

    /// Set the policy to evaluation mode.
    fn eval(&mut self);

    /// Return if it is in training mode.
    fn is_train(&self) -> bool;

    /// Selects an action for collecting experiences.
    ///
    /// `env_steps` is the global environment step counter owned by the
    /// [`Trainer`](crate::Trainer). Exploration schedules are evaluated at this
    /// step. The returned record holds values such as the current exploration
    /// rate.
    ///
    /// The default implementation falls back to [`Policy::sample`].
    #[allow(unused_variables)]
    fn explore(&mut self, obs: &E::Obs, env_steps: usize) -> Result<(E::Act, Record)> {
        Ok((self.sample(obs)?, Record::empty()))
    }

    /// Performs an optimization step.
    ///
    /// `buffer` is a replay buffer from which transitions will be taken
    /// for updating model parameters.
    fn opt(&mut self, buffer: &mut R) -> Result<()> {
        self.opt_with_record(buffer).map(|_| ())
    }

    /// Performs an optimization step and returns some information.
    fn opt_with_record(&mut self, buffer: &mut R) -> Result<Record>;

    /// Save the parameters of the agent in the given directory.
    ///
    /// This method commonly creates a number of files consisting the agent
    /// in the directory. For example, the DQN agent in `tdrl_candle_agent` crate
    /// saves two Q-networks corresponding to the live and target networks.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Load the parameters of the agent from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
