//! Environment.
use super::{Act, Info, Obs, Step};
use crate::{record::Record, ActionSpace};
use anyhow::Result;

/// Represents an environment, typically an MDP.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Returns the space of valid actions.
    ///
    /// [`Env::step`] fails with [`TdrlError::InvalidAction`] for actions outside of it.
    ///
    /// [`TdrlError::InvalidAction`]: crate::error::TdrlError::InvalidAction
    fn action_space(&self) -> ActionSpace;

    /// Resets the environment and returns the initial observation.
    ///
    /// If `seed` is given, the random number generator of the environment is
    /// reseeded before the reset.
    fn reset(&mut self, seed: Option<u64>) -> Result<Self::Obs>;

    /// Performes an environment step.
    ///
    /// `init_obs` of the returned [`Step`] is always `None`.
    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized;

    /// Performes an environment step and resets the environment if the episode ends.
    ///
    /// The initial observation of the next episode is stored in `init_obs` of
    /// the returned [`Step`].
    fn step_with_reset(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized,
    {
        let (mut step, record) = self.step(a)?;
        if step.is_done() {
            step.init_obs = Some(self.reset(None)?);
        }
        Ok((step, record))
    }

    /// Resets the environment with a given index.
    ///
    /// The index is used as a random seed, so that evaluation runs in
    /// [`DefaultEvaluator`](crate::DefaultEvaluator) start from the same states.
    fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs> {
        self.reset(Some(ix as u64))
    }
}
