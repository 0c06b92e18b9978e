use crate::{
    replay_buffer::{BatchBase, GenericTransitionBatch},
    Env, Step, StepProcessor,
};
use anyhow::{anyhow, Result};
use std::{convert::TryFrom, default::Default, marker::PhantomData};

fn convert<T, U>(t: T) -> Result<U>
where
    U: TryFrom<T>,
    U::Error: Into<anyhow::Error>,
{
    U::try_from(t).map_err(Into::into)
}

/// Configuration of [`SimpleStepProcessor`].
#[derive(Clone, Debug, Default)]
pub struct SimpleStepProcessorConfig {}

/// Converts [`Step`]s into transitions `(o_t, a_t, o_t+1, r_t, flags)` for
/// [`SimpleReplayBuffer`](super::SimpleReplayBuffer).
///
/// The processor keeps the previous observation. When an episode ends, the
/// initial observation of the next episode, carried in [`Step::init_obs`],
/// becomes the previous observation, so no transition crosses an episode boundary.
///
/// Observations and actions are converted into `O` and `A` with [`TryFrom`],
/// so conversions into tensors can fail without panicking.
pub struct SimpleStepProcessor<E, O, A> {
    prev_obs: Option<O>,
    phantom: PhantomData<(E, A)>,
}

impl<E, O, A> StepProcessor<E> for SimpleStepProcessor<E, O, A>
where
    E: Env,
    O: BatchBase + TryFrom<E::Obs>,
    A: BatchBase + TryFrom<E::Act>,
    <O as TryFrom<E::Obs>>::Error: Into<anyhow::Error>,
    <A as TryFrom<E::Act>>::Error: Into<anyhow::Error>,
{
    type Config = SimpleStepProcessorConfig;
    type Output = GenericTransitionBatch<O, A>;

    fn build(_config: &Self::Config) -> Self {
        Self {
            prev_obs: None,
            phantom: PhantomData,
        }
    }

    fn reset(&mut self, init_obs: E::Obs) -> Result<()> {
        self.prev_obs = Some(convert(init_obs)?);
        Ok(())
    }

    fn process(&mut self, step: Step<E>) -> Result<Self::Output> {
        let is_done = step.is_done();
        let next_obs = convert(step.obs.clone())?;
        let obs = self
            .prev_obs
            .replace(convert(step.obs)?)
            .ok_or_else(|| anyhow!("prev_obs is not set. Forgot to call reset()?"))?;

        if is_done {
            let init_obs = step
                .init_obs
                .ok_or_else(|| anyhow!("The episode ended without init_obs of the next one"))?;
            self.prev_obs.replace(convert(init_obs)?);
        }

        Ok(GenericTransitionBatch {
            obs,
            act: convert(step.act)?,
            next_obs,
            reward: step.reward,
            is_terminated: step.is_terminated,
            is_truncated: step.is_truncated,
            ix_sample: None,
        })
    }
}
