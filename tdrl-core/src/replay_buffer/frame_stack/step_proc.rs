use super::{FrameTransition, LatestFrame};
use crate::{replay_buffer::BatchBase, Env, Step, StepProcessor};
use anyhow::{anyhow, Result};
use std::{convert::TryFrom, default::Default, marker::PhantomData};

/// Configuration of [`FrameStackStepProcessor`].
#[derive(Clone, Debug, Default)]
pub struct FrameStackStepProcessorConfig {}

/// Converts [`Step`]s into [`FrameTransition`]s.
///
/// The newest frame of the previous observation is kept and emitted with the
/// action taken in it. At the end of an episode, the newest frame of the
/// initial observation of the next episode is kept instead of the last one.
pub struct FrameStackStepProcessor<E, A> {
    prev_frame: Option<Vec<u8>>,
    phantom: PhantomData<(E, A)>,
}

impl<E, A> StepProcessor<E> for FrameStackStepProcessor<E, A>
where
    E: Env,
    E::Obs: LatestFrame,
    A: BatchBase + TryFrom<E::Act>,
    <A as TryFrom<E::Act>>::Error: Into<anyhow::Error>,
{
    type Config = FrameStackStepProcessorConfig;
    type Output = FrameTransition<A>;

    fn build(_config: &Self::Config) -> Self {
        Self {
            prev_frame: None,
            phantom: PhantomData,
        }
    }

    fn reset(&mut self, init_obs: E::Obs) -> Result<()> {
        self.prev_frame = Some(init_obs.latest_frame());
        Ok(())
    }

    fn process(&mut self, step: Step<E>) -> Result<Self::Output> {
        let is_done = step.is_done();
        let frame = self
            .prev_frame
            .replace(step.obs.latest_frame())
            .ok_or_else(|| anyhow!("prev_frame is not set. Forgot to call reset()?"))?;

        if is_done {
            let init_obs = step
                .init_obs
                .as_ref()
                .ok_or_else(|| anyhow!("The episode ended without init_obs of the next one"))?;
            self.prev_frame.replace(init_obs.latest_frame());
        }

        Ok(FrameTransition {
            frame,
            act: A::try_from(step.act).map_err(Into::into)?,
            reward: step.reward[0],
            is_terminated: step.is_terminated[0],
            is_truncated: step.is_truncated[0],
        })
    }
}
