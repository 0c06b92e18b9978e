//! Samples experiences and pushes them into a replay buffer.
use crate::{
    record::{Record, RecordValue::Scalar},
    Agent, Env, ExperienceBufferBase, ReplayBufferBase, StepProcessor,
};
use anyhow::{anyhow, Result};
use std::time::SystemTime;

/// Runs environment steps with an agent and pushes the resulting transitions
/// into a replay buffer.
///
/// The environment is reset on the first call and at the end of every episode.
/// The step processor is reset only on the first call, afterwards it takes the
/// initial observation of the next episode from the last step of an episode.
/// The sampler also keeps the return and the length of the running episode and
/// counts environment steps per second.
pub struct Sampler<E, P>
where
    E: Env,
    P: StepProcessor<E>,
{
    env: E,
    prev_obs: Option<E::Obs>,
    step_processor: P,
    episode_return: f32,
    episode_length: usize,
    n_env_steps_for_fps: usize,
    timer_for_fps: SystemTime,
}

impl<E, P> Sampler<E, P>
where
    E: Env,
    P: StepProcessor<E>,
{
    /// Creates a sampler.
    pub fn new(env: E, step_processor: P) -> Self {
        Self {
            env,
            prev_obs: None,
            step_processor,
            episode_return: 0.0,
            episode_length: 0,
            n_env_steps_for_fps: 0,
            timer_for_fps: SystemTime::now(),
        }
    }

    /// Returns environment steps per second since the last call and resets the counter.
    pub fn fps(&mut self) -> f32 {
        let secs = match self.timer_for_fps.elapsed() {
            Ok(d) => d.as_secs_f32(),
            Err(_) => 0.0,
        };
        let fps = if secs > 0.0 {
            self.n_env_steps_for_fps as f32 / secs
        } else {
            0.0
        };
        self.reset_fps_counter();
        fps
    }

    /// Resets the counter of environment steps per second.
    pub fn reset_fps_counter(&mut self) {
        self.n_env_steps_for_fps = 0;
        self.timer_for_fps = SystemTime::now();
    }

    /// Performs an environment step and pushes the transition into `buffer`.
    ///
    /// `env_steps` is the global environment step, given to [`Agent::explore`].
    /// The returned record merges the records of the agent and the environment,
    /// with `episode_return` and `episode_length` at the end of an episode.
    pub fn sample_and_push<A, R>(
        &mut self,
        agent: &mut A,
        buffer: &mut R,
        env_steps: usize,
    ) -> Result<Record>
    where
        A: Agent<E, R>,
        R: ExperienceBufferBase<Item = P::Output> + ReplayBufferBase,
    {
        let prev_obs = match self.prev_obs.take() {
            Some(obs) => obs,
            None => {
                let obs = self.env.reset(None)?;
                self.step_processor.reset(obs.clone())?;
                obs
            }
        };

        let (act, record_agent) = agent.explore(&prev_obs, env_steps)?;
        let (step, record_env) = self.env.step_with_reset(&act)?;
        let is_done = step.is_done();
        self.episode_return += step.reward[0];
        self.episode_length += 1;
        self.n_env_steps_for_fps += 1;

        let next_obs = match is_done {
            true => step
                .init_obs
                .clone()
                .ok_or_else(|| anyhow!("The episode ended without init_obs of the next one"))?,
            false => step.obs.clone(),
        };

        let transition = self.step_processor.process(step)?;
        buffer.push(transition)?;

        let mut record = record_agent.merge(record_env);
        if is_done {
            record.insert("episode_return", Scalar(self.episode_return));
            record.insert("episode_length", Scalar(self.episode_length as f32));
            self.episode_return = 0.0;
            self.episode_length = 0;
        }
        self.prev_obs = Some(next_obs);

        Ok(record)
    }
}
