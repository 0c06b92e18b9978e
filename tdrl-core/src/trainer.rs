//! Train [`Agent`].
mod config;
mod sampler;
use crate::{
    record::{AggregateRecorder, Record, RecordValue::Scalar},
    Agent, Env, Evaluator, ExperienceBufferBase, ReplayBufferBase, StepProcessor,
};
use anyhow::Result;
pub use config::TrainerConfig;
use log::{debug, info};
pub use sampler::Sampler;
use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

/// Phase of the training loop at an environment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Filling the replay buffer, no optimization steps.
    Warmup,

    /// Optimization steps are interleaved with environment steps.
    Training,
}

#[inline]
fn is_multiple(n: usize, interval: usize) -> bool {
    interval > 0 && n % interval == 0
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the training loop.
///
/// # Training loop
///
/// The loop runs over the global environment step `g = 0..total_timesteps`:
///
/// 1. [`Sampler`] asks the agent for an action with [`Agent::explore`] at step `g`,
///    applies it to the environment, and pushes the transition into the
///    replay buffer. The environment is reset at the end of an episode.
/// 2. While `g < warmup_period` the loop is in [`Phase::Warmup`] and no
///    optimization step is done. After that it is in [`Phase::Training`] and an
///    optimization step is done when `g % opt_interval == 0`.
/// 3. With `n = g + 1` environment steps done:
///     * if `n % record_compute_cost_interval == 0`, `"env_steps_per_sec"` and
///       `"opt_steps_per_sec"` are recorded,
///     * if `n % eval_interval == 0`, the agent is evaluated in evaluation mode
///       and `"eval_return"` is recorded. On the best return so far, the
///       parameters are saved in `(model_dir)/best`,
///     * if `n % save_interval == 0`, the parameters are saved in `(model_dir)/(n)`,
///     * if `n % flush_record_interval == 0`, the records are flushed with step `n`.
///
/// Any error, from the environment, the replay buffer or the agent, ends the
/// loop and is returned.
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     A[Agent]-->|Env::Act|B[Env]
///     B -->|Env::Obs|A
///     B -->|"Step&lt;E: Env&gt;"|C[StepProcessor]
///     C -->|ExperienceBufferBase::Item|D[ReplayBufferBase]
///     D -->|ReplayBufferBase::Batch|A
/// ```
pub struct Trainer {
    config: TrainerConfig,

    /// Optimization steps for computing optimization steps per second.
    opt_steps_for_ops: usize,

    /// Timer for computing optimization steps per second.
    timer_for_ops: Duration,
}

impl Trainer {
    /// Constructs a trainer.
    pub fn build(config: TrainerConfig) -> Self {
        Self {
            config,
            opt_steps_for_ops: 0,
            timer_for_ops: Duration::new(0, 0),
        }
    }

    /// Returns the phase at the given environment step.
    pub fn phase(&self, env_steps: usize) -> Phase {
        match env_steps < self.config.warmup_period {
            true => Phase::Warmup,
            false => Phase::Training,
        }
    }

    /// Returns if an optimization step is done at the given environment step.
    pub fn is_opt_step(&self, env_steps: usize) -> bool {
        self.phase(env_steps) == Phase::Training && is_multiple(env_steps, self.config.opt_interval)
    }

    fn save_model<E, A, R>(agent: &A, path: PathBuf) -> Result<()>
    where
        E: Env,
        A: Agent<E, R>,
        R: ReplayBufferBase,
    {
        std::fs::create_dir_all(&path)?;
        agent.save_params(&path)?;
        info!("Saved the model in {:?}", &path);
        Ok(())
    }

    /// Returns optimization steps per second, then reset the internal counter.
    fn opt_steps_per_sec(&mut self) -> f32 {
        let secs = self.timer_for_ops.as_secs_f32();
        let osps = match secs > 0.0 {
            true => self.opt_steps_for_ops as f32 / secs,
            false => 0.0,
        };
        self.opt_steps_for_ops = 0;
        self.timer_for_ops = Duration::new(0, 0);
        osps
    }

    /// Performs a training step.
    ///
    /// It performes an environment step with [`Sampler`] and then, in the
    /// training phase, an optimization step if `env_steps` is a multiple of
    /// `opt_interval`.
    ///
    /// The second return value is `true` if an optimization step is done.
    pub fn train_step<E, P, R, A>(
        &mut self,
        agent: &mut A,
        buffer: &mut R,
        sampler: &mut Sampler<E, P>,
        env_steps: usize,
    ) -> Result<(Record, bool)>
    where
        E: Env,
        P: StepProcessor<E>,
        R: ExperienceBufferBase<Item = P::Output> + ReplayBufferBase,
        A: Agent<E, R>,
    {
        let record = sampler.sample_and_push(agent, buffer, env_steps)?;

        if !self.is_opt_step(env_steps) {
            return Ok((record, false));
        }

        let timer = SystemTime::now();
        let record_agent = agent.opt_with_record(buffer)?;
        self.timer_for_ops += timer.elapsed()?;
        self.opt_steps_for_ops += 1;

        Ok((record.merge(record_agent), true))
    }

    /// Train the agent.
    ///
    /// The trainer takes the environment and the step processor, and borrows the
    /// agent and the replay buffer, which can be inspected after training.
    pub fn train<E, P, R, A, D>(
        &mut self,
        env: E,
        step_proc: P,
        agent: &mut A,
        buffer: &mut R,
        recorder: &mut Box<dyn AggregateRecorder>,
        evaluator: &mut D,
    ) -> Result<()>
    where
        E: Env,
        P: StepProcessor<E>,
        R: ExperienceBufferBase<Item = P::Output> + ReplayBufferBase,
        A: Agent<E, R>,
        D: Evaluator<E>,
    {
        let mut sampler = Sampler::new(env, step_proc);
        let mut max_eval_return = f32::MIN;
        let mut opt_steps: usize = 0;
        sampler.reset_fps_counter();
        agent.train();

        for env_steps in 0..self.config.total_timesteps {
            if env_steps == self.config.warmup_period {
                info!("Warmup finished at environment step {}", env_steps);
            }

            let (mut record, is_opt) = self.train_step(agent, buffer, &mut sampler, env_steps)?;
            if is_opt {
                opt_steps += 1;
            }
            let n = env_steps + 1;

            if is_multiple(n, self.config.record_compute_cost_interval) {
                record.insert("env_steps_per_sec", Scalar(sampler.fps()));
                record.insert("opt_steps_per_sec", Scalar(self.opt_steps_per_sec()));
            }

            if is_multiple(n, self.config.eval_interval) {
                agent.eval();
                let record_eval = evaluator.evaluate(agent)?;
                agent.train();

                let eval_return = record_eval.get_scalar("eval_return")?;
                info!(
                    "Evaluation at {} environment steps ({} optimization steps): {}",
                    n, opt_steps, eval_return
                );
                record.merge_inplace(record_eval);

                if eval_return > max_eval_return {
                    max_eval_return = eval_return;
                    if let Some(model_dir) = &self.config.model_dir {
                        Self::save_model::<E, A, R>(agent, Path::new(model_dir).join("best"))?;
                    }
                }
            }

            if is_multiple(n, self.config.save_interval) {
                if let Some(model_dir) = &self.config.model_dir {
                    Self::save_model::<E, A, R>(agent, Path::new(model_dir).join(n.to_string()))?;
                }
            }

            if !record.is_empty() {
                recorder.store(record);
            }

            if is_multiple(n, self.config.flush_record_interval) {
                debug!("Flush records at {} environment steps", n);
                recorder.flush(n as i64);
            }
        }

        Ok(())
    }
}
