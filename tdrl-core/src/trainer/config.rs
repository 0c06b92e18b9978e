//! Configuration of [`Trainer`](super::Trainer).
use crate::yaml;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration of [`Trainer`](super::Trainer).
///
/// All intervals are counted in environment steps. An interval of `0` disables
/// the corresponding action.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// The number of environment steps of the training loop.
    pub total_timesteps: usize,

    /// Environment steps before the first optimization step, for filling the
    /// replay buffer.
    pub warmup_period: usize,

    /// Interval of optimization steps.
    pub opt_interval: usize,

    /// Interval of evaluation.
    pub eval_interval: usize,

    /// Interval of saving model parameters.
    pub save_interval: usize,

    /// Interval of flushing records.
    pub flush_record_interval: usize,

    /// Interval of recording computational cost.
    pub record_compute_cost_interval: usize,

    /// Where to save the trained model.
    pub model_dir: Option<String>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            total_timesteps: 0,
            warmup_period: 0,
            opt_interval: 1,
            eval_interval: 0,
            save_interval: 0,
            flush_record_interval: 0,
            record_compute_cost_interval: 0,
            model_dir: None,
        }
    }
}

impl TrainerConfig {
    /// Sets the number of environment steps.
    pub fn total_timesteps(mut self, v: usize) -> Self {
        self.total_timesteps = v;
        self
    }

    /// Sets the warmup period.
    pub fn warmup_period(mut self, warmup_period: usize) -> Self {
        self.warmup_period = warmup_period;
        self
    }

    /// Sets the interval of optimization.
    pub fn opt_interval(mut self, opt_interval: usize) -> Self {
        self.opt_interval = opt_interval;
        self
    }

    /// Sets the interval of evaluation.
    pub fn eval_interval(mut self, v: usize) -> Self {
        self.eval_interval = v;
        self
    }

    /// Sets the interval of saving.
    pub fn save_interval(mut self, save_interval: usize) -> Self {
        self.save_interval = save_interval;
        self
    }

    /// Sets the interval of flushing records.
    pub fn flush_record_interval(mut self, flush_record_interval: usize) -> Self {
        self.flush_record_interval = flush_record_interval;
        self
    }

    /// Sets the interval of recording computational cost.
    pub fn record_compute_cost_interval(mut self, record_compute_cost_interval: usize) -> Self {
        self.record_compute_cost_interval = record_compute_cost_interval;
        self
    }

    /// Sets the directory where the trained model is saved.
    pub fn model_dir(mut self, model_dir: impl Into<String>) -> Self {
        self.model_dir = Some(model_dir.into());
        self
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        yaml::load(path)
    }

    /// Saves [`TrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        yaml::save(self, path)
    }
}
