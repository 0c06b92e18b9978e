use crate::yaml;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{default::Default, path::Path};

/// Configuration of [`SimpleReplayBuffer`](super::SimpleReplayBuffer).
///
/// # Examples
///
/// ```rust
/// use tdrl_core::replay_buffer::SimpleReplayBufferConfig;
///
/// let config = SimpleReplayBufferConfig::default()
///     .capacity(50000)
///     .seed(0);
/// assert_eq!(config.capacity, 50000);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SimpleReplayBufferConfig {
    /// Maximum number of transitions. When the buffer is full, a new transition
    /// replaces the oldest one.
    pub capacity: usize,

    /// Random seed used for sampling transitions.
    pub seed: u64,
}

impl Default for SimpleReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10000,
            seed: 42,
        }
    }
}

impl SimpleReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        yaml::load(path)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        yaml::save(self, path)
    }
}
