use crate::yaml;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{default::Default, path::Path};

/// Configuration of [`FrameStackReplayBuffer`](super::FrameStackReplayBuffer).
///
/// # Examples
///
/// ```rust
/// use tdrl_core::replay_buffer::FrameStackReplayBufferConfig;
///
/// let config = FrameStackReplayBufferConfig::default()
///     .capacity(50000)
///     .stack(4)
///     .frame_shape(vec![84, 84]);
/// assert!(config.mask_episode_boundary);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct FrameStackReplayBufferConfig {
    /// Maximum number of frames.
    pub capacity: usize,

    /// Random seed used for sampling.
    pub seed: u64,

    /// The number of frames in an observation.
    pub stack: usize,

    /// Shape of a frame.
    pub frame_shape: Vec<usize>,

    /// If `true`, frames preceding the first frame of an episode are replaced
    /// by that first frame when a stack is reconstructed.
    #[serde(default = "default_mask_episode_boundary")]
    pub mask_episode_boundary: bool,
}

fn default_mask_episode_boundary() -> bool {
    true
}

impl Default for FrameStackReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10000,
            seed: 42,
            stack: 4,
            frame_shape: vec![84, 84],
            mask_episode_boundary: true,
        }
    }
}

impl FrameStackReplayBufferConfig {
    /// Sets the capacity.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the number of stacked frames.
    pub fn stack(mut self, stack: usize) -> Self {
        self.stack = stack;
        self
    }

    /// Sets the shape of a frame.
    pub fn frame_shape(mut self, frame_shape: Vec<usize>) -> Self {
        self.frame_shape = frame_shape;
        self
    }

    /// Enables or disables masking of frames of the previous episode.
    pub fn mask_episode_boundary(mut self, v: bool) -> Self {
        self.mask_episode_boundary = v;
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
