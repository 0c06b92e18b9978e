//! Fixed-capacity transition stores.
//!
//! Two stores are provided:
//!
//! * [`SimpleReplayBuffer`] keeps whole transitions `(o_t, a_t, o_t+1, r_t, flags)`
//!   in a ring buffer with column storage of arbitrary batch types.
//! * [`FrameStackReplayBuffer`] keeps only the newest frame of each observation
//!   and reconstructs stacks of consecutive frames when sampling. It is meant for
//!   pixel observations, where storing both the observation and the next
//!   observation would duplicate every frame several times.
//!
//! Both evict the oldest entry when full and sample uniformly without replacement.
//! Sampling fails with [`TdrlError::InsufficientData`] instead of repeating
//! transitions when too few are held.
//!
//! ```rust
//! use tdrl_core::replay_buffer::SimpleReplayBufferConfig;
//!
//! let config = SimpleReplayBufferConfig::default()
//!     .capacity(10000)
//!     .seed(42);
//! ```
//!
//! [`TdrlError::InsufficientData`]: crate::error::TdrlError::InsufficientData
mod batch;
mod frame_stack;
mod simple_buffer;
pub use batch::{BatchBase, GenericTransitionBatch};
pub use frame_stack::{
    FrameStackReplayBuffer, FrameStackReplayBufferConfig, FrameStackStepProcessor,
    FrameStackStepProcessorConfig, FrameTransition, FromStackedFrames, LatestFrame,
    StackedFrames,
};
pub use simple_buffer::{
    SimpleReplayBuffer, SimpleReplayBufferConfig, SimpleStepProcessor, SimpleStepProcessorConfig,
};

use rand::{rngs::StdRng, seq::index};

/// Draws `size` distinct integers uniformly from `0..n`.
fn sample_without_replacement(rng: &mut StdRng, n: usize, size: usize) -> Vec<usize> {
    index::sample(rng, n, size).into_vec()
}
