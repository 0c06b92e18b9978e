//! Replay buffer reconstructing stacks of frames from adjacent slots.
//!
//! Each slot keeps the newest frame of the observation an action was taken in.
//! The observation at slot `i` is the stack of frames `i-k+1..=i`, and the next
//! observation is the stack `i-k+2..=i+1`, so every frame is stored only once.
mod base;
mod config;
mod frames;
mod step_proc;
pub use base::FrameStackReplayBuffer;
pub use config::FrameStackReplayBufferConfig;
pub use frames::{FrameTransition, FromStackedFrames, LatestFrame, StackedFrames};
pub use step_proc::{FrameStackStepProcessor, FrameStackStepProcessorConfig};
