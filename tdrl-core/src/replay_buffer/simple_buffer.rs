//! Ring buffer of whole transitions.
mod base;
mod config;
mod step_proc;
pub use base::SimpleReplayBuffer;
pub use config::SimpleReplayBufferConfig;
pub use step_proc::{SimpleStepProcessor, SimpleStepProcessorConfig};
