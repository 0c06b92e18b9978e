#![warn(missing_docs)]
//! Core components for temporal-difference reinforcement learning.
//!
//! This crate is independent of any tensor backend. It provides
//!
//! * traits connecting environments, agents and replay buffers ([`Env`], [`Agent`],
//!   [`ReplayBufferBase`], [`ExperienceBufferBase`], [`StepProcessor`]),
//! * fixed-capacity transition stores ([`replay_buffer`]),
//! * exploration schedules driven by the global environment step ([`schedule`]),
//! * records and recorders for metrics ([`record`]),
//! * the training loop ([`Trainer`]) and evaluation ([`Evaluator`]).
pub mod error;
pub mod record;
pub mod replay_buffer;
pub mod schedule;
pub mod yaml;

mod base;
pub use base::{
    Act, Agent, Configurable, Env, ExperienceBufferBase, Info, Obs, Policy, ReplayBufferBase,
    Step, StepProcessor, TransitionBatch,
};

mod space;
pub use space::ActionSpace;

mod evaluator;
pub use evaluator::{DefaultEvaluator, Evaluator};

mod trainer;
pub use trainer::{Phase, Sampler, Trainer, TrainerConfig};
