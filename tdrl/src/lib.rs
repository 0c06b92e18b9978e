//! Temporal-difference reinforcement learning in Rust.
//!
//! tdrl consists of the following crates:
//!
//! * [tdrl-core](tdrl_core) provides traits connecting environments, agents and
//!   replay buffers, transition stores, exploration schedules, records, the
//!   training loop and evaluation. It is independent of any tensor backend.
//! * [tdrl-candle-agent](tdrl_candle_agent) includes DQN and TD3 agents based on
//!   [candle](https://crates.io/crates/candle-core).
//! * [tdrl-envs](tdrl_envs) has CartPole, Pendulum and Catch environments.
//! * [tdrl-tensorboard](tdrl_tensorboard) has `TensorboardRecorder` to write
//!   records shown in TensorBoard.
//!
//! The training programs are in the `examples` directory of this crate.
pub use tdrl_candle_agent;
pub use tdrl_core;
pub use tdrl_envs;
pub use tdrl_tensorboard;

pub mod util;
