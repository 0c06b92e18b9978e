//! Environments implemented in Rust.
//!
//! * [`CartPole`] - two discrete actions, 4-dimensional observation, truncated after 500 steps.
//! * [`Pendulum`] - torque in `[-2, 2]`, 3-dimensional observation, truncated after 200 steps.
//! * [`Catch`] - three discrete actions, stacked pixel frames.
//!
//! Every environment declares its [`ActionSpace`](tdrl_core::ActionSpace) and
//! rejects actions outside of it with
//! [`TdrlError::InvalidAction`](tdrl_core::error::TdrlError::InvalidAction).
//!
//! With the `candle` feature, observations are converted into tensors of shape
//! `[1, ..]` and tensors into actions, so the environments can be used with the
//! agents of `tdrl-candle-agent`.
mod act;
#[cfg(feature = "candle")]
mod candle;
mod cartpole;
mod catch;
mod obs;
mod pendulum;
pub use act::{ContinuousAct, DiscreteAct};
pub use cartpole::{CartPole, CartPoleConfig};
pub use catch::{Catch, CatchConfig};
pub use obs::{FrameObs, VecObs};
pub use pendulum::{Pendulum, PendulumConfig};
