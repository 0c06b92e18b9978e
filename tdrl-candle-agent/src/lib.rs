//! RL agents implemented with [candle](https://crates.io/crates/candle-core).
//!
//! * [`dqn`] - DQN with double-Q targets and epsilon-greedy exploration.
//! * [`td3`] - TD3 with twin critics, target policy smoothing and delayed policy updates.
//!
//! Both agents share target computation ([`target`]), synchronization of target
//! networks ([`sync`]), optimizers ([`opt`]) and multilayer perceptrons ([`mlp`]).
pub mod dqn;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod sync;
pub mod target;
pub mod td3;
mod tensor_batch;
pub mod util;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
pub use tensor_batch::TensorBatch;

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The main GPU device.
    Cuda(usize),
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}

impl TryFrom<Device> for candle_core::Device {
    type Error = anyhow::Error;

    fn try_from(device: Device) -> Result<Self> {
        match device {
            Device::Cpu => Ok(candle_core::Device::Cpu),
            Device::Cuda(n) => Ok(candle_core::Device::new_cuda(n)?),
        }
    }
}

/// Activation functions.
#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
pub enum Activation {
    /// No activation.
    None,

    /// ReLU.
    ReLU,

    /// Hyperbolic tangent.
    Tanh,
}

impl Default for Activation {
    fn default() -> Self {
        Self::None
    }
}

impl Activation {
    /// Applies the activation function.
    pub fn forward(&self, xs: &candle_core::Tensor) -> Result<candle_core::Tensor> {
        match self {
            Self::None => Ok(xs.clone()),
            Self::ReLU => Ok(xs.relu()?),
            Self::Tanh => Ok(xs.tanh()?),
        }
    }
}
