//! Utilities.
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::loss::mse;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use tdrl_core::error::TdrlError;

/// Critic loss type.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum CriticLoss {
    /// Mean squared error.
    Mse,

    /// Smooth L1 loss.
    SmoothL1,
}

impl Default for CriticLoss {
    fn default() -> Self {
        Self::Mse
    }
}

impl CriticLoss {
    /// Computes the loss between predictions and (detached) targets.
    pub fn loss(&self, pred: &Tensor, tgt: &Tensor) -> Result<Tensor> {
        match self {
            Self::Mse => Ok(mse(pred, tgt)?),
            Self::SmoothL1 => Ok(smooth_l1_loss(pred, tgt)?),
        }
    }
}

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> usize;

    /// Sets the  output dimension.
    fn set_out_dim(&mut self, v: usize);
}

/// See <https://pytorch.org/docs/stable/generated/torch.nn.SmoothL1Loss.html>.
pub fn smooth_l1_loss(x: &Tensor, y: &Tensor) -> Result<Tensor, candle_core::Error> {
    let device = x.device();
    let d = (x - y)?.abs()?;
    let m1 = d.lt(1.0)?.to_dtype(DType::F32)?.to_device(device)?;
    let m2 = Tensor::try_from(1f32)?
        .to_device(device)?
        .broadcast_sub(&m1)?;
    (((0.5 * m1)? * d.powf(2.0))? + m2 * (d - 0.5))?.mean_all()
}

/// Returns the scalar value of a loss, or [`TdrlError::NonFiniteLoss`] if it is
/// NaN or infinite.
pub fn finite_loss(name: &str, loss: &Tensor) -> Result<f32> {
    let value = loss.to_dtype(DType::F32)?.to_scalar::<f32>()?;
    Ok(TdrlError::check_finite(name, value)?)
}

/// Converts rewards of a batch into a tensor of shape `[batch_size]`.
pub fn reward(reward: &[f32], device: &Device) -> Result<Tensor> {
    Ok(Tensor::from_slice(reward, (reward.len(),), device)?)
}

/// Converts episode end flags of a batch into a `u8` mask of shape `[batch_size]`.
///
/// A transition ends an episode if it is terminated or truncated.
pub fn is_done(is_terminated: &[i8], is_truncated: &[i8], device: &Device) -> Result<Tensor> {
    let done = is_terminated
        .iter()
        .zip(is_truncated.iter())
        .map(|(e1, e2)| (*e1 | *e2) as u8)
        .collect::<Vec<_>>();
    Ok(Tensor::from_slice(&done[..], (done.len(),), device)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_l1_loss() -> Result<()> {
        let x = Tensor::new(&[0f32, 0.0], &Device::Cpu)?;
        let y = Tensor::new(&[0.5f32, 3.0], &Device::Cpu)?;
        let loss = smooth_l1_loss(&x, &y)?.to_scalar::<f32>()?;

        // (0.5 * 0.25 + (3.0 - 0.5)) / 2
        assert!((loss - 1.3125).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_finite_loss() -> Result<()> {
        let loss = Tensor::new(1.5f32, &Device::Cpu)?;
        assert_eq!(finite_loss("loss_critic", &loss)?, 1.5);

        let loss = Tensor::new(f32::NAN, &Device::Cpu)?;
        let err = finite_loss("loss_critic", &loss).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TdrlError>(),
            Some(TdrlError::NonFiniteLoss { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_is_done() -> Result<()> {
        let done = is_done(&[0, 1, 0, 1], &[0, 0, 1, 1], &Device::Cpu)?;
        assert_eq!(done.to_vec1::<u8>()?, vec![0, 1, 1, 1]);
        Ok(())
    }
}
