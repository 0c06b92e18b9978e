//! Conversions between observations, actions and candle tensors.
use crate::{ContinuousAct, DiscreteAct, FrameObs, VecObs};
use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use std::convert::TryFrom;
use tdrl_candle_agent::TensorBatch;

/// Shape `[1, dim]`.
impl TryFrom<VecObs> for Tensor {
    type Error = anyhow::Error;

    fn try_from(obs: VecObs) -> Result<Self> {
        let dim = obs.0.len();
        Ok(Tensor::from_vec(obs.0, (1, dim), &Device::Cpu)?)
    }
}

impl TryFrom<VecObs> for TensorBatch {
    type Error = anyhow::Error;

    fn try_from(obs: VecObs) -> Result<Self> {
        Ok(TensorBatch::from_tensor(Tensor::try_from(obs)?))
    }
}

/// Shape `[1, stack, height, width]`, pixel values scaled into `[0, 1]`.
impl TryFrom<FrameObs> for Tensor {
    type Error = anyhow::Error;

    fn try_from(obs: FrameObs) -> Result<Self> {
        let shape = (1, obs.stack, obs.height, obs.width);
        let t = Tensor::from_vec(obs.frames, shape, &Device::Cpu)?;
        Ok((t.to_dtype(DType::F32)? / 255.0)?)
    }
}

/// Takes the first element of the tensor as an action index.
impl TryFrom<Tensor> for DiscreteAct {
    type Error = anyhow::Error;

    fn try_from(t: Tensor) -> Result<Self> {
        let a = t.to_dtype(DType::I64)?.flatten_all()?.to_vec1::<i64>()?;
        match a.first() {
            Some(a) if *a >= 0 => Ok(Self(*a as usize)),
            Some(a) => Err(anyhow!("Negative action index {}", a)),
            None => Err(anyhow!("Empty tensor given as an action")),
        }
    }
}

/// Shape `[1, 1]` of `i64`.
impl TryFrom<DiscreteAct> for TensorBatch {
    type Error = anyhow::Error;

    fn try_from(act: DiscreteAct) -> Result<Self> {
        let t = Tensor::from_vec(vec![act.0 as i64], (1, 1), &Device::Cpu)?;
        Ok(TensorBatch::from_tensor(t))
    }
}

impl TryFrom<Tensor> for ContinuousAct {
    type Error = anyhow::Error;

    fn try_from(t: Tensor) -> Result<Self> {
        let a = t.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
        Ok(Self(a))
    }
}

/// Shape `[1, dim]`.
impl TryFrom<ContinuousAct> for TensorBatch {
    type Error = anyhow::Error;

    fn try_from(act: ContinuousAct) -> Result<Self> {
        let dim = act.0.len();
        let t = Tensor::from_vec(act.0, (1, dim), &Device::Cpu)?;
        Ok(TensorBatch::from_tensor(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obs_to_tensor() -> Result<()> {
        let t = Tensor::try_from(VecObs(vec![1.0, 2.0, 3.0]))?;
        assert_eq!(t.dims(), &[1, 3]);

        let obs = FrameObs::repeat(&[0, 255, 51, 0], 2, 2, 2);
        let t = Tensor::try_from(obs)?;
        assert_eq!(t.dims(), &[1, 2, 2, 2]);
        let v = t.flatten_all()?.to_vec1::<f32>()?;
        for (x, y) in v.iter().zip([0.0, 1.0, 0.2, 0.0].iter()) {
            assert!((x - y).abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_tensor_to_act() -> Result<()> {
        let a = DiscreteAct::try_from(Tensor::new(&[2i64], &Device::Cpu)?)?;
        assert_eq!(a, DiscreteAct(2));
        assert!(DiscreteAct::try_from(Tensor::new(&[-1i64], &Device::Cpu)?).is_err());

        let a = ContinuousAct::try_from(Tensor::new(&[[0.5f32, -1.0]], &Device::Cpu)?)?;
        assert_eq!(a, ContinuousAct(vec![0.5, -1.0]));
        Ok(())
    }

    #[test]
    fn test_act_to_tensor_batch() -> Result<()> {
        let t = Tensor::try_from(TensorBatch::try_from(DiscreteAct(1))?)?;
        assert_eq!(t.to_vec2::<i64>()?, vec![vec![1]]);
        let t = Tensor::try_from(TensorBatch::try_from(ContinuousAct(vec![0.1, 0.2]))?)?;
        assert_eq!(t.dims(), &[1, 2]);
        Ok(())
    }
}
