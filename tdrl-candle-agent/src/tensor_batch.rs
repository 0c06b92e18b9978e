use anyhow::{anyhow, Result};
use candle_core::{DType, Device, IndexOp, Tensor};
use std::convert::TryFrom;
use tdrl_core::replay_buffer::{BatchBase, FromStackedFrames, StackedFrames};

/// A column of a replay buffer consisting of a [`Tensor`].
///
/// The first dimension is the batch dimension. The internal tensor is allocated
/// on the first push with the shape `[capacity, data.dims()[1..]]` and always
/// lives on the CPU.
#[derive(Clone, Debug)]
pub struct TensorBatch {
    buf: Option<Tensor>,
    capacity: usize,
}

impl TensorBatch {
    /// Wraps a tensor, the first dimension of which is the batch dimension.
    pub fn from_tensor(t: Tensor) -> Self {
        let capacity = t.dims().first().copied().unwrap_or(0);
        Self {
            buf: Some(t),
            capacity,
        }
    }

    /// Returns the internal tensor, if allocated.
    pub fn tensor(&self) -> Option<&Tensor> {
        self.buf.as_ref()
    }
}

impl BatchBase for TensorBatch {
    fn new(capacity: usize) -> Self {
        Self {
            buf: None,
            capacity,
        }
    }

    /// Pushes given data.
    ///
    /// Rows exceeding the capacity wrap around to the head.
    fn push(&mut self, index: usize, data: Self) -> Result<()> {
        let data = match data.buf {
            None => return Ok(()),
            Some(data) => data.to_device(&Device::Cpu)?,
        };

        let batch_size = data.dims()[0];
        if batch_size == 0 {
            return Ok(());
        }

        let buf = match self.buf.take() {
            Some(buf) => buf,
            None => {
                let mut shape = data.dims().to_vec();
                shape[0] = self.capacity;
                Tensor::zeros(shape, data.dtype(), &Device::Cpu)?
            }
        };

        if index + batch_size > self.capacity {
            let batch_size = self.capacity - index;
            let data1 = data.i((..batch_size,))?;
            let data2 = data.i((batch_size..,))?;
            buf.slice_set(&data1, 0, index)?;
            buf.slice_set(&data2, 0, 0)?;
        } else {
            buf.slice_set(&data, 0, index)?;
        }
        self.buf = Some(buf);

        Ok(())
    }

    fn sample(&self, ixs: &[usize]) -> Result<Self> {
        let buf = self
            .buf
            .as_ref()
            .ok_or_else(|| anyhow!("Sampling from an empty TensorBatch"))?;
        let capacity = ixs.len();
        let ixs = {
            let ixs = ixs.iter().map(|x| *x as u32).collect::<Vec<_>>();
            Tensor::from_vec(ixs, (capacity,), buf.device())?
        };
        let buf = Some(buf.index_select(&ixs, 0)?);
        Ok(Self { buf, capacity })
    }
}

/// Pixel values are scaled into `[0, 1]`, the shape is `[batch_size, stack, frame_shape..]`.
impl FromStackedFrames for TensorBatch {
    fn from_stacked_frames(frames: StackedFrames) -> Result<Self> {
        let mut shape = vec![frames.batch_size, frames.stack];
        shape.extend(frames.frame_shape.iter());
        let t = Tensor::from_vec(frames.data, shape, &Device::Cpu)?;
        let t = (t.to_dtype(DType::F32)? / 255.0)?;
        Ok(Self::from_tensor(t))
    }
}

impl TryFrom<TensorBatch> for Tensor {
    type Error = anyhow::Error;

    fn try_from(b: TensorBatch) -> Result<Self> {
        b.buf.ok_or_else(|| anyhow!("TensorBatch holds no data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(v: f32) -> Result<TensorBatch> {
        Ok(TensorBatch::from_tensor(Tensor::new(&[[v, -v]], &Device::Cpu)?))
    }

    #[test]
    fn test_push_and_sample() -> Result<()> {
        let mut b = TensorBatch::new(3);
        for (i, v) in [1f32, 2.0, 3.0, 4.0].iter().enumerate() {
            b.push(i % 3, row(*v)?)?;
        }
        let s: Tensor = Tensor::try_from(b.sample(&[0, 2])?)?;
        assert_eq!(s.to_vec2::<f32>()?, vec![vec![4.0, -4.0], vec![3.0, -3.0]]);
        Ok(())
    }

    #[test]
    fn test_push_wraps_around() -> Result<()> {
        let mut b = TensorBatch::new(3);
        let data = Tensor::new(&[[1f32], [2.0]], &Device::Cpu)?;
        b.push(2, TensorBatch::from_tensor(data))?;
        let s = Tensor::try_from(b.sample(&[0, 2])?)?;
        assert_eq!(s.to_vec2::<f32>()?, vec![vec![2.0], vec![1.0]]);
        Ok(())
    }

    #[test]
    fn test_empty() {
        let b = TensorBatch::new(3);
        assert!(b.sample(&[0]).is_err());
        assert!(Tensor::try_from(b).is_err());
    }

    #[test]
    fn test_from_stacked_frames() -> Result<()> {
        let frames = StackedFrames {
            data: vec![0, 255, 51, 102, 0, 0, 255, 255],
            batch_size: 2,
            stack: 2,
            frame_shape: vec![1, 2],
        };
        let t = Tensor::try_from(TensorBatch::from_stacked_frames(frames)?)?;
        assert_eq!(t.dims(), &[2, 2, 1, 2]);
        let v = t.flatten_all()?.to_vec1::<f32>()?;
        assert_eq!(v[1], 1.0);
        assert!((v[2] - 0.2).abs() < 1e-6);
        Ok(())
    }
}
