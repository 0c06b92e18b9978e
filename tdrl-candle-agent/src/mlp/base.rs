use super::{mlp_forward, MlpConfig};
use crate::model::{SubModel1, SubModel2};
use anyhow::{bail, Result};
use candle_core::{Device, Tensor, D};
use candle_nn::{linear, Linear, VarBuilder};

/// Returns vector of linear modules from [`MlpConfig`].
fn create_linear_layers(prefix: &str, vs: VarBuilder, config: &MlpConfig) -> Result<Vec<Linear>> {
    if config.units.is_empty() {
        bail!("MLP needs at least one hidden layer");
    }
    let mut in_out_pairs: Vec<(usize, usize)> = (0..config.units.len() - 1)
        .map(|i| (config.units[i], config.units[i + 1]))
        .collect();
    in_out_pairs.insert(0, (config.in_dim, config.units[0]));
    in_out_pairs.push((config.units[config.units.len() - 1], config.out_dim));
    let vs = vs.pp(prefix);

    in_out_pairs
        .iter()
        .enumerate()
        .map(|(i, &(in_dim, out_dim))| Ok(linear(in_dim, out_dim, vs.pp(format!("ln{}", i)))?))
        .collect()
}

/// Multilayer perceptron with ReLU activation function.
///
/// Inputs of rank more than 2, like stacked frames `[batch, k, h, w]`, are
/// flattened into `[batch, k * h * w]`.
pub struct Mlp {
    config: MlpConfig,
    device: Device,
    layers: Vec<Linear>,
}

impl Mlp {
    fn _build(vs: VarBuilder, config: MlpConfig) -> Result<Self> {
        let device = vs.device().clone();
        let layers = create_linear_layers("mlp", vs, &config)?;

        Ok(Self {
            config,
            device,
            layers,
        })
    }

    fn input(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = xs.to_device(&self.device)?;
        match xs.rank() {
            0 | 1 => Ok(xs.reshape((1, ()))?),
            2 => Ok(xs),
            _ => Ok(xs.flatten_from(1)?),
        }
    }
}

impl SubModel1 for Mlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> Result<Tensor> {
        let xs = self.input(xs)?;
        mlp_forward(xs, &self.layers, &self.config.activation_out)
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Result<Self> {
        Self::_build(vs, config)
    }
}

impl SubModel2 for Mlp {
    type Config = MlpConfig;
    type Input1 = Tensor;
    type Input2 = Tensor;
    type Output = Tensor;

    fn forward(&self, input1: &Self::Input1, input2: &Self::Input2) -> Result<Tensor> {
        let input1 = self.input(input1)?;
        let input2 = self.input(input2)?;
        let input = Tensor::cat(&[input1, input2], D::Minus1)?;
        mlp_forward(input, &self.layers, &self.config.activation_out)
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Result<Self> {
        Self::_build(vs, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Activation;
    use candle_core::DType;
    use candle_nn::VarMap;

    fn build(config: MlpConfig) -> Result<(VarMap, Mlp)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let mlp = <Mlp as SubModel1>::build(vb, config)?;
        Ok((varmap, mlp))
    }

    #[test]
    fn test_output_shape() -> Result<()> {
        let (varmap, mlp) = build(MlpConfig::new(4, vec![8, 8], 2, Activation::None))?;
        assert_eq!(varmap.all_vars().len(), 6);

        let xs = Tensor::zeros((5, 4), DType::F32, &Device::Cpu)?;
        let ys = SubModel1::forward(&mlp, &xs)?;
        assert_eq!(ys.dims(), &[5, 2]);
        Ok(())
    }

    #[test]
    fn test_frames_are_flattened() -> Result<()> {
        let (_, mlp) = build(MlpConfig::new(2 * 3 * 3, vec![8], 3, Activation::None))?;
        let xs = Tensor::zeros((4, 2, 3, 3), DType::F32, &Device::Cpu)?;
        let ys = SubModel1::forward(&mlp, &xs)?;
        assert_eq!(ys.dims(), &[4, 3]);
        Ok(())
    }

    #[test]
    fn test_two_inputs() -> Result<()> {
        let (_, mlp) = build(MlpConfig::new(3 + 1, vec![8], 1, Activation::None))?;
        let obs = Tensor::zeros((6, 3), DType::F32, &Device::Cpu)?;
        let act = Tensor::zeros((6, 1), DType::F32, &Device::Cpu)?;
        let ys = SubModel2::forward(&mlp, &obs, &act)?;
        assert_eq!(ys.dims(), &[6, 1]);
        Ok(())
    }

    #[test]
    fn test_tanh_output_is_bounded() -> Result<()> {
        let (_, mlp) = build(MlpConfig::new(2, vec![4], 3, Activation::Tanh))?;
        let xs = Tensor::new(&[[100f32, -100.0], [1e3, 1e3]], &Device::Cpu)?;
        let ys = SubModel1::forward(&mlp, &xs)?.flatten_all()?.to_vec1::<f32>()?;
        assert!(ys.iter().all(|y| (-1.0..=1.0).contains(y)));
        Ok(())
    }

    #[test]
    fn test_no_hidden_layer_is_an_error() {
        assert!(build(MlpConfig::new(2, vec![], 1, Activation::None)).is_err());
    }
}
