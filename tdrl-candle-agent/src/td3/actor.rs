//! Deterministic actor for continuous actions.
use crate::{model::SubModel1, opt::OptimizerConfig, util::OutDim};
use anyhow::{bail, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;
use tdrl_core::yaml;

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Actor`].
pub struct ActorConfig<P: OutDim> {
    /// Configuration of the policy network. Its output must be in `[-1, 1]`.
    pub policy_config: Option<P>,

    /// Configuration of the optimizer of the actor.
    pub opt_config: OptimizerConfig,
}

impl<P: OutDim> Default for ActorConfig<P> {
    fn default() -> Self {
        Self {
            policy_config: None,
            opt_config: OptimizerConfig::Adam { lr: 0.0003 },
        }
    }
}

impl<P> ActorConfig<P>
where
    P: DeserializeOwned + Serialize + OutDim,
{
    /// Sets configurations for policy function.
    pub fn policy_config(mut self, v: P) -> Self {
        self.policy_config = Some(v);
        self
    }

    /// Sets output dimension of the model.
    pub fn out_dim(mut self, v: usize) -> Self {
        match &mut self.policy_config {
            None => {}
            Some(pi_config) => pi_config.set_out_dim(v),
        };
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Loads [`ActorConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        yaml::load(path)
    }

    /// Saves [`ActorConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        yaml::save(self, path)
    }
}

/// Deterministic policy `scale * policy(obs) + bias`.
///
/// The policy network outputs values in `[-1, 1]` (`tanh`), which are rescaled
/// into the action box `[bias - scale, bias + scale]`.
pub struct Actor<P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
{
    varmap: VarMap,
    policy: P,
    scale: Tensor,
    bias: Tensor,
}

impl<P> Actor<P>
where
    P: SubModel1<Input = Tensor, Output = Tensor>,
    P::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    /// Constructs [`Actor`] acting in the box with the given half width `scale`
    /// and center `bias`.
    pub fn build(
        config: &ActorConfig<P::Config>,
        scale: &[f32],
        bias: &[f32],
        device: &Device,
    ) -> Result<Self> {
        let policy_config = config
            .policy_config
            .clone()
            .context("policy_config is not set.")?;
        let out_dim = policy_config.get_out_dim();
        if scale.len() != out_dim || bias.len() != out_dim {
            bail!(
                "The action dimension {} does not match the output of the actor {}",
                scale.len(),
                out_dim
            );
        }
        let varmap = VarMap::new();
        let policy = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, device).set_prefix("actor");
            P::build(vb, policy_config)?
        };
        let scale = Tensor::from_slice(scale, (out_dim,), device)?;
        let bias = Tensor::from_slice(bias, (out_dim,), device)?;

        Ok(Self {
            varmap,
            policy,
            scale,
            bias,
        })
    }

    /// Returns actions of shape `[batch_size, dim]`.
    pub fn forward(&self, obs: &Tensor) -> Result<Tensor> {
        let a = self.policy.forward(obs)?;
        Ok(a.broadcast_mul(&self.scale)?.broadcast_add(&self.bias)?)
    }

    /// Returns the variables of the actor.
    pub fn get_varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Saves the variables in a safetensors file.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("Save actor to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads the variables from a safetensors file.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(&path)?;
        info!("Load actor from {:?}", path.as_ref());
        Ok(())
    }
}
