//! Configuration of DQN agent.
use super::{explorer::EpsilonGreedy, DqnModelConfig};
use crate::{
    sync::SyncPolicy,
    util::{CriticLoss, OutDim},
    Device,
};
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{default::Default, path::Path};
use tdrl_core::yaml;

/// Configuration of [`Dqn`](super::Dqn) agent.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DqnConfig<Q>
where
    Q: OutDim,
{
    /// Configuration of the action-value function and its optimizer.
    pub model_config: DqnModelConfig<Q>,

    /// The number of gradient steps per optimization step.
    pub n_updates_per_opt: usize,

    /// Batch size.
    pub batch_size: usize,

    /// Discount factor.
    pub discount_factor: f64,

    /// If `true`, the bootstrap action is chosen by the live network and
    /// evaluated by the target network.
    pub double_dqn: bool,

    /// Synchronization of the target network, counted in gradient steps.
    pub sync: SyncPolicy,

    /// Exploration in training mode.
    pub explorer: EpsilonGreedy,

    /// Loss function of the action-value function.
    pub critic_loss: CriticLoss,

    /// Device of the networks.
    pub device: Option<Device>,
}

impl<Q> Default for DqnConfig<Q>
where
    Q: OutDim,
{
    fn default() -> Self {
        Self {
            model_config: Default::default(),
            n_updates_per_opt: 1,
            batch_size: 128,
            discount_factor: 0.99,
            double_dqn: true,
            sync: SyncPolicy::Hard { interval: 500 },
            explorer: EpsilonGreedy::default(),
            critic_loss: CriticLoss::Mse,
            device: None,
        }
    }
}

impl<Q> DqnConfig<Q>
where
    Q: DeserializeOwned + Serialize + OutDim,
{
    /// Sets the configuration of the model.
    pub fn model_config(mut self, model_config: DqnModelConfig<Q>) -> Self {
        self.model_config = model_config;
        self
    }

    /// Sets the number of gradient steps per optimization step.
    pub fn n_updates_per_opt(mut self, v: usize) -> Self {
        self.n_updates_per_opt = v;
        self
    }

    /// Batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.discount_factor = v;
        self
    }

    /// Enables or disables double DQN.
    pub fn double_dqn(mut self, v: bool) -> Self {
        self.double_dqn = v;
        self
    }

    /// Synchronization of the target network.
    pub fn sync(mut self, v: SyncPolicy) -> Self {
        self.sync = v;
        self
    }

    /// Explorer.
    pub fn explorer(mut self, v: EpsilonGreedy) -> Self {
        self.explorer = v;
        self
    }

    /// Critic loss.
    pub fn critic_loss(mut self, v: CriticLoss) -> Self {
        self.critic_loss = v;
        self
    }

    /// Device.
    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Loads [`DqnConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        yaml::load(path)
    }

    /// Saves [`DqnConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        yaml::save(self, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mlp::MlpConfig, opt::OptimizerConfig, Activation};
    use tdrl_core::schedule::ExplorationSchedule;
    use tempdir::TempDir;

    #[test]
    fn test_serde_dqn_config() -> Result<()> {
        let config = DqnConfig::default()
            .model_config(
                DqnModelConfig::default()
                    .q_config(MlpConfig::new(4, vec![64, 64], 2, Activation::None))
                    .opt_config(OptimizerConfig::Adam { lr: 0.001 }),
            )
            .batch_size(32)
            .discount_factor(0.9)
            .double_dqn(false)
            .sync(SyncPolicy::Soft { tau: 0.01 })
            .explorer(EpsilonGreedy::new(ExplorationSchedule::Constant(0.1), 3))
            .critic_loss(CriticLoss::SmoothL1)
            .device(Device::Cpu);

        let dir = TempDir::new("dqn_config")?;
        let path = dir.path().join("dqn_config.yaml");
        config.save(&path)?;
        let config_ = DqnConfig::<MlpConfig>::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
