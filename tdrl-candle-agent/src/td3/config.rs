//! Configuration of TD3 agent.
use super::{ActorConfig, CriticConfig};
use crate::{
    sync::SyncPolicy,
    util::{CriticLoss, OutDim},
    Device,
};
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;
use tdrl_core::{schedule::ExplorationSchedule, yaml, ActionSpace};

/// Configuration of [`Td3`](super::Td3) agent.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Td3Config<P, Q>
where
    P: OutDim,
{
    /// Configuration of the actor.
    pub actor_config: ActorConfig<P>,

    /// Configuration of the twin critics.
    pub critic_config: CriticConfig<Q>,

    /// Batch size.
    pub batch_size: usize,

    /// Discount factor.
    pub discount_factor: f64,

    /// Synchronization of the target networks, counted in actor updates.
    pub sync: SyncPolicy,

    /// Standard deviation of target policy smoothing noise, relative to the
    /// half width of the action box.
    pub policy_noise: f64,

    /// Clipping bound of target policy smoothing noise, relative to the half
    /// width of the action box.
    pub noise_clip: f64,

    /// The actor and the target networks are updated once every
    /// `policy_frequency` critic updates.
    pub policy_frequency: usize,

    /// Standard deviation of exploration noise, relative to the half width of
    /// the action box, as a function of the environment step.
    pub exploration_noise: ExplorationSchedule,

    /// Actions are sampled uniformly from the action box before this environment step.
    ///
    /// The agent does not see the trainer's configuration. Set this equal to
    /// [`TrainerConfig::warmup_period`](tdrl_core::TrainerConfig) so that the first
    /// optimization step follows the last uniform action.
    pub learning_start: usize,

    /// The action box.
    pub action_space: ActionSpace,

    /// Loss function of the critics.
    pub critic_loss: CriticLoss,

    /// Random seed of exploration and target policy smoothing.
    pub seed: u64,

    /// Device of the networks.
    pub device: Option<Device>,
}

impl<P, Q> Default for Td3Config<P, Q>
where
    P: OutDim,
{
    fn default() -> Self {
        Self {
            actor_config: Default::default(),
            critic_config: Default::default(),
            batch_size: 256,
            discount_factor: 0.99,
            sync: SyncPolicy::Soft { tau: 0.005 },
            policy_noise: 0.2,
            noise_clip: 0.5,
            policy_frequency: 2,
            exploration_noise: ExplorationSchedule::Constant(0.1),
            learning_start: 25_000,
            action_space: ActionSpace::Continuous {
                low: vec![-1.0],
                high: vec![1.0],
            },
            critic_loss: CriticLoss::Mse,
            seed: 42,
            device: None,
        }
    }
}

impl<P, Q> Td3Config<P, Q>
where
    P: DeserializeOwned + Serialize + OutDim,
    Q: DeserializeOwned + Serialize,
{
    /// Sets the configuration of the actor.
    pub fn actor_config(mut self, v: ActorConfig<P>) -> Self {
        self.actor_config = v;
        self
    }

    /// Sets the configuration of the critics.
    pub fn critic_config(mut self, v: CriticConfig<Q>) -> Self {
        self.critic_config = v;
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

    /// Synchronization of the target networks.
    pub fn sync(mut self, v: SyncPolicy) -> Self {
        self.sync = v;
        self
    }

    /// Standard deviation of target policy smoothing noise.
    pub fn policy_noise(mut self, v: f64) -> Self {
        self.policy_noise = v;
        self
    }

    /// Clipping bound of target policy smoothing noise.
    pub fn noise_clip(mut self, v: f64) -> Self {
        self.noise_clip = v;
        self
    }

    /// Frequency of delayed policy updates.
    pub fn policy_frequency(mut self, v: usize) -> Self {
        self.policy_frequency = v;
        self
    }

    /// Exploration noise.
    pub fn exploration_noise(mut self, v: ExplorationSchedule) -> Self {
        self.exploration_noise = v;
        self
    }

    /// Environment step from which the actor is used for exploration.
    pub fn learning_start(mut self, v: usize) -> Self {
        self.learning_start = v;
        self
    }

    /// The action box.
    pub fn action_space(mut self, v: ActionSpace) -> Self {
        self.action_space = v;
        self
    }

    /// Critic loss.
    pub fn critic_loss(mut self, v: CriticLoss) -> Self {
        self.critic_loss = v;
        self
    }

    /// Random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Device.
    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Loads [`Td3Config`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        yaml::load(path)
    }

    /// Saves [`Td3Config`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        yaml::save(self, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mlp::MlpConfig, Activation};
    use tempdir::TempDir;

    #[test]
    fn test_serde_td3_config() -> Result<()> {
        let config = Td3Config::default()
            .actor_config(
                ActorConfig::default()
                    .policy_config(MlpConfig::new(3, vec![64], 1, Activation::Tanh)),
            )
            .critic_config(
                CriticConfig::default().q_config(MlpConfig::new(4, vec![64], 1, Activation::None)),
            )
            .learning_start(1000)
            .policy_frequency(3)
            .action_space(ActionSpace::Continuous {
                low: vec![-2.0],
                high: vec![2.0],
            });

        let dir = TempDir::new("td3_config")?;
        let path = dir.path().join("td3_config.yaml");
        config.save(&path)?;
        let config_ = Td3Config::<MlpConfig, MlpConfig>::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
