//! DQN agent implemented with candle.
use super::{
    config::DqnConfig,
    explorer::{greedy, EpsilonGreedy},
    model::DqnModel,
};
use crate::{
    model::SubModel1,
    opt::Optimizer,
    sync::{hard_copy, TargetSync},
    target::{bellman_target, double_q_bootstrap, max_q_bootstrap},
    util::{finite_loss, is_done, reward, CriticLoss, OutDim},
};
use anyhow::Result;
use candle_core::{shape::D, DType, Device, Tensor};
use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    convert::{TryFrom, TryInto},
    fs,
    marker::PhantomData,
    path::Path,
};
use tdrl_core::{
    record::{Record, RecordValue},
    Agent, Configurable, Env, Policy, ReplayBufferBase, TransitionBatch,
};

#[allow(clippy::upper_case_acronyms)]
/// DQN agent implemented with candle.
///
/// Observations are converted into tensors with [`TryInto`] and the output of
/// [`greedy`] or [`EpsilonGreedy`], an `i64` tensor of shape `[1]`, is converted
/// into actions with [`TryFrom`].
pub struct Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    R: ReplayBufferBase,
    E::Obs: TryInto<Tensor, Error = anyhow::Error>,
    E::Act: TryFrom<Tensor, Error = anyhow::Error>,
    Q::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: TryInto<Tensor, Error = anyhow::Error>,
    <R::Batch as TransitionBatch>::ActBatch: TryInto<Tensor, Error = anyhow::Error>,
{
    pub(in crate::dqn) n_updates_per_opt: usize,
    pub(in crate::dqn) batch_size: usize,
    pub(in crate::dqn) qnet: DqnModel<Q>,
    pub(in crate::dqn) qnet_tgt: DqnModel<Q>,
    pub(in crate::dqn) opt: Optimizer,
    pub(in crate::dqn) target_sync: TargetSync,
    pub(in crate::dqn) train: bool,
    pub(in crate::dqn) phantom: PhantomData<(E, R)>,
    pub(in crate::dqn) discount_factor: f64,
    pub(in crate::dqn) explorer: EpsilonGreedy,
    pub(in crate::dqn) device: Device,
    pub(in crate::dqn) n_opts: usize,
    pub(in crate::dqn) double_dqn: bool,
    pub(in crate::dqn) critic_loss: CriticLoss,
    rng: StdRng,
}

impl<E, Q, R> Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    R: ReplayBufferBase,
    E::Obs: TryInto<Tensor, Error = anyhow::Error>,
    E::Act: TryFrom<Tensor, Error = anyhow::Error>,
    Q::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: TryInto<Tensor, Error = anyhow::Error>,
    <R::Batch as TransitionBatch>::ActBatch: TryInto<Tensor, Error = anyhow::Error>,
{
    fn update_critic(&mut self, buffer: &mut R) -> Result<f32> {
        let batch = buffer.batch(self.batch_size)?;
        let (obs, act, next_obs, reward_, is_terminated, is_truncated, _ixs) = batch.unpack();
        let batch_size = reward_.len();
        let obs: Tensor = obs.try_into()?;
        let next_obs: Tensor = next_obs.try_into()?;
        let act: Tensor = act.try_into()?;
        let act = act
            .to_device(&self.device)?
            .to_dtype(DType::I64)?
            .reshape((batch_size, 1))?;
        let reward = reward(&reward_, &self.device)?;
        let is_done = is_done(&is_terminated, &is_truncated, &self.device)?;

        let pred = self
            .qnet
            .forward(&obs)?
            .gather(&act, D::Minus1)?
            .squeeze(D::Minus1)?;

        let tgt = {
            let q_tgt_next = self.qnet_tgt.forward(&next_obs)?;
            let bootstrap = if self.double_dqn {
                let q_live_next = self.qnet.forward(&next_obs)?;
                double_q_bootstrap(&q_live_next, &q_tgt_next)?
            } else {
                max_q_bootstrap(&q_tgt_next)?
            };
            bellman_target(&reward, &is_done, self.discount_factor, &bootstrap)?
        }
        .detach();

        let loss = self.critic_loss.loss(&pred, &tgt)?;
        let loss_value = finite_loss("loss_critic", &loss)?;
        self.opt.backward_step(&loss)?;

        Ok(loss_value)
    }

    fn opt_(&mut self, buffer: &mut R) -> Result<Record> {
        let mut loss_critic = 0f32;

        for _ in 0..self.n_updates_per_opt {
            loss_critic += self.update_critic(buffer)?;
            let synced = self.target_sync.step(&[(
                self.qnet.get_varmap(),
                self.qnet_tgt.get_varmap(),
            )])?;
            if synced {
                debug!("Synchronized the target network");
            }
        }

        loss_critic /= self.n_updates_per_opt as f32;
        self.n_opts += 1;

        Ok(Record::from_slice(&[(
            "loss_critic",
            RecordValue::Scalar(loss_critic),
        )]))
    }

    fn action_values(&self, obs: &E::Obs) -> Result<Tensor> {
        let obs: Tensor = obs.clone().try_into()?;
        self.qnet.forward(&obs)
    }

    /// Returns the live and the target networks.
    pub fn models(&self) -> (&DqnModel<Q>, &DqnModel<Q>) {
        (&self.qnet, &self.qnet_tgt)
    }

    /// Returns the number of optimization steps done.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }
}

impl<E, Q, R> Configurable for Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    R: ReplayBufferBase,
    E::Obs: TryInto<Tensor, Error = anyhow::Error>,
    E::Act: TryFrom<Tensor, Error = anyhow::Error>,
    Q::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: TryInto<Tensor, Error = anyhow::Error>,
    <R::Batch as TransitionBatch>::ActBatch: TryInto<Tensor, Error = anyhow::Error>,
{
    type Config = DqnConfig<Q::Config>;

    /// Constructs DQN agent.
    ///
    /// The target network starts as a copy of the live network.
    fn build(config: Self::Config) -> Result<Self> {
        let device: Device = config.device.unwrap_or_default().try_into()?;
        let qnet = DqnModel::build(&config.model_config, &device)?;
        let qnet_tgt = DqnModel::build(&config.model_config, &device)?;
        hard_copy(qnet_tgt.get_varmap(), qnet.get_varmap())?;
        let opt = config
            .model_config
            .opt_config
            .build(qnet.get_varmap().all_vars())?;
        let target_sync = TargetSync::new(config.sync)?;

        Ok(Dqn {
            qnet,
            qnet_tgt,
            opt,
            target_sync,
            n_updates_per_opt: config.n_updates_per_opt,
            batch_size: config.batch_size,
            discount_factor: config.discount_factor,
            train: false,
            rng: StdRng::seed_from_u64(config.explorer.seed),
            explorer: config.explorer,
            device,
            n_opts: 0,
            double_dqn: config.double_dqn,
            critic_loss: config.critic_loss,
            phantom: PhantomData,
        })
    }
}

impl<E, Q, R> Policy<E> for Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    R: ReplayBufferBase,
    E::Obs: TryInto<Tensor, Error = anyhow::Error>,
    E::Act: TryFrom<Tensor, Error = anyhow::Error>,
    Q::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: TryInto<Tensor, Error = anyhow::Error>,
    <R::Batch as TransitionBatch>::ActBatch: TryInto<Tensor, Error = anyhow::Error>,
{
    /// Takes the greedy action.
    fn sample(&mut self, obs: &E::Obs) -> Result<E::Act> {
        let q = self.action_values(obs)?;
        E::Act::try_from(greedy(&q)?)
    }
}

impl<E, Q, R> Agent<E, R> for Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    R: ReplayBufferBase,
    E::Obs: TryInto<Tensor, Error = anyhow::Error>,
    E::Act: TryFrom<Tensor, Error = anyhow::Error>,
    Q::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: TryInto<Tensor, Error = anyhow::Error>,
    <R::Batch as TransitionBatch>::ActBatch: TryInto<Tensor, Error = anyhow::Error>,
{
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    /// Takes an epsilon-greedy action in training mode and records `eps`.
    fn explore(&mut self, obs: &E::Obs, env_steps: usize) -> Result<(E::Act, Record)> {
        if !self.train {
            return Ok((self.sample(obs)?, Record::empty()));
        }
        let q = self.action_values(obs)?;
        let (act, eps) = self.explorer.action(&q, env_steps, &mut self.rng)?;
        Ok((
            E::Act::try_from(act)?,
            Record::from_scalar("eps", eps as f32),
        ))
    }

    fn opt_with_record(&mut self, buffer: &mut R) -> Result<Record> {
        self.opt_(buffer)
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        self.qnet.save(path.join("qnet.safetensors"))?;
        self.qnet_tgt.save(path.join("qnet_tgt.safetensors"))?;
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.qnet.load(path.join("qnet.safetensors"))?;
        self.qnet_tgt.load(path.join("qnet_tgt.safetensors"))?;
        info!("Loaded DQN parameters from {:?}", path);
        Ok(())
    }
}
