//! TD3 agent implemented with candle.
use super::{Actor, Critic, Td3Config};
use crate::{
    model::{SubModel1, SubModel2},
    opt::Optimizer,
    sync::{hard_copy, TargetSync},
    target::{
        bellman_target, smoothed_target_action, smoothing_noise, twin_critic_bootstrap,
    },
    util::{finite_loss, is_done, reward, CriticLoss, OutDim},
};
use anyhow::{bail, Result};
use candle_core::{DType, Device, Tensor};
use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    convert::{TryFrom, TryInto},
    fs,
    marker::PhantomData,
    path::Path,
};
use tdrl_core::{
    record::{Record, RecordValue},
    schedule::ExplorationSchedule,
    ActionSpace, Agent, Configurable, Env, Policy, ReplayBufferBase, TransitionBatch,
};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// TD3 agent implemented with candle.
///
/// The agent has an actor, two critics and a target network for each of them.
/// The critics are trained with a single optimizer over the variables of both,
/// the actor with its own optimizer.
///
/// # Optimization step
///
/// Every optimization step updates the critics toward
/// `r + (1 - done) * gamma * min(Q1'(s', a'), Q2'(s', a'))`, where `a'` is the
/// target actor's action perturbed by clipped Gaussian noise and clipped into
/// the action box. Every `policy_frequency` critic updates, the actor is
/// updated to maximize `Q1(s, actor(s))` and all three target networks are
/// synchronized together.
///
/// ```mermaid
/// graph TD
///     A[Sample batch]-->B[Critic update]
///     B-->C{critic updates % policy_frequency == 0}
///     C -->|yes|D[Actor update]
///     D-->E[Sync actor, critic 1, critic 2 targets]
///     C -->|no|F[Done]
///     E-->F
/// ```
///
/// # Exploration
///
/// Before `learning_start` environment steps, actions are uniform in the action
/// box. After that, Gaussian noise with standard deviation
/// `scale * exploration_noise` is added to the actor's output and the result is
/// clipped into the box. In evaluation mode the actor's output is used as is.
pub struct Td3<E, P, Q, R>
where
    E: Env,
    P: SubModel1<Input = Tensor, Output = Tensor>,
    Q: SubModel2<Input1 = Tensor, Input2 = Tensor, Output = Tensor>,
    R: ReplayBufferBase,
    E::Obs: TryInto<Tensor, Error = anyhow::Error>,
    E::Act: TryFrom<Tensor, Error = anyhow::Error>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    Q::Config: DeserializeOwned + Serialize + std::fmt::Debug + PartialEq + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: TryInto<Tensor, Error = anyhow::Error>,
    <R::Batch as TransitionBatch>::ActBatch: TryInto<Tensor, Error = anyhow::Error>,
{
    actor: Actor<P>,
    actor_tgt: Actor<P>,
    critic1: Critic<Q>,
    critic1_tgt: Critic<Q>,
    critic2: Critic<Q>,
    critic2_tgt: Critic<Q>,
    actor_opt: Optimizer,
    critic_opt: Optimizer,
    target_sync: TargetSync,
    batch_size: usize,
    discount_factor: f64,
    policy_noise: f64,
    noise_clip: f64,
    policy_frequency: usize,
    exploration_noise: ExplorationSchedule,
    learning_start: usize,
    action_space: ActionSpace,
    scale: Vec<f32>,
    low: Tensor,
    high: Tensor,
    critic_loss: CriticLoss,
    n_critic_updates: usize,
    train: bool,
    device: Device,
    rng: StdRng,
    phantom: PhantomData<(E, R)>,
}

impl<E, P, Q, R> Td3<E, P, Q, R>
where
    E: Env,
    P: SubModel1<Input = Tensor, Output = Tensor>,
    Q: SubModel2<Input1 = Tensor, Input2 = Tensor, Output = Tensor>,
    R: ReplayBufferBase,
    E::Obs: TryInto<Tensor, Error = anyhow::Error>,
    E::Act: TryFrom<Tensor, Error = anyhow::Error>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    Q::Config: DeserializeOwned + Serialize + std::fmt::Debug + PartialEq + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: TryInto<Tensor, Error = anyhow::Error>,
    <R::Batch as TransitionBatch>::ActBatch: TryInto<Tensor, Error = anyhow::Error>,
{
    fn update_critic(&mut self, obs: &Tensor, act: &Tensor, batch: Batch) -> Result<f32> {
        let Batch {
            next_obs,
            reward,
            is_done,
        } = batch;

        let tgt = {
            let noise = smoothing_noise(
                &mut self.rng,
                reward.dims1()?,
                self.policy_noise,
                self.noise_clip,
                &self.scale,
                &self.device,
            )?;
            let next_act = self.actor_tgt.forward(&next_obs)?;
            let next_act = smoothed_target_action(&next_act, &noise, &self.low, &self.high)?;
            let q1 = self.critic1_tgt.forward(&next_obs, &next_act)?;
            let q2 = self.critic2_tgt.forward(&next_obs, &next_act)?;
            let bootstrap = twin_critic_bootstrap(&q1, &q2)?;
            bellman_target(&reward, &is_done, self.discount_factor, &bootstrap)?
        }
        .detach();

        let loss1 = self
            .critic_loss
            .loss(&self.critic1.forward(obs, act)?, &tgt)?;
        let loss2 = self
            .critic_loss
            .loss(&self.critic2.forward(obs, act)?, &tgt)?;
        let loss = (loss1 + loss2)?;
        let loss_value = finite_loss("loss_critic", &loss)?;
        self.critic_opt.backward_step(&loss)?;

        Ok(loss_value)
    }

    fn update_actor(&mut self, obs: &Tensor) -> Result<f32> {
        let act = self.actor.forward(obs)?;
        let loss = self.critic1.forward(obs, &act)?.mean_all()?.neg()?;
        let loss_value = finite_loss("loss_actor", &loss)?;
        self.actor_opt.backward_step(&loss)?;

        Ok(loss_value)
    }

    fn sync_targets(&mut self) -> Result<bool> {
        self.target_sync.step(&[
            (self.actor.get_varmap(), self.actor_tgt.get_varmap()),
            (self.critic1.get_varmap(), self.critic1_tgt.get_varmap()),
            (self.critic2.get_varmap(), self.critic2_tgt.get_varmap()),
        ])
    }

    fn opt_(&mut self, buffer: &mut R) -> Result<Record> {
        let batch = buffer.batch(self.batch_size)?;
        let (obs, act, next_obs, reward_, is_terminated, is_truncated, _ixs) = batch.unpack();
        let obs: Tensor = obs.try_into()?;
        let obs = obs.to_device(&self.device)?;
        let act: Tensor = act.try_into()?;
        let act = act.to_device(&self.device)?.to_dtype(DType::F32)?;
        let next_obs: Tensor = next_obs.try_into()?;
        let batch = Batch {
            next_obs: next_obs.to_device(&self.device)?,
            reward: reward(&reward_, &self.device)?,
            is_done: is_done(&is_terminated, &is_truncated, &self.device)?,
        };

        let loss_critic = self.update_critic(&obs, &act, batch)?;
        self.n_critic_updates += 1;
        let mut record = Record::from_scalar("loss_critic", loss_critic);

        if self.n_critic_updates % self.policy_frequency == 0 {
            let loss_actor = self.update_actor(&obs)?;
            record.insert("loss_actor", RecordValue::Scalar(loss_actor));
            if self.sync_targets()? {
                debug!("Synchronized the target networks");
            }
        }

        Ok(record)
    }

    fn actor_action(&self, obs: &E::Obs) -> Result<Vec<f32>> {
        let obs: Tensor = obs.clone().try_into()?;
        let act = self.actor.forward(&obs)?;
        Ok(act.flatten_all()?.to_vec1::<f32>()?)
    }

    fn to_act(&self, a: Vec<f32>) -> Result<E::Act> {
        let dim = a.len();
        E::Act::try_from(Tensor::from_vec(a, (1, dim), &Device::Cpu)?)
    }

    /// Returns the number of critic updates done.
    pub fn n_critic_updates(&self) -> usize {
        self.n_critic_updates
    }

    /// Returns the live and target actors.
    pub fn actors(&self) -> (&Actor<P>, &Actor<P>) {
        (&self.actor, &self.actor_tgt)
    }

    /// Returns the live and target critics, the first and then the second one.
    pub fn critics(&self) -> [(&Critic<Q>, &Critic<Q>); 2] {
        [
            (&self.critic1, &self.critic1_tgt),
            (&self.critic2, &self.critic2_tgt),
        ]
    }
}

struct Batch {
    next_obs: Tensor,
    reward: Tensor,
    is_done: Tensor,
}

impl<E, P, Q, R> Configurable for Td3<E, P, Q, R>
where
    E: Env,
    P: SubModel1<Input = Tensor, Output = Tensor>,
    Q: SubModel2<Input1 = Tensor, Input2 = Tensor, Output = Tensor>,
    R: ReplayBufferBase,
    E::Obs: TryInto<Tensor, Error = anyhow::Error>,
    E::Act: TryFrom<Tensor, Error = anyhow::Error>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    Q::Config: DeserializeOwned + Serialize + std::fmt::Debug + PartialEq + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: TryInto<Tensor, Error = anyhow::Error>,
    <R::Batch as TransitionBatch>::ActBatch: TryInto<Tensor, Error = anyhow::Error>,
{
    type Config = Td3Config<P::Config, Q::Config>;

    /// Constructs TD3 agent.
    ///
    /// The target networks start as copies of the live networks.
    fn build(config: Self::Config) -> Result<Self> {
        let (low, high) = match &config.action_space {
            ActionSpace::Continuous { low, high } if !low.is_empty() && low.len() == high.len() => {
                (low.clone(), high.clone())
            }
            space => bail!("TD3 needs a non-empty continuous action space, got {:?}", space),
        };
        if config.policy_frequency == 0 {
            bail!("policy_frequency must be positive");
        }
        let device: Device = config.device.unwrap_or_default().try_into()?;
        let scale = config.action_space.scale();
        let bias = config.action_space.bias();

        let actor = Actor::build(&config.actor_config, &scale, &bias, &device)?;
        let actor_tgt = Actor::build(&config.actor_config, &scale, &bias, &device)?;
        let critic1 = Critic::build(&config.critic_config, &device)?;
        let critic1_tgt = Critic::build(&config.critic_config, &device)?;
        let critic2 = Critic::build(&config.critic_config, &device)?;
        let critic2_tgt = Critic::build(&config.critic_config, &device)?;
        hard_copy(actor_tgt.get_varmap(), actor.get_varmap())?;
        hard_copy(critic1_tgt.get_varmap(), critic1.get_varmap())?;
        hard_copy(critic2_tgt.get_varmap(), critic2.get_varmap())?;

        let actor_opt = config
            .actor_config
            .opt_config
            .build(actor.get_varmap().all_vars())?;
        let critic_opt = {
            let mut vars = critic1.get_varmap().all_vars();
            vars.extend(critic2.get_varmap().all_vars());
            config.critic_config.opt_config.build(vars)?
        };

        let dim = low.len();
        let low = Tensor::from_slice(&low, (dim,), &device)?;
        let high = Tensor::from_slice(&high, (dim,), &device)?;

        Ok(Self {
            actor,
            actor_tgt,
            critic1,
            critic1_tgt,
            critic2,
            critic2_tgt,
            actor_opt,
            critic_opt,
            target_sync: TargetSync::new(config.sync)?,
            batch_size: config.batch_size,
            discount_factor: config.discount_factor,
            policy_noise: config.policy_noise,
            noise_clip: config.noise_clip,
            policy_frequency: config.policy_frequency,
            exploration_noise: config.exploration_noise,
            learning_start: config.learning_start,
            action_space: config.action_space,
            scale,
            low,
            high,
            critic_loss: config.critic_loss,
            n_critic_updates: 0,
            train: false,
            device,
            rng: StdRng::seed_from_u64(config.seed),
            phantom: PhantomData,
        })
    }
}

impl<E, P, Q, R> Policy<E> for Td3<E, P, Q, R>
where
    E: Env,
    P: SubModel1<Input = Tensor, Output = Tensor>,
    Q: SubModel2<Input1 = Tensor, Input2 = Tensor, Output = Tensor>,
    R: ReplayBufferBase,
    E::Obs: TryInto<Tensor, Error = anyhow::Error>,
    E::Act: TryFrom<Tensor, Error = anyhow::Error>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    Q::Config: DeserializeOwned + Serialize + std::fmt::Debug + PartialEq + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: TryInto<Tensor, Error = anyhow::Error>,
    <R::Batch as TransitionBatch>::ActBatch: TryInto<Tensor, Error = anyhow::Error>,
{
    /// Takes the deterministic action of the actor, clipped into the action box.
    fn sample(&mut self, obs: &E::Obs) -> Result<E::Act> {
        let a = self.actor_action(obs)?;
        self.to_act(self.action_space.clip(&a))
    }
}

impl<E, P, Q, R> Agent<E, R> for Td3<E, P, Q, R>
where
    E: Env,
    P: SubModel1<Input = Tensor, Output = Tensor>,
    Q: SubModel2<Input1 = Tensor, Input2 = Tensor, Output = Tensor>,
    R: ReplayBufferBase,
    E::Obs: TryInto<Tensor, Error = anyhow::Error>,
    E::Act: TryFrom<Tensor, Error = anyhow::Error>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
    Q::Config: DeserializeOwned + Serialize + std::fmt::Debug + PartialEq + Clone,
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

    /// Takes a uniform action before `learning_start`, a noisy actor action after.
    ///
    /// Records the noise scale as `eps`.
    fn explore(&mut self, obs: &E::Obs, env_steps: usize) -> Result<(E::Act, Record)> {
        if !self.train {
            return Ok((self.sample(obs)?, Record::empty()));
        }

        if env_steps < self.learning_start {
            let a = self.action_space.sample_uniform(&mut self.rng);
            return Ok((self.to_act(a)?, Record::empty()));
        }

        let sigma = self.exploration_noise.value_at(env_steps) as f32;
        let mut a = self.actor_action(obs)?;
        for (a, s) in a.iter_mut().zip(self.scale.iter()) {
            let z: f32 = self.rng.sample(StandardNormal);
            *a += z * s * sigma;
        }
        let a = self.action_space.clip(&a);

        Ok((self.to_act(a)?, Record::from_scalar("eps", sigma)))
    }

    fn opt_with_record(&mut self, buffer: &mut R) -> Result<Record> {
        self.opt_(buffer)
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        self.actor.save(path.join("actor.safetensors"))?;
        self.actor_tgt.save(path.join("actor_tgt.safetensors"))?;
        self.critic1.save(path.join("critic1.safetensors"))?;
        self.critic1_tgt.save(path.join("critic1_tgt.safetensors"))?;
        self.critic2.save(path.join("critic2.safetensors"))?;
        self.critic2_tgt.save(path.join("critic2_tgt.safetensors"))?;
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.actor.load(path.join("actor.safetensors"))?;
        self.actor_tgt.load(path.join("actor_tgt.safetensors"))?;
        self.critic1.load(path.join("critic1.safetensors"))?;
        self.critic1_tgt.load(path.join("critic1_tgt.safetensors"))?;
        self.critic2.load(path.join("critic2.safetensors"))?;
        self.critic2_tgt.load(path.join("critic2_tgt.safetensors"))?;
        info!("Loaded TD3 parameters from {:?}", path);
        Ok(())
    }
}
