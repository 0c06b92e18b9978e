use anyhow::{ensure, Result};
use clap::Parser;
use std::path::Path;
use tdrl::util::run_dir;
use tdrl_candle_agent::{
    mlp::{Mlp, MlpConfig},
    opt::OptimizerConfig,
    sync::SyncPolicy,
    td3::{ActorConfig, CriticConfig, Td3, Td3Config},
    Activation, Device, TensorBatch,
};
use tdrl_core::{
    record::AggregateRecorder,
    replay_buffer::{
        SimpleReplayBuffer, SimpleReplayBufferConfig, SimpleStepProcessor,
        SimpleStepProcessorConfig,
    },
    schedule::ExplorationSchedule,
    ActionSpace, Agent, Configurable, DefaultEvaluator, Env as _, Evaluator as _,
    ReplayBufferBase, StepProcessor, Trainer, TrainerConfig,
};
use tdrl_envs::{Pendulum, PendulumConfig};
use tdrl_tensorboard::TensorboardRecorder;

const DIM_OBS: usize = 3;
const DIM_ACT: usize = 1;
const MAX_TORQUE: f32 = 2.0;
const N_EPISODES_PER_EVAL: usize = 5;

type Env = Pendulum;
type StepProc = SimpleStepProcessor<Env, TensorBatch, TensorBatch>;
type ReplayBuffer = SimpleReplayBuffer<TensorBatch, TensorBatch>;
type Td3Agent = Td3<Env, Mlp, Mlp, ReplayBuffer>;
type Evaluator = DefaultEvaluator<Env>;

/// Train TD3 agent in pendulum environment
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
struct Args {
    /// Total number of environment steps
    #[arg(long, default_value_t = 200_000)]
    total_timesteps: usize,

    /// Batch size
    #[arg(long, default_value_t = 256)]
    batch_size: usize,

    /// Capacity of the replay buffer
    #[arg(long, default_value_t = 100_000)]
    buffer_size: usize,

    /// Learning rate of the actor and the critics
    #[arg(long, default_value_t = 3e-4)]
    learning_rate: f64,

    /// Units of the hidden layers
    #[arg(long, value_delimiter = ',', default_value = "256,256")]
    list_layer: Vec<usize>,

    /// Discount factor
    #[arg(long, default_value_t = 0.99)]
    gamma: f64,

    /// Soft update coefficient of the target networks
    #[arg(long, default_value_t = 0.005)]
    tau: f64,

    /// Standard deviation of exploration noise relative to the action scale
    #[arg(long, default_value_t = 0.1)]
    exploration_noise: f64,

    /// Standard deviation of target policy smoothing noise relative to the action scale
    #[arg(long, default_value_t = 0.2)]
    policy_noise: f64,

    /// Clipping bound of target policy smoothing noise relative to the action scale
    #[arg(long, default_value_t = 0.5)]
    noise_clip: f64,

    /// Critic updates per actor update
    #[arg(long, default_value_t = 2)]
    policy_frequency: usize,

    /// Environment steps with uniformly random actions before the first optimization step
    #[arg(long, default_value_t = 25_000)]
    learning_start: usize,

    /// Interval of optimization steps in environment steps
    #[arg(long, default_value_t = 1)]
    train_frequency: usize,

    /// Interval of evaluation, checkpoint and flushing records in environment steps
    #[arg(long, default_value_t = 10_000)]
    eval_interval: usize,

    /// Random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Base directory of runs
    #[arg(long, default_value = "runs")]
    runs_dir: String,
}

fn create_env_config() -> PendulumConfig {
    PendulumConfig::default()
}

fn create_agent_config(args: &Args) -> Td3Config<MlpConfig, MlpConfig> {
    let opt_config = OptimizerConfig::Adam {
        lr: args.learning_rate,
    };
    let actor_config = ActorConfig::default()
        .policy_config(MlpConfig::new(
            DIM_OBS,
            args.list_layer.clone(),
            DIM_ACT,
            Activation::Tanh,
        ))
        .opt_config(opt_config.clone());
    let critic_config = CriticConfig::default()
        .q_config(MlpConfig::new(
            DIM_OBS + DIM_ACT,
            args.list_layer.clone(),
            1,
            Activation::None,
        ))
        .opt_config(opt_config);

    Td3Config::default()
        .actor_config(actor_config)
        .critic_config(critic_config)
        .batch_size(args.batch_size)
        .discount_factor(args.gamma)
        .sync(SyncPolicy::Soft { tau: args.tau })
        .policy_noise(args.policy_noise)
        .noise_clip(args.noise_clip)
        .policy_frequency(args.policy_frequency)
        .exploration_noise(ExplorationSchedule::Constant(args.exploration_noise))
        .learning_start(args.learning_start)
        .action_space(ActionSpace::Continuous {
            low: vec![-MAX_TORQUE; DIM_ACT],
            high: vec![MAX_TORQUE; DIM_ACT],
        })
        .seed(args.seed)
        .device(Device::Cpu)
}

fn create_trainer_config(args: &Args, model_dir: &Path) -> TrainerConfig {
    TrainerConfig::default()
        .total_timesteps(args.total_timesteps)
        .warmup_period(args.learning_start)
        .opt_interval(args.train_frequency)
        .eval_interval(args.eval_interval)
        .save_interval(args.eval_interval)
        .flush_record_interval(args.eval_interval)
        .record_compute_cost_interval(args.eval_interval)
        .model_dir(model_dir.to_string_lossy())
}

/// Uniform exploration of the agent has to end where the trainer's warmup ends.
fn check_warmup(
    agent_config: &Td3Config<MlpConfig, MlpConfig>,
    trainer_config: &TrainerConfig,
) -> Result<()> {
    ensure!(
        agent_config.learning_start == trainer_config.warmup_period,
        "learning_start of the agent ({}) differs from warmup_period of the trainer ({})",
        agent_config.learning_start,
        trainer_config.warmup_period
    );
    Ok(())
}

fn train(args: &Args) -> Result<()> {
    let run_dir = run_dir(&args.runs_dir, "td3_pendulum")?;
    let env_config = create_env_config();
    let agent_config = create_agent_config(args);
    let trainer_config = create_trainer_config(args, &run_dir.join("model"));
    check_warmup(&agent_config, &trainer_config)?;
    let buffer_config = SimpleReplayBufferConfig::default()
        .capacity(args.buffer_size)
        .seed(args.seed);
    env_config.save(run_dir.join("env.yaml"))?;
    agent_config.save(run_dir.join("agent.yaml"))?;
    trainer_config.save(run_dir.join("trainer.yaml"))?;
    buffer_config.save(run_dir.join("replay_buffer.yaml"))?;

    let mut recorder: Box<dyn AggregateRecorder> = Box::new(TensorboardRecorder::new(&run_dir));
    let mut trainer = Trainer::build(trainer_config);
    let env = Env::build(&env_config, args.seed as i64)?;
    let step_proc = StepProc::build(&SimpleStepProcessorConfig::default());
    let mut agent = Td3Agent::build(agent_config)?;
    let mut buffer = ReplayBuffer::build(&buffer_config);
    let mut evaluator = Evaluator::new(
        Env::build(&env_config, args.seed as i64 + 1)?,
        N_EPISODES_PER_EVAL,
    )?;

    trainer.train(
        env,
        step_proc,
        &mut agent,
        &mut buffer,
        &mut recorder,
        &mut evaluator,
    )?;

    let best = run_dir.join("model").join("best");
    if best.exists() {
        eval(args, &best)?;
    }

    Ok(())
}

fn eval(args: &Args, model_dir: &Path) -> Result<()> {
    let mut agent = Td3Agent::build(create_agent_config(args))?;
    agent.load_params(model_dir)?;
    agent.eval();

    let env = Env::build(&create_env_config(), args.seed as i64 + 2)?;
    let record = Evaluator::new(env, N_EPISODES_PER_EVAL)?.evaluate(&mut agent)?;
    log::info!(
        "Average return of the best model: {}",
        record.get_scalar("eval_return")?
    );

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    train(&args)
}
