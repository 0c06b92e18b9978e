use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tdrl::util::run_dir;
use tdrl_candle_agent::{
    dqn::{Dqn, DqnConfig, DqnModelConfig, EpsilonGreedy},
    mlp::{Mlp, MlpConfig},
    opt::OptimizerConfig,
    sync::SyncPolicy,
    util::CriticLoss,
    Activation, Device, TensorBatch,
};
use tdrl_core::{
    record::AggregateRecorder,
    replay_buffer::{
        FrameStackReplayBuffer, FrameStackReplayBufferConfig, FrameStackStepProcessor,
        FrameStackStepProcessorConfig,
    },
    schedule::ExplorationSchedule,
    Agent, Configurable, DefaultEvaluator, Env as _, Evaluator as _, ReplayBufferBase,
    StepProcessor, Trainer, TrainerConfig,
};
use tdrl_envs::{Catch, CatchConfig};
use tdrl_tensorboard::TensorboardRecorder;

const DIM_ACT: usize = 3;
const N_EPISODES_PER_EVAL: usize = 10;

type Env = Catch;
type StepProc = FrameStackStepProcessor<Env, TensorBatch>;
type ReplayBuffer = FrameStackReplayBuffer<TensorBatch, TensorBatch>;
type Evaluator = DefaultEvaluator<Env>;

/// Train DQN agent on stacked pixel frames with soft target updates in catch environment
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
struct Args {
    /// Total number of environment steps
    #[arg(long, default_value_t = 100_000)]
    total_timesteps: usize,

    /// Batch size
    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    /// Capacity of the replay buffer in frames
    #[arg(long, default_value_t = 50_000)]
    buffer_size: usize,

    /// Learning rate
    #[arg(long, default_value_t = 1e-4)]
    learning_rate: f64,

    /// Units of the hidden layers
    #[arg(long, value_delimiter = ',', default_value = "128,128")]
    list_layer: Vec<usize>,

    /// Discount factor
    #[arg(long, default_value_t = 0.99)]
    gamma: f64,

    /// Soft update coefficient of the target network
    #[arg(long, default_value_t = 5e-3)]
    tau: f64,

    /// Initial probability of random actions
    #[arg(long, default_value_t = 1.0)]
    eps_start: f64,

    /// Asymptotic probability of random actions
    #[arg(long, default_value_t = 0.01)]
    eps_end: f64,

    /// Decay constant of the probability of random actions in environment steps
    #[arg(long, default_value_t = 10_000.0)]
    eps_decay: f64,

    /// Environment steps before the first optimization step
    #[arg(long, default_value_t = 5_000)]
    learning_start: usize,

    /// Interval of optimization steps in environment steps
    #[arg(long, default_value_t = 4)]
    train_frequency: usize,

    /// Interval of evaluation, checkpoint and flushing records in environment steps
    #[arg(long, default_value_t = 5_000)]
    eval_interval: usize,

    /// Random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Base directory of runs
    #[arg(long, default_value = "runs")]
    runs_dir: String,
}

fn create_env_config() -> CatchConfig {
    CatchConfig::default()
}

fn create_agent_config(args: &Args, env_config: &CatchConfig) -> DqnConfig<MlpConfig> {
    let in_dim = env_config.stack * env_config.height * env_config.width;
    let mlp_config = MlpConfig::new(in_dim, args.list_layer.clone(), DIM_ACT, Activation::None);
    let model_config = DqnModelConfig::default()
        .q_config(mlp_config)
        .opt_config(OptimizerConfig::Adam {
            lr: args.learning_rate,
        });
    let explorer = EpsilonGreedy::new(
        ExplorationSchedule::Exponential {
            eps_start: args.eps_start,
            eps_end: args.eps_end,
            decay: args.eps_decay,
        },
        args.seed,
    );

    DqnConfig::default()
        .model_config(model_config)
        .batch_size(args.batch_size)
        .discount_factor(args.gamma)
        .double_dqn(false)
        .sync(SyncPolicy::Soft { tau: args.tau })
        .critic_loss(CriticLoss::SmoothL1)
        .explorer(explorer)
        .device(Device::Cpu)
}

fn create_buffer_config(args: &Args, env_config: &CatchConfig) -> FrameStackReplayBufferConfig {
    FrameStackReplayBufferConfig::default()
        .capacity(args.buffer_size)
        .seed(args.seed)
        .stack(env_config.stack)
        .frame_shape(env_config.frame_shape())
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

fn train(args: &Args) -> Result<()> {
    let run_dir = run_dir(&args.runs_dir, "dqn_catch")?;
    let env_config = create_env_config();
    let agent_config = create_agent_config(args, &env_config);
    let buffer_config = create_buffer_config(args, &env_config);
    let trainer_config = create_trainer_config(args, &run_dir.join("model"));
    env_config.save(run_dir.join("env.yaml"))?;
    agent_config.save(run_dir.join("agent.yaml"))?;
    buffer_config.save(run_dir.join("replay_buffer.yaml"))?;
    trainer_config.save(run_dir.join("trainer.yaml"))?;

    let mut recorder: Box<dyn AggregateRecorder> = Box::new(TensorboardRecorder::new(&run_dir));
    let mut trainer = Trainer::build(trainer_config);
    let env = Env::build(&env_config, args.seed as i64)?;
    let step_proc = StepProc::build(&FrameStackStepProcessorConfig::default());
    let mut agent = Dqn::<Env, Mlp, ReplayBuffer>::build(agent_config)?;
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
    let env_config = create_env_config();
    let mut agent = Dqn::<Env, Mlp, ReplayBuffer>::build(create_agent_config(args, &env_config))?;
    agent.load_params(model_dir)?;
    agent.eval();

    let env = Env::build(&env_config, args.seed as i64 + 2)?;
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
