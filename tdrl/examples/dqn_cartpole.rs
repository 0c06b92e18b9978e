use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tdrl::util::{env_steps_to_opt_steps, run_dir};
use tdrl_candle_agent::{
    dqn::{Dqn, DqnConfig, DqnModelConfig, EpsilonGreedy},
    mlp::{Mlp, MlpConfig},
    opt::OptimizerConfig,
    sync::SyncPolicy,
    Activation, Device, TensorBatch,
};
use tdrl_core::{
    record::AggregateRecorder,
    replay_buffer::{
        SimpleReplayBuffer, SimpleReplayBufferConfig, SimpleStepProcessor,
        SimpleStepProcessorConfig,
    },
    schedule::ExplorationSchedule,
    Agent, Configurable, DefaultEvaluator, Env as _, Evaluator as _, ReplayBufferBase,
    StepProcessor, Trainer, TrainerConfig,
};
use tdrl_envs::{CartPole, CartPoleConfig};
use tdrl_tensorboard::TensorboardRecorder;

const DIM_OBS: usize = 4;
const DIM_ACT: usize = 2;
const N_EPISODES_PER_EVAL: usize = 5;

type Env = CartPole;
type StepProc = SimpleStepProcessor<Env, TensorBatch, TensorBatch>;
type ReplayBuffer = SimpleReplayBuffer<TensorBatch, TensorBatch>;
type Evaluator = DefaultEvaluator<Env>;

/// Train DQN agent with double-Q targets and hard target updates in cartpole environment
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
struct Args {
    /// Total number of environment steps
    #[arg(long, default_value_t = 500_000)]
    total_timesteps: usize,

    /// Batch size
    #[arg(long, default_value_t = 128)]
    batch_size: usize,

    /// Capacity of the replay buffer
    #[arg(long, default_value_t = 10_000)]
    buffer_size: usize,

    /// Learning rate
    #[arg(long, default_value_t = 2.5e-4)]
    learning_rate: f64,

    /// Units of the hidden layers
    #[arg(long, value_delimiter = ',', default_value = "64,64")]
    list_layer: Vec<usize>,

    /// Discount factor
    #[arg(long, default_value_t = 0.99)]
    gamma: f64,

    /// Initial probability of random actions
    #[arg(long, default_value_t = 1.0)]
    eps_start: f64,

    /// Asymptotic probability of random actions
    #[arg(long, default_value_t = 0.05)]
    eps_end: f64,

    /// Decay constant of the probability of random actions in environment steps
    #[arg(long, default_value_t = 50_000.0)]
    eps_decay: f64,

    /// Interval of target network updates in environment steps
    #[arg(long, default_value_t = 500)]
    target_network_frequency: usize,

    /// Environment steps before the first optimization step
    #[arg(long, default_value_t = 10_000)]
    learning_start: usize,

    /// Interval of optimization steps in environment steps
    #[arg(long, default_value_t = 10)]
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

fn create_env_config() -> CartPoleConfig {
    CartPoleConfig::default()
}

fn create_agent_config(args: &Args) -> DqnConfig<MlpConfig> {
    let mlp_config = MlpConfig::new(DIM_OBS, args.list_layer.clone(), DIM_ACT, Activation::None);
    let model_config = DqnModelConfig::default()
        .q_config(mlp_config)
        .opt_config(OptimizerConfig::Adam {
            lr: args.learning_rate,
        });
    let interval = env_steps_to_opt_steps(args.target_network_frequency, args.train_frequency);
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
        .double_dqn(true)
        .sync(SyncPolicy::Hard { interval })
        .explorer(explorer)
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

fn train(args: &Args) -> Result<()> {
    let run_dir = run_dir(&args.runs_dir, "dqn_cartpole")?;
    let env_config = create_env_config();
    let agent_config = create_agent_config(args);
    let trainer_config = create_trainer_config(args, &run_dir.join("model"));
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
    let mut agent = Dqn::<Env, Mlp, ReplayBuffer>::build(create_agent_config(args))?;
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
