use anyhow::Result;
use std::{
    cell::{Cell, RefCell},
    path::Path,
    rc::Rc,
};
use tdrl_core::{
    error::TdrlError,
    record::{AggregateRecorder, BufferedRecorder, Record},
    replay_buffer::{
        BatchBase, SimpleReplayBuffer, SimpleReplayBufferConfig, SimpleStepProcessor,
        SimpleStepProcessorConfig,
    },
    Act, ActionSpace, Agent, DefaultEvaluator, Env, ExperienceBufferBase, Obs, Phase, Policy,
    ReplayBufferBase, Sampler, Step, StepProcessor, Trainer, TrainerConfig,
};
use tempdir::TempDir;

#[derive(Clone, Debug)]
struct ChainObs(usize);

impl Obs for ChainObs {}

#[derive(Clone, Debug)]
struct ChainAct(usize);

impl Act for ChainAct {}

/// Moves one cell per step and is truncated after `episode_length` steps.
struct Chain {
    episode_length: usize,
    t: usize,
}

impl Env for Chain {
    type Config = usize;
    type Obs = ChainObs;
    type Act = ChainAct;
    type Info = ();

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            episode_length: *config,
            t: 0,
        })
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete { n: 2 }
    }

    fn reset(&mut self, _seed: Option<u64>) -> Result<ChainObs> {
        self.t = 0;
        Ok(ChainObs(0))
    }

    fn step(&mut self, a: &ChainAct) -> Result<(Step<Self>, Record)> {
        self.action_space().check_discrete(a.0)?;
        self.t += 1;
        let is_truncated = (self.t == self.episode_length) as i8;
        let step = Step::new(
            ChainObs(self.t),
            a.clone(),
            vec![1.0],
            vec![0],
            vec![is_truncated],
            (),
            None,
        );
        Ok((step, Record::empty()))
    }
}

struct Col(Vec<f32>);

impl BatchBase for Col {
    fn new(capacity: usize) -> Self {
        Self(vec![0.0; capacity])
    }

    fn push(&mut self, ix: usize, data: Self) -> Result<()> {
        let capacity = self.0.len();
        for (j, v) in data.0.into_iter().enumerate() {
            self.0[(ix + j) % capacity] = v;
        }
        Ok(())
    }

    fn sample(&self, ixs: &[usize]) -> Result<Self> {
        Ok(Self(ixs.iter().map(|&ix| self.0[ix]).collect()))
    }
}

impl From<ChainObs> for Col {
    fn from(obs: ChainObs) -> Self {
        Self(vec![obs.0 as f32])
    }
}

impl From<ChainAct> for Col {
    fn from(act: ChainAct) -> Self {
        Self(vec![act.0 as f32])
    }
}

type Buffer = SimpleReplayBuffer<Col, Col>;
type StepProc = SimpleStepProcessor<Chain, Col, Col>;

#[derive(Default)]
struct CountingAgent {
    is_train: bool,
    batch_size: usize,
    invalid_action_at: Option<usize>,
    explore_steps: Vec<usize>,

    /// Pairs of the environment step and the buffer size at optimization steps.
    opt_log: Vec<(usize, usize)>,
}

impl Policy<Chain> for CountingAgent {
    fn sample(&mut self, _obs: &ChainObs) -> Result<ChainAct> {
        Ok(ChainAct(1))
    }
}

impl Agent<Chain, Buffer> for CountingAgent {
    fn train(&mut self) {
        self.is_train = true;
    }

    fn eval(&mut self) {
        self.is_train = false;
    }

    fn is_train(&self) -> bool {
        self.is_train
    }

    fn explore(&mut self, _obs: &ChainObs, env_steps: usize) -> Result<(ChainAct, Record)> {
        assert!(self.is_train);
        self.explore_steps.push(env_steps);
        let a = match self.invalid_action_at {
            Some(ix) if ix == env_steps => 2,
            _ => env_steps % 2,
        };
        Ok((ChainAct(a), Record::from_scalar("eps", 0.5)))
    }

    fn opt_with_record(&mut self, buffer: &mut Buffer) -> Result<Record> {
        let batch = buffer.batch(self.batch_size)?;
        let env_steps = self.explore_steps[self.explore_steps.len() - 1];
        self.opt_log.push((env_steps, buffer.len()));
        Ok(Record::from_scalar(
            "loss_critic",
            batch.reward.iter().sum::<f32>(),
        ))
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        std::fs::write(path.join("params.txt"), "params")?;
        Ok(())
    }

    fn load_params(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct SharedRecorder(Rc<RefCell<BufferedRecorder>>);

impl AggregateRecorder for SharedRecorder {
    fn store(&mut self, record: Record) {
        self.0.borrow_mut().store(record);
    }

    fn flush(&mut self, step: i64) {
        self.0.borrow_mut().flush(step);
    }
}

fn run(config: TrainerConfig, agent: &mut CountingAgent) -> Result<(Buffer, Vec<Record>)> {
    let env = Chain::build(&5, 0)?;
    let step_proc = StepProc::build(&SimpleStepProcessorConfig::default());
    let mut buffer = Buffer::build(&SimpleReplayBufferConfig::default().capacity(100));
    let shared = SharedRecorder::default();
    let mut recorder: Box<dyn AggregateRecorder> = Box::new(shared.clone());
    let mut evaluator = DefaultEvaluator::new(Chain::build(&5, 1)?, 2)?;

    let mut trainer = Trainer::build(config);
    trainer.train(
        env,
        step_proc,
        agent,
        &mut buffer,
        &mut recorder,
        &mut evaluator,
    )?;

    let records = shared.0.borrow().iter().cloned().collect();
    Ok((buffer, records))
}

#[test]
fn test_phase() {
    let trainer = Trainer::build(TrainerConfig::default().warmup_period(10).opt_interval(3));
    assert_eq!(trainer.phase(0), Phase::Warmup);
    assert_eq!(trainer.phase(9), Phase::Warmup);
    assert_eq!(trainer.phase(10), Phase::Training);
    assert!(!trainer.is_opt_step(9));
    assert!(!trainer.is_opt_step(10));
    assert!(trainer.is_opt_step(12));
}

#[test]
fn test_warmup_then_training() -> Result<()> {
    let dir = TempDir::new("trainer_phases")?;
    let model_dir = dir.path().join("model");
    let config = TrainerConfig::default()
        .total_timesteps(30)
        .warmup_period(10)
        .opt_interval(3)
        .eval_interval(10)
        .save_interval(15)
        .flush_record_interval(10)
        .model_dir(model_dir.to_string_lossy());
    let mut agent = CountingAgent {
        batch_size: 4,
        ..Default::default()
    };

    let (buffer, records) = run(config, &mut agent)?;

    // The global step is passed to the agent in order.
    assert_eq!(agent.explore_steps, (0..30).collect::<Vec<_>>());

    // No optimization step during warmup.
    assert_eq!(
        agent.opt_log,
        vec![(12, 13), (15, 16), (18, 19), (21, 22), (24, 25), (27, 28)]
    );
    assert_eq!(buffer.len(), 30);

    // Records are flushed every 10 environment steps.
    assert_eq!(records.len(), 3);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.get_scalar("env_steps")?, (10 * (i + 1)) as f32);
        assert_eq!(record.get_scalar("eval_return")?, 5.0);
        assert_eq!(record.get_scalar("episode_return_mean")?, 5.0);
        assert_eq!(record.get_scalar("episode_length_max")?, 5.0);
    }
    assert!(records[0].get_scalar("loss_critic_mean").is_err());
    assert!(records[1].get_scalar("loss_critic_mean").is_ok());

    assert!(model_dir.join("best").join("params.txt").exists());
    assert!(model_dir.join("15").join("params.txt").exists());
    assert!(model_dir.join("30").join("params.txt").exists());
    Ok(())
}

#[test]
fn test_invalid_action_is_fatal() -> Result<()> {
    let config = TrainerConfig::default().total_timesteps(30);
    let mut agent = CountingAgent {
        batch_size: 1,
        invalid_action_at: Some(7),
        ..Default::default()
    };

    let err = run(config, &mut agent).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<TdrlError>(),
        Some(TdrlError::InvalidAction(_))
    ));
    assert_eq!(agent.explore_steps.len(), 8);
    Ok(())
}

#[test]
fn test_insufficient_data_is_fatal() -> Result<()> {
    let config = TrainerConfig::default().total_timesteps(30);
    let mut agent = CountingAgent {
        batch_size: 4,
        ..Default::default()
    };

    let err = run(config, &mut agent).err().unwrap();
    assert_eq!(
        err.downcast_ref::<TdrlError>(),
        Some(&TdrlError::InsufficientData {
            requested: 4,
            available: 1
        })
    );
    Ok(())
}

/// Counts calls of [`StepProcessor::reset`] and keeps the processed transitions.
struct RecordingStepProc {
    inner: StepProc,
    n_resets: Rc<Cell<usize>>,
    obs: Rc<RefCell<Vec<f32>>>,
}

impl StepProcessor<Chain> for RecordingStepProc {
    type Config = SimpleStepProcessorConfig;
    type Output = <StepProc as StepProcessor<Chain>>::Output;

    fn build(config: &Self::Config) -> Self {
        Self {
            inner: StepProc::build(config),
            n_resets: Rc::default(),
            obs: Rc::default(),
        }
    }

    fn reset(&mut self, init_obs: ChainObs) -> Result<()> {
        self.n_resets.set(self.n_resets.get() + 1);
        self.inner.reset(init_obs)
    }

    fn process(&mut self, step: Step<Chain>) -> Result<Self::Output> {
        let transition = self.inner.process(step)?;
        self.obs.borrow_mut().push(transition.obs.0[0]);
        Ok(transition)
    }
}

#[test]
fn test_episode_boundary_resets_step_processor_once() -> Result<()> {
    let step_proc = RecordingStepProc::build(&SimpleStepProcessorConfig::default());
    let n_resets = step_proc.n_resets.clone();
    let obs = step_proc.obs.clone();
    let mut sampler = Sampler::new(Chain::build(&3, 0)?, step_proc);
    let mut buffer = Buffer::build(&SimpleReplayBufferConfig::default().capacity(100));
    let mut agent = CountingAgent::default();

    let mut episode_lengths = vec![];
    for env_steps in 0..7 {
        let record = sampler.sample_and_push(&mut agent, &mut buffer, env_steps)?;
        if let Ok(l) = record.get_scalar("episode_length") {
            episode_lengths.push(l);
        }
    }

    // Transitions after an episode end start from the initial observation.
    assert_eq!(*obs.borrow(), vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0]);
    assert_eq!(n_resets.get(), 1);
    assert_eq!(episode_lengths, vec![3.0, 3.0]);
    assert_eq!(buffer.len(), 7);
    Ok(())
}
