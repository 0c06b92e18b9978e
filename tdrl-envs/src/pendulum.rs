//! Pendulum swing-up.
use crate::{ContinuousAct, VecObs};
use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{f32::consts::PI, path::Path};
use tdrl_core::{record::Record, yaml, ActionSpace, Env, Step};

const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const MASS: f32 = 1.0;
const LENGTH: f32 = 1.0;

/// Configuration of [`Pendulum`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PendulumConfig {
    /// Episodes are truncated after this number of steps.
    pub max_steps: usize,

    /// Gravitational acceleration.
    pub g: f32,
}

impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            max_steps: 200,
            g: 10.0,
        }
    }
}

impl PendulumConfig {
    /// Sets the number of steps after which episodes are truncated.
    pub fn max_steps(mut self, v: usize) -> Self {
        self.max_steps = v;
        self
    }

    /// Sets the gravitational acceleration.
    pub fn g(mut self, v: f32) -> Self {
        self.g = v;
        self
    }

    /// Loads [`PendulumConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        yaml::load(path)
    }

    /// Saves [`PendulumConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        yaml::save(self, path)
    }
}

fn angle_normalize(x: f32) -> f32 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}

/// An inverted pendulum to be swung up and kept upright.
///
/// The observation is `[cos(theta), sin(theta), theta_dot]` and the action is
/// the torque in `[-2, 2]`. The reward is
/// `-(theta^2 + 0.1 * theta_dot^2 + 0.001 * torque^2)` with `theta` normalized
/// into `[-pi, pi)`, so it is at most 0. Episodes never terminate and are
/// truncated after `max_steps` steps.
pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
    t: usize,
    max_steps: usize,
    g: f32,
    rng: StdRng,
}

impl Pendulum {
    fn obs(&self) -> VecObs {
        VecObs(vec![self.theta.cos(), self.theta.sin(), self.theta_dot])
    }
}

impl Env for Pendulum {
    type Config = PendulumConfig;
    type Obs = VecObs;
    type Act = ContinuousAct;
    type Info = ();

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        Ok(Self {
            theta: 0.0,
            theta_dot: 0.0,
            t: 0,
            max_steps: config.max_steps,
            g: config.g,
            rng: StdRng::seed_from_u64(seed as u64),
        })
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Continuous {
            low: vec![-MAX_TORQUE],
            high: vec![MAX_TORQUE],
        }
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<VecObs> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.theta = self.rng.gen_range(-PI..PI);
        self.theta_dot = self.rng.gen_range(-1.0..1.0);
        self.t = 0;
        Ok(self.obs())
    }

    fn step(&mut self, a: &ContinuousAct) -> Result<(Step<Self>, Record)> {
        self.action_space().check_continuous(&a.0)?;

        let u = a.0[0];
        let (th, th_dot) = (self.theta, self.theta_dot);
        let cost = angle_normalize(th).powi(2) + 0.1 * th_dot.powi(2) + 0.001 * u.powi(2);

        let th_dot = th_dot
            + (3.0 * self.g / (2.0 * LENGTH) * th.sin() + 3.0 / (MASS * LENGTH * LENGTH) * u) * DT;
        let th_dot = th_dot.max(-MAX_SPEED).min(MAX_SPEED);
        self.theta = th + th_dot * DT;
        self.theta_dot = th_dot;
        self.t += 1;

        let is_truncated = self.t >= self.max_steps;
        let step = Step::new(
            self.obs(),
            a.clone(),
            vec![-cost],
            vec![0],
            vec![is_truncated as i8],
            (),
            None,
        );

        Ok((step, Record::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tdrl_core::error::TdrlError;
    use tempdir::TempDir;

    #[test]
    fn test_angle_normalize() {
        assert!((angle_normalize(0.5) - 0.5).abs() < 1e-6);
        assert!((angle_normalize(2.0 * PI + 0.5) - 0.5).abs() < 1e-5);
        assert!((angle_normalize(-0.5) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_episode() -> Result<()> {
        let mut env = Pendulum::build(&PendulumConfig::default(), 0)?;
        let obs = env.reset(None)?;
        assert_eq!(obs.0.len(), 3);

        for t in 1..=200 {
            let (step, _) = env.step(&ContinuousAct(vec![2.0]))?;
            assert!(step.reward[0] <= 0.0);
            assert_eq!(step.is_terminated, vec![0]);
            assert_eq!(step.is_truncated, vec![(t == 200) as i8]);
            let obs = &step.obs.0;
            assert!((obs[0].powi(2) + obs[1].powi(2) - 1.0).abs() < 1e-4);
            assert!(obs[2].abs() <= MAX_SPEED);
        }
        Ok(())
    }

    #[test]
    fn test_out_of_bounds_action() -> Result<()> {
        let mut env = Pendulum::build(&PendulumConfig::default(), 0)?;
        env.reset(None)?;
        for a in [vec![2.5], vec![f32::NAN], vec![0.0, 0.0]].iter() {
            let err = match env.step(&ContinuousAct(a.clone())) {
                Err(e) => e,
                Ok(_) => panic!("{:?} must be rejected", a),
            };
            assert!(matches!(
                err.downcast_ref::<TdrlError>(),
                Some(TdrlError::InvalidAction(_))
            ));
        }
        Ok(())
    }

    #[test]
    fn test_serde_pendulum_config() -> Result<()> {
        let config = PendulumConfig::default().max_steps(100).g(9.8);
        let dir = TempDir::new("pendulum_config")?;
        let path = dir.path().join("pendulum_config.yaml");
        config.save(&path)?;
        assert_eq!(config, PendulumConfig::load(&path)?);
        Ok(())
    }
}
