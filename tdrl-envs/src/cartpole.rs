//! Cart-pole balancing.
use crate::{DiscreteAct, VecObs};
use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tdrl_core::{record::Record, yaml, ActionSpace, Env, Step};

const GRAVITY: f32 = 9.8;
const MASS_CART: f32 = 1.0;
const MASS_POLE: f32 = 0.1;
const TOTAL_MASS: f32 = MASS_CART + MASS_POLE;
const HALF_LENGTH: f32 = 0.5;
const POLE_MASS_LENGTH: f32 = MASS_POLE * HALF_LENGTH;
const FORCE_MAG: f32 = 10.0;
const TAU: f32 = 0.02;
const THETA_THRESHOLD: f32 = 12.0 * 2.0 * std::f32::consts::PI / 360.0;
const X_THRESHOLD: f32 = 2.4;

/// Configuration of [`CartPole`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CartPoleConfig {
    /// Episodes are truncated after this number of steps.
    pub max_steps: usize,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self { max_steps: 500 }
    }
}

impl CartPoleConfig {
    /// Sets the number of steps after which episodes are truncated.
    pub fn max_steps(mut self, v: usize) -> Self {
        self.max_steps = v;
        self
    }

    /// Loads [`CartPoleConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        yaml::load(path)
    }

    /// Saves [`CartPoleConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        yaml::save(self, path)
    }
}

/// A pole attached to a cart moving along a frictionless track.
///
/// The observation is `[x, x_dot, theta, theta_dot]`. Action 0 pushes the cart
/// to the left, action 1 to the right. The reward is 1 for every step. The
/// episode terminates when the pole tilts more than 12 degrees or the cart
/// leaves `[-2.4, 2.4]`.
pub struct CartPole {
    state: [f32; 4],
    t: usize,
    max_steps: usize,
    rng: StdRng,
}

impl CartPole {
    fn obs(&self) -> VecObs {
        VecObs(self.state.to_vec())
    }

    fn is_terminated(&self) -> bool {
        let [x, _, theta, _] = self.state;
        x.abs() > X_THRESHOLD || theta.abs() > THETA_THRESHOLD
    }
}

impl Env for CartPole {
    type Config = CartPoleConfig;
    type Obs = VecObs;
    type Act = DiscreteAct;
    type Info = ();

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        Ok(Self {
            state: [0.0; 4],
            t: 0,
            max_steps: config.max_steps,
            rng: StdRng::seed_from_u64(seed as u64),
        })
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete { n: 2 }
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<VecObs> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        for s in self.state.iter_mut() {
            *s = self.rng.gen_range(-0.05..0.05);
        }
        self.t = 0;
        Ok(self.obs())
    }

    fn step(&mut self, a: &DiscreteAct) -> Result<(Step<Self>, Record)> {
        self.action_space().check_discrete(a.0)?;

        let [x, x_dot, theta, theta_dot] = self.state;
        let force = if a.0 == 1 { FORCE_MAG } else { -FORCE_MAG };
        let (sin, cos) = theta.sin_cos();
        let temp = (force + POLE_MASS_LENGTH * theta_dot * theta_dot * sin) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin - cos * temp)
            / (HALF_LENGTH * (4.0 / 3.0 - MASS_POLE * cos * cos / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos / TOTAL_MASS;

        self.state = [
            x + TAU * x_dot,
            x_dot + TAU * x_acc,
            theta + TAU * theta_dot,
            theta_dot + TAU * theta_acc,
        ];
        self.t += 1;

        let is_terminated = self.is_terminated();
        let is_truncated = !is_terminated && self.t >= self.max_steps;
        let step = Step::new(
            self.obs(),
            *a,
            vec![1.0],
            vec![is_terminated as i8],
            vec![is_truncated as i8],
            (),
            None,
        );

        Ok((step, Record::empty()))
    }
}
