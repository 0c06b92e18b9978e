//! Catching a falling ball, observed as pixels.
use crate::{DiscreteAct, FrameObs};
use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tdrl_core::{record::Record, yaml, ActionSpace, Env, Step};

/// Configuration of [`Catch`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CatchConfig {
    /// Height of the screen.
    pub height: usize,

    /// Width of the screen.
    pub width: usize,

    /// The number of stacked frames in an observation.
    pub stack: usize,
}

impl Default for CatchConfig {
    fn default() -> Self {
        Self {
            height: 10,
            width: 5,
            stack: 4,
        }
    }
}

impl CatchConfig {
    /// Sets the height of the screen.
    pub fn height(mut self, v: usize) -> Self {
        self.height = v;
        self
    }

    /// Sets the width of the screen.
    pub fn width(mut self, v: usize) -> Self {
        self.width = v;
        self
    }

    /// Sets the number of stacked frames.
    pub fn stack(mut self, v: usize) -> Self {
        self.stack = v;
        self
    }

    /// Shape of a frame, `[height, width]`.
    pub fn frame_shape(&self) -> Vec<usize> {
        vec![self.height, self.width]
    }

    /// Loads [`CatchConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        yaml::load(path)
    }

    /// Saves [`CatchConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        yaml::save(self, path)
    }
}

/// A ball falls one row per step from a random column of the top row.
///
/// The paddle on the bottom row moves left (action 0), stays (action 1) or
/// moves right (action 2). When the ball reaches the bottom row the episode
/// terminates with reward 1 if the paddle is under the ball and -1 otherwise.
/// Other steps give reward 0.
///
/// Pixels of the ball and the paddle are 255, the others 0. The observation
/// stacks the latest `stack` frames. At reset, the initial frame is repeated.
pub struct Catch {
    height: usize,
    width: usize,
    stack: usize,
    ball: (usize, usize),
    paddle: usize,
    obs: FrameObs,
    rng: StdRng,
}

impl Catch {
    fn frame(&self) -> Vec<u8> {
        let mut frame = vec![0u8; self.height * self.width];
        let (row, col) = self.ball;
        frame[row * self.width + col] = 255;
        frame[(self.height - 1) * self.width + self.paddle] = 255;
        frame
    }
}

impl Env for Catch {
    type Config = CatchConfig;
    type Obs = FrameObs;
    type Act = DiscreteAct;
    type Info = ();

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        if config.height < 2 || config.width == 0 || config.stack == 0 {
            bail!("Invalid configuration of Catch: {:?}", config);
        }
        let mut env = Self {
            height: config.height,
            width: config.width,
            stack: config.stack,
            ball: (0, 0),
            paddle: config.width / 2,
            obs: FrameObs::repeat(&[], 0, 0, 0),
            rng: StdRng::seed_from_u64(seed as u64),
        };
        env.obs = FrameObs::repeat(&env.frame(), env.stack, env.height, env.width);
        Ok(env)
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::Discrete { n: 3 }
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<FrameObs> {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.ball = (0, self.rng.gen_range(0..self.width));
        self.paddle = self.width / 2;
        self.obs = FrameObs::repeat(&self.frame(), self.stack, self.height, self.width);
        Ok(self.obs.clone())
    }

    fn step(&mut self, a: &DiscreteAct) -> Result<(Step<Self>, Record)> {
        self.action_space().check_discrete(a.0)?;

        self.paddle = match a.0 {
            0 => self.paddle.saturating_sub(1),
            2 => (self.paddle + 1).min(self.width - 1),
            _ => self.paddle,
        };
        self.ball.0 = (self.ball.0 + 1).min(self.height - 1);
        let frame = self.frame();
        self.obs.push_frame(&frame);

        let is_terminated = self.ball.0 == self.height - 1;
        let reward = match (is_terminated, self.ball.1 == self.paddle) {
            (false, _) => 0.0,
            (true, true) => 1.0,
            (true, false) => -1.0,
        };
        let step = Step::new(
            self.obs.clone(),
            *a,
            vec![reward],
            vec![is_terminated as i8],
            vec![0],
            (),
            None,
        );

        Ok((step, Record::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tdrl_core::replay_buffer::LatestFrame;

    fn ball_col(obs: &FrameObs) -> usize {
        let frame = obs.latest_frame();
        frame[..obs.width]
            .iter()
            .position(|v| *v == 255)
            .unwrap_or(usize::MAX)
    }

    #[test]
    fn test_reset_repeats_initial_frame() -> Result<()> {
        let mut env = Catch::build(&CatchConfig::default(), 0)?;
        let obs = env.reset(None)?;
        assert_eq!(obs.frames.len(), 4 * 10 * 5);
        let n = 10 * 5;
        for i in 1..4 {
            assert_eq!(obs.frames[..n], obs.frames[i * n..(i + 1) * n]);
        }
        assert_eq!(obs.frames.iter().filter(|v| **v == 255).count(), 4 * 2);
        Ok(())
    }

    #[test]
    fn test_following_the_ball_catches_it() -> Result<()> {
        let mut env = Catch::build(&CatchConfig::default(), 0)?;
        for seed in 0..5 {
            let obs = env.reset(Some(seed))?;
            let col = ball_col(&obs);
            let mut ret = 0.0;
            for t in 1..10 {
                let a = match env.paddle {
                    p if p < col => 2,
                    p if p > col => 0,
                    _ => 1,
                };
                let (step, _) = env.step(&DiscreteAct(a))?;
                ret += step.reward[0];
                assert_eq!(step.is_terminated[0] == 1, t == 9);
            }
            assert_eq!(ret, 1.0);
        }
        Ok(())
    }

    #[test]
    fn test_missing_the_ball() -> Result<()> {
        let config = CatchConfig::default().width(3).height(4);
        let mut env = Catch::build(&config, 0)?;
        let obs = env.reset(Some(1))?;
        let col = ball_col(&obs);
        let a = if col == 0 { 2 } else { 0 };
        let mut ret = 0.0;
        for _ in 0..3 {
            ret += env.step(&DiscreteAct(a))?.0.reward[0];
        }
        assert_eq!(ret, -1.0);
        Ok(())
    }

    #[test]
    fn test_invalid_action() -> Result<()> {
        let mut env = Catch::build(&CatchConfig::default(), 0)?;
        env.reset(None)?;
        assert!(env.step(&DiscreteAct(3)).is_err());
        Ok(())
    }
}
