//! Action spaces.
use crate::error::TdrlError;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The set of valid actions of an environment.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum ActionSpace {
    /// Actions are integers in `0..n`.
    Discrete {
        /// The number of actions.
        n: usize,
    },

    /// Actions are real vectors in the box `[low, high]`.
    Continuous {
        /// Lower bounds of each dimension.
        low: Vec<f32>,

        /// Upper bounds of each dimension.
        high: Vec<f32>,
    },
}

impl ActionSpace {
    /// Returns the number of discrete actions or the dimension of continuous actions.
    pub fn dim(&self) -> usize {
        match self {
            Self::Discrete { n } => *n,
            Self::Continuous { low, .. } => low.len(),
        }
    }

    /// Checks a discrete action.
    pub fn check_discrete(&self, a: usize) -> Result<(), TdrlError> {
        match self {
            Self::Discrete { n } if a < *n => Ok(()),
            Self::Discrete { n } => Err(TdrlError::InvalidAction(format!(
                "discrete action {} is out of 0..{}",
                a, n
            ))),
            Self::Continuous { .. } => Err(TdrlError::InvalidAction(
                "discrete action given to a continuous action space".to_string(),
            )),
        }
    }

    /// Checks a continuous action against the bounds.
    pub fn check_continuous(&self, a: &[f32]) -> Result<(), TdrlError> {
        match self {
            Self::Continuous { low, high } => {
                if a.len() != low.len() {
                    return Err(TdrlError::InvalidAction(format!(
                        "expected an action of dimension {}, got {}",
                        low.len(),
                        a.len()
                    )));
                }
                for (i, v) in a.iter().enumerate() {
                    if !v.is_finite() || *v < low[i] || *v > high[i] {
                        return Err(TdrlError::InvalidAction(format!(
                            "action[{}] = {} is out of [{}, {}]",
                            i, v, low[i], high[i]
                        )));
                    }
                }
                Ok(())
            }
            Self::Discrete { .. } => Err(TdrlError::InvalidAction(
                "continuous action given to a discrete action space".to_string(),
            )),
        }
    }

    /// Clips a continuous action into the bounds.
    ///
    /// Discrete spaces return the action as is.
    pub fn clip(&self, a: &[f32]) -> Vec<f32> {
        match self {
            Self::Continuous { low, high } => a
                .iter()
                .zip(low.iter().zip(high.iter()))
                .map(|(v, (l, h))| v.max(*l).min(*h))
                .collect(),
            Self::Discrete { .. } => a.to_vec(),
        }
    }

    /// Half width of the box, `(high - low) / 2`.
    pub fn scale(&self) -> Vec<f32> {
        match self {
            Self::Continuous { low, high } => low
                .iter()
                .zip(high.iter())
                .map(|(l, h)| (h - l) / 2.0)
                .collect(),
            Self::Discrete { .. } => vec![],
        }
    }

    /// Center of the box, `(high + low) / 2`.
    pub fn bias(&self) -> Vec<f32> {
        match self {
            Self::Continuous { low, high } => low
                .iter()
                .zip(high.iter())
                .map(|(l, h)| (h + l) / 2.0)
                .collect(),
            Self::Discrete { .. } => vec![],
        }
    }

    /// Samples a continuous action uniformly from the box.
    ///
    /// For discrete spaces, a single-element vector holding a uniformly sampled
    /// action index is returned.
    pub fn sample_uniform(&self, rng: &mut impl Rng) -> Vec<f32> {
        match self {
            Self::Continuous { low, high } => low
                .iter()
                .zip(high.iter())
                .map(|(l, h)| if l < h { rng.gen_range(*l..=*h) } else { *l })
                .collect(),
            Self::Discrete { n } => vec![rng.gen_range(0..*n) as f32],
        }
    }
}
