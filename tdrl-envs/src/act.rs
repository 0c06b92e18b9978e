//! Actions.
use tdrl_core::Act;

/// Index of a discrete action.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiscreteAct(pub usize);

impl Act for DiscreteAct {}

impl From<usize> for DiscreteAct {
    fn from(a: usize) -> Self {
        Self(a)
    }
}

/// Continuous action.
#[derive(Clone, Debug, PartialEq)]
pub struct ContinuousAct(pub Vec<f32>);

impl Act for ContinuousAct {}

impl From<Vec<f32>> for ContinuousAct {
    fn from(a: Vec<f32>) -> Self {
        Self(a)
    }
}
