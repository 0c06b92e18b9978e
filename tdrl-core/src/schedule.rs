//! Exploration schedules.
//!
//! A schedule maps the global environment step to an exploration value, the
//! probability of a random action for epsilon-greedy selection or the scale of
//! Gaussian noise for continuous actions. The step is passed explicitly, so a
//! schedule has no internal state.
use serde::{Deserialize, Serialize};

/// Exploration value as a function of the global environment step.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum ExplorationSchedule {
    /// `eps_end + (eps_start - eps_end) * exp(-step / decay)`.
    Exponential {
        /// Value at step 0.
        eps_start: f64,

        /// Asymptotic value.
        eps_end: f64,

        /// Decay constant in environment steps.
        decay: f64,
    },

    /// Linear interpolation from `eps_start` at step 0 to `eps_end` at `final_step`,
    /// constant afterwards.
    Linear {
        /// Value at step 0.
        eps_start: f64,

        /// Value at and after `final_step`.
        eps_end: f64,

        /// Step at which `eps_end` is reached.
        final_step: usize,
    },

    /// A fixed value.
    Constant(f64),
}

impl Default for ExplorationSchedule {
    fn default() -> Self {
        Self::Exponential {
            eps_start: 1.0,
            eps_end: 0.05,
            decay: 50_000.0,
        }
    }
}

impl ExplorationSchedule {
    /// Returns the exploration value at the given step.
    pub fn value_at(&self, step: usize) -> f64 {
        match self {
            Self::Exponential {
                eps_start,
                eps_end,
                decay,
            } => {
                if *decay <= 0.0 {
                    return if step == 0 { *eps_start } else { *eps_end };
                }
                eps_end + (eps_start - eps_end) * (-(step as f64) / decay).exp()
            }
            Self::Linear {
                eps_start,
                eps_end,
                final_step,
            } => {
                if step >= *final_step {
                    *eps_end
                } else {
                    let frac = step as f64 / *final_step as f64;
                    eps_start + (eps_end - eps_start) * frac
                }
            }
            Self::Constant(v) => *v,
        }
    }

    /// Sets the start value, does nothing for [`ExplorationSchedule::Constant`].
    pub fn eps_start(mut self, v: f64) -> Self {
        match &mut self {
            Self::Exponential { eps_start, .. } | Self::Linear { eps_start, .. } => *eps_start = v,
            Self::Constant(_) => {}
        }
        self
    }

    /// Sets the final value, does nothing for [`ExplorationSchedule::Constant`].
    pub fn eps_end(mut self, v: f64) -> Self {
        match &mut self {
            Self::Exponential { eps_end, .. } | Self::Linear { eps_end, .. } => *eps_end = v,
            Self::Constant(_) => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::ExplorationSchedule;

    fn exponential() -> ExplorationSchedule {
        ExplorationSchedule::Exponential {
            eps_start: 1.0,
            eps_end: 0.05,
            decay: 50_000.0,
        }
    }

    #[test]
    fn test_exponential_values() {
        let s = exponential();
        assert!((s.value_at(0) - 1.0).abs() < 1e-12);
        let expected = 0.05 + 0.95 / std::f64::consts::E;
        assert!((s.value_at(50_000) - expected).abs() < 1e-9);
        assert!((s.value_at(50_000) - 0.399).abs() < 1e-3);
    }

    #[test]
    fn test_exponential_monotone_and_bounded() {
        let s = exponential();
        let mut prev = s.value_at(0);
        for step in (0..2_000_000).step_by(997) {
            let v = s.value_at(step);
            assert!(v <= prev);
            assert!(v >= 0.05 && v <= 1.0);
            prev = v;
        }
        assert!((s.value_at(5_000_000) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_linear() {
        let s = ExplorationSchedule::Linear {
            eps_start: 1.0,
            eps_end: 0.1,
            final_step: 100,
        };
        assert_eq!(s.value_at(0), 1.0);
        assert!((s.value_at(50) - 0.55).abs() < 1e-12);
        assert_eq!(s.value_at(100), 0.1);
        assert_eq!(s.value_at(1_000), 0.1);
    }

    #[test]
    fn test_constant_and_setters() {
        let s = ExplorationSchedule::Constant(0.1).eps_start(0.5);
        assert_eq!(s.value_at(0), 0.1);
        assert_eq!(s.value_at(1_000_000), 0.1);

        let s = exponential().eps_start(0.5).eps_end(0.0);
        assert_eq!(s.value_at(0), 0.5);
    }

    #[test]
    fn test_yaml() {
        let s = exponential();
        let yaml = serde_yaml::to_string(&s).unwrap();
        let s_: ExplorationSchedule = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(s, s_);
    }
}
