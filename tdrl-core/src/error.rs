//! Errors in the library.
use thiserror::Error;

/// Errors raised by transition stores, environments, agents and records.
#[derive(Error, Debug, PartialEq)]
pub enum TdrlError {
    /// A batch was requested before the store held enough valid transitions.
    #[error("Insufficient data: requested {requested} samples, {available} available")]
    InsufficientData {
        /// Requested batch size.
        requested: usize,

        /// Number of transitions that can be sampled.
        available: usize,
    },

    /// An action outside of the declared action space reached an environment.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// A loss became NaN or infinite.
    #[error("Non-finite loss {name}: {value}")]
    NonFiniteLoss {
        /// Name of the loss.
        name: String,

        /// The offending value.
        value: f32,
    },

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}

impl TdrlError {
    /// Returns [`TdrlError::NonFiniteLoss`] if `value` is NaN or infinite.
    pub fn check_finite(name: &str, value: f32) -> Result<f32, Self> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self::NonFiniteLoss {
                name: name.to_string(),
                value,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TdrlError;

    #[test]
    fn test_check_finite() {
        assert_eq!(TdrlError::check_finite("loss", 0.5), Ok(0.5));
        assert!(matches!(
            TdrlError::check_finite("loss", f32::NAN),
            Err(TdrlError::NonFiniteLoss { .. })
        ));
        assert!(TdrlError::check_finite("loss", f32::INFINITY).is_err());
    }
}
