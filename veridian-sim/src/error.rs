use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors generated in `veridian-sim`.
///
/// The simulation itself never fails: these only describe configuration input
/// that was rejected, or a controller used outside of a Tokio runtime.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Error)]
pub enum SimError {
    #[error("failed to parse timing override: {0}")]
    OverrideParse(String),

    #[error("invalid timing override field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("SimulationController requires a running Tokio runtime")]
    RuntimeUnavailable,
}

impl SimError {
    /// Construct a [`SimError::InvalidField`].
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Determine if the caller can carry on with default configuration.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_recoverable(&self) -> bool {
        match self {
            SimError::RuntimeUnavailable => false,
            _ => true,
        }
    }
}

impl From<serde_json::Error> for SimError {
    fn from(value: serde_json::Error) -> Self {
        Self::OverrideParse(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_error_is_recoverable() {
        struct TestCase {
            input: SimError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: recoverable w/ SimError::OverrideParse
                input: SimError::OverrideParse("expected value at line 1".to_string()),
                expected: true,
            },
            TestCase {
                // TC1: recoverable w/ SimError::InvalidField
                input: SimError::invalid_field("variance", "must be finite"),
                expected: true,
            },
            TestCase {
                // TC2: not recoverable w/ SimError::RuntimeUnavailable
                input: SimError::RuntimeUnavailable,
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_recoverable();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_sim_error_from_serde_json() {
        let error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(SimError::from(error), SimError::OverrideParse(_)));
    }
}
