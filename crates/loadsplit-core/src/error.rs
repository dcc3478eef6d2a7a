use thiserror::Error;

/// Canonical error type for script measurement, splitting and scheduling.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A phase in the script matches none of the recognized phase shapes.
    #[error("phase at index {index} is not a valid phase")]
    InvalidPhase {
        /// Position of the first invalid phase in the script's phase list.
        index: usize,
    },

    /// A ramp with equal endpoints was handed to the intersection solver.
    #[error("parallel lines never intersect, detect and avoid this case")]
    ParallelLines,

    /// An operation that only applies to ramps received another phase shape.
    #[error("expected a ramp phase, got {shape}")]
    NotARamp {
        /// Shape name of the offending phase.
        shape: &'static str,
    },

    /// The rate split did not bring every piece under the limit in time.
    #[error("rate split did not converge after {rounds} rounds")]
    SplitDidNotConverge {
        /// Number of rounds attempted before giving up.
        rounds: usize,
    },

    /// Script runs longer than the configured script duration ceiling.
    #[error("script duration {duration_secs}s exceeds the limit of {limit_secs}s")]
    ScriptTooLong {
        /// Total script duration in seconds.
        duration_secs: f64,
        /// Configured ceiling in seconds.
        limit_secs: u64,
    },

    /// Script peak rate exceeds the configured script rate ceiling.
    #[error("script peak rate {requests_per_second} rps exceeds the limit of {limit} rps")]
    ScriptTooWide {
        /// Peak requests per second of the script.
        requests_per_second: f64,
        /// Configured ceiling in requests per second.
        limit: u32,
    },

    /// Validation error for settings or sampling input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Script (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl PlanError {
    /// Creates a `Validation` variant.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenient result alias for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_lines_message() {
        assert_eq!(
            PlanError::ParallelLines.to_string(),
            "parallel lines never intersect, detect and avoid this case"
        );
    }

    #[test]
    fn test_invalid_phase_reports_index_zero() {
        let err = PlanError::InvalidPhase { index: 0 };
        assert!(matches!(err, PlanError::InvalidPhase { index: 0 }));
        assert_eq!(err.to_string(), "phase at index 0 is not a valid phase");
    }

    #[test]
    fn test_serde_error_conversion() {
        let err: PlanError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, PlanError::Serialization(_)));
    }
}
