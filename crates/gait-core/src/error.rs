//! Error handling for the gait phase toolkit
//!
//! One error type is shared by every crate in the workspace. Errors that
//! describe a malformed trial are distinguished from everything else so that
//! batch runs can skip the offending unit instead of aborting.

use thiserror::Error;

/// Result type alias for gait toolkit operations
pub type GaitResult<T> = Result<T, GaitError>;

/// Error type for all gait toolkit operations
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum GaitError {
    /// A channel required by the current operation is absent
    #[error("Missing required channel '{name}'")]
    MissingChannel {
        /// Channel name that was looked up
        name: String,
    },

    /// A channel does not share the trial's sample count
    #[error("Channel '{name}' has {actual} samples, expected {expected}")]
    ChannelLengthMismatch {
        /// Offending channel
        name: String,
        /// Sample count of the time channel
        expected: usize,
        /// Sample count found
        actual: usize,
    },

    /// Time channel is not strictly increasing
    #[error("Time channel is not strictly increasing at sample {index}")]
    NonMonotonicTime {
        /// First sample that is not greater than its predecessor
        index: usize,
    },

    /// Time channel contains NaN or infinite values
    #[error("Time channel contains a non-finite value at sample {index}")]
    NonFiniteTime {
        /// Offending sample
        index: usize,
    },

    /// Trial has no samples
    #[error("Trial contains no samples")]
    EmptyTrial,

    /// A table was given two columns with the same name
    #[error("Duplicate column '{name}'")]
    DuplicateColumn {
        /// Column name
        name: String,
    },

    /// Stride bounds do not describe a valid slice of the trial
    #[error("Invalid stride [{start}, {end}] for trial of {len} samples")]
    InvalidStride {
        /// Start sample index
        start: usize,
        /// End sample index (inclusive)
        end: usize,
        /// Trial length
        len: usize,
    },

    /// Two tables cannot be concatenated or appended
    #[error("Schema mismatch: expected columns {expected:?}, found {actual:?}")]
    SchemaMismatch {
        /// Column names of the existing table
        expected: Vec<String>,
        /// Column names of the incoming table
        actual: Vec<String>,
    },

    /// Invalid processing configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error
        reason: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {reason}")]
    Serialization {
        /// Serialization error description
        reason: String,
    },

    /// Writing output failed
    #[error("Persistence error: {reason}")]
    Persistence {
        /// Description of the write failure
        reason: String,
    },

    /// Raw trial could not be produced by the upstream loader
    #[error("Failed to load trial for subject '{subject}': {reason}")]
    Loader {
        /// Subject the loader was reading
        subject: String,
        /// Loader error description
        reason: String,
    },

    /// A background worker panicked, was cancelled or lost its pool
    #[error("Worker error: {reason}")]
    Worker {
        /// Description of the worker failure
        reason: String,
    },
}

impl GaitError {
    /// True for errors caused by the shape or content of the input trial.
    ///
    /// These are reported as a skipped unit rather than a failure.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            GaitError::MissingChannel { .. }
                | GaitError::ChannelLengthMismatch { .. }
                | GaitError::NonMonotonicTime { .. }
                | GaitError::NonFiniteTime { .. }
                | GaitError::EmptyTrial
                | GaitError::InvalidStride { .. }
        )
    }
}

impl From<std::io::Error> for GaitError {
    fn from(error: std::io::Error) -> Self {
        GaitError::Persistence {
            reason: error.to_string(),
        }
    }
}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)+) => {
        $crate::error::GaitError::InvalidConfig {
            reason: format!($($arg)+),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = GaitError::ChannelLengthMismatch {
            name: "knee_flexion_angle_ipsi_rad".to_string(),
            expected: 500,
            actual: 499,
        };
        let display = format!("{}", error);
        assert!(display.contains("knee_flexion_angle_ipsi_rad"));
        assert!(display.contains("500"));
        assert!(display.contains("499"));
    }

    #[test]
    fn test_error_equality() {
        let error1 = GaitError::MissingChannel {
            name: "time".to_string(),
        };
        let error2 = GaitError::MissingChannel {
            name: "time".to_string(),
        };
        assert_eq!(error1, error2);
    }

    #[test]
    fn test_malformed_input_classification() {
        assert!(GaitError::EmptyTrial.is_malformed_input());
        assert!(GaitError::NonMonotonicTime { index: 3 }.is_malformed_input());
        assert!(!config_error!("bad threshold {}", -1.0).is_malformed_input());
        assert!(!GaitError::Persistence { reason: "disk full".into() }.is_malformed_input());
        assert!(!GaitError::Worker { reason: "task panicked".into() }.is_malformed_input());
    }

    #[test]
    fn test_config_error_macro() {
        let error = config_error!("num_phase_points must be at least {}", 2);
        assert_eq!(
            error,
            GaitError::InvalidConfig {
                reason: "num_phase_points must be at least 2".to_string()
            }
        );
    }
}
