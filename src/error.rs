//! Error taxonomy for the synthesis pipeline

use crate::parser::ParseError;
use std::io;
use thiserror::Error;

/// Pipeline stage that talked to an oracle, used in error reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    Sampling,
    Verification,
    Localization,
    Repair,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Preprocess => write!(f, "preprocess"),
            Stage::Sampling => write!(f, "sampling"),
            Stage::Verification => write!(f, "verification"),
            Stage::Localization => write!(f, "localization"),
            Stage::Repair => write!(f, "repair"),
        }
    }
}

/// Everything that can abort a synthesis run
///
/// Running out of repair iterations is not an error; it is reported through
/// [`crate::synth::SynthStatus::NonConvergence`].
#[derive(Debug, Error)]
pub enum SynthError {
    /// Malformed input
    #[error("format error: {0}")]
    Format(#[from] ParseError),

    /// An external call exceeded its wall-clock budget
    #[error("{stage} oracle timed out")]
    OracleTimeout { stage: Stage },

    /// An oracle produced no usable result
    #[error("{stage} oracle failed: {reason}")]
    OracleFailure { stage: Stage, reason: String },

    /// The dependency graph could not be ordered consistently
    #[error("scheduling invariant violated: {0}")]
    SchedulingInvariant(String),

    /// Fault localization produced an impossible result
    #[error("localization invariant violated: {0}")]
    LocalizationInvariant(String),

    /// Inconsistent configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SynthError {
    pub fn oracle_failure(stage: Stage, reason: impl Into<String>) -> Self {
        SynthError::OracleFailure {
            stage,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SynthError>;
