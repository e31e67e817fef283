//! Oracle interfaces: sampler, equivalence verifier, MaxSAT solver and the
//! constant-function detector
//!
//! The synthesis engine only sees these traits. Each has an in-process
//! backend built on z3 and an external-process backend that exchanges DIMACS
//! style text with a user supplied binary.

pub mod dimacs;
pub mod maxsat;
pub mod process;
pub mod sampler;
pub mod verifier;

use crate::error::{Stage, SynthError};
use crate::ir::{Clause, Formula, Var};
use crate::semantics::equivalence::ErrorFormula;
use crate::semantics::state::Assignment;
use std::collections::BTreeMap;
use std::io;
use thiserror::Error;

pub use maxsat::{ExternalMaxSat, Z3MaxSat};
pub use process::CommandTemplate;
pub use sampler::{ExternalSampler, Z3Sampler};
pub use verifier::ExternalVerifier;

/// Failure of a single oracle call
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("timed out")]
    Timeout,
    #[error("{0}")]
    Failure(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl OracleError {
    /// Attach the calling stage
    pub fn at(self, stage: Stage) -> SynthError {
        match self {
            OracleError::Timeout => SynthError::OracleTimeout { stage },
            OracleError::Failure(reason) => SynthError::OracleFailure { stage, reason },
            OracleError::Io(err) => SynthError::OracleFailure {
                stage,
                reason: err.to_string(),
            },
        }
    }
}

/// Sampling distribution requested from the sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    Uniform,
    Weighted,
}

/// A request for satisfying assignments of `formula`
#[derive(Debug, Clone)]
pub struct SampleRequest<'a> {
    pub formula: &'a Formula,
    /// Probability that each listed variable is true; ignored in uniform mode
    pub weights: &'a BTreeMap<Var, f64>,
    pub count: usize,
    pub mode: SamplingMode,
    pub seed: u64,
}

/// Produces satisfying assignments of a CNF
pub trait Sampler {
    fn sample(&mut self, request: &SampleRequest<'_>) -> Result<Vec<Assignment>, OracleError>;
}

/// The three parts of a counterexample to the current candidate vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counterexample {
    /// Values of X
    pub universal: Assignment,
    /// A Y assignment satisfying Φ for these X values
    pub witness: Assignment,
    /// The outputs of the candidate functions for these X values
    pub candidate: Assignment,
}

/// Verdict on an error formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The error formula is UNSAT: the candidates are Skolem functions
    Valid,
    /// The error formula is SAT
    Counterexample(Counterexample),
}

/// Decides satisfiability of the error formula
pub trait Verifier {
    fn check(&mut self, query: &ErrorFormula<'_>) -> Result<VerifyOutcome, OracleError>;
}

/// Optimization strategy for MaxSAT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxSatMode {
    /// Minimize the total weight of violated soft clauses
    Exact,
    /// Optimize soft clauses one priority level at a time, lowest level first
    Lexicographic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftClause {
    pub clause: Clause,
    pub weight: u64,
    /// Lower values are more important in lexicographic mode
    pub priority: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaxSatInstance {
    pub num_vars: u32,
    pub hard: Vec<Clause>,
    pub soft: Vec<SoftClause>,
}

impl MaxSatInstance {
    /// Distinct priority levels in ascending order
    pub fn priority_levels(&self) -> Vec<usize> {
        let mut levels: Vec<usize> = self.soft.iter().map(|s| s.priority).collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    }
}

/// Returns an optimal assignment for a weighted partial MaxSAT instance
pub trait MaxSatSolver {
    fn solve(&mut self, instance: &MaxSatInstance, mode: MaxSatMode)
    -> Result<Assignment, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_error_attaches_stage() {
        let err = OracleError::Failure("boom".into()).at(Stage::Localization);
        assert!(matches!(
            err,
            SynthError::OracleFailure {
                stage: Stage::Localization,
                ..
            }
        ));
        let err = OracleError::Timeout.at(Stage::Sampling);
        assert!(matches!(err, SynthError::OracleTimeout { .. }));
    }

    #[test]
    fn test_priority_levels_sorted_unique() {
        let soft = |p| SoftClause {
            clause: vec![Var(1).pos()],
            weight: 1,
            priority: p,
        };
        let instance = MaxSatInstance {
            num_vars: 1,
            hard: vec![],
            soft: vec![soft(3), soft(1), soft(3), soft(0)],
        };
        assert_eq!(instance.priority_levels(), vec![0, 1, 3]);
    }
}
