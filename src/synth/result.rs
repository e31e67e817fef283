//! Synthesis result types and statistics

use crate::synth::candidate::CandidateVector;
use std::fmt;
use std::time::Duration;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthStatus {
    /// The error formula became UNSAT
    Converged,
    /// The repair budget ran out with a counterexample outstanding
    NonConvergence,
    /// Unates and unique definitions covered every existential
    Trivial,
}

impl SynthStatus {
    /// The emitted functions are known to be Skolem functions
    pub fn is_verified(self) -> bool {
        !matches!(self, SynthStatus::NonConvergence)
    }
}

impl fmt::Display for SynthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthStatus::Converged => write!(f, "converged"),
            SynthStatus::NonConvergence => write!(f, "did not converge"),
            SynthStatus::Trivial => write!(f, "trivial"),
        }
    }
}

/// Pipeline phases recorded in the timing log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Preprocess,
    Unique,
    Sampling,
    Learning,
    Repair,
    Total,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Parse => "parse",
            Phase::Preprocess => "preprocess",
            Phase::Unique => "unique",
            Phase::Sampling => "sampling",
            Phase::Learning => "learning",
            Phase::Repair => "repair",
            Phase::Total => "total",
        }
    }
}

/// Counters collected over a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthStatistics {
    pub positive_unates: usize,
    pub negative_unates: usize,
    pub unique: usize,
    pub learned: usize,
    pub samples: usize,
    pub trees: usize,
    /// Repair iterations performed
    pub count_refine: usize,
    /// Suspects over all localizations
    pub suspects: usize,
    /// Counterexamples that needed lexicographic localization
    pub escalations: usize,
    pub timings: Vec<(Phase, Duration)>,
}

impl SynthStatistics {
    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        log::debug!("{} took {:.3}s", phase.name(), elapsed.as_secs_f64());
        self.timings.push((phase, elapsed));
    }

    pub fn time_of(&self, phase: Phase) -> Option<Duration> {
        self.timings
            .iter()
            .find(|(p, _)| *p == phase)
            .map(|&(_, d)| d)
    }
}

#[derive(Debug, Clone)]
pub struct SynthResult {
    pub status: SynthStatus,
    pub candidates: CandidateVector,
    pub statistics: SynthStatistics,
}

impl SynthResult {
    pub fn is_verified(&self) -> bool {
        self.status.is_verified()
    }
}
