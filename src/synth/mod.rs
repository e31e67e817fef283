//! Counterexample-guided synthesis: configuration, candidates, the repair
//! loop and the end-to-end pipeline

pub mod candidate;
pub mod cegar;
pub mod config;
pub mod pipeline;
pub mod result;

#[allow(unused_imports)]
pub use candidate::{CandidateVector, Origin};
pub use config::{LearnConfig, OracleConfig, RepairConfig, SamplingConfig, SynthConfig};
#[allow(unused_imports)]
pub use pipeline::{Backends, OutputPaths, run_file, synthesize};
#[allow(unused_imports)]
pub use result::{Phase, SynthResult, SynthStatistics, SynthStatus};
