//! Configuration types for the synthesis pipeline

use crate::error::{Result, SynthError};
use crate::oracle::CommandTemplate;
use std::path::PathBuf;
use std::time::Duration;

/// Seed used when none is given
pub const DEFAULT_SEED: u64 = 10;

/// Configuration for the sampler driver
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    /// Explicit sample count; overrides the tiered default
    pub samples: Option<usize>,
    /// Weighted (biased) rather than uniform sampling
    pub weighted: bool,
    /// Probe bias levels before full-scale sampling (weighted mode only)
    pub adaptive: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            samples: None,
            weighted: true,
            adaptive: true,
        }
    }
}

impl SamplingConfig {
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = Some(samples);
        self
    }

    pub fn with_samples_option(mut self, samples: Option<usize>) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }
}

/// Configuration for the candidate learner
#[derive(Debug, Clone, PartialEq)]
pub struct LearnConfig {
    /// Minimum weighted impurity decrease for a split
    pub gini: f64,
    /// Learn clusters of coupled variables with one multi-output tree
    pub multiclass: bool,
    /// Cluster radius in the clause co-occurrence graph
    pub hop: usize,
    pub cluster_size: usize,
    /// Worker threads for tree training
    pub jobs: usize,
    /// Print every fitted tree
    pub show_trees: bool,
}

impl Default for LearnConfig {
    fn default() -> Self {
        Self {
            gini: 0.005,
            multiclass: false,
            hop: 3,
            cluster_size: 8,
            jobs: 1,
            show_trees: false,
        }
    }
}

impl LearnConfig {
    pub fn with_gini(mut self, gini: f64) -> Self {
        self.gini = gini;
        self
    }

    pub fn with_multiclass(mut self, multiclass: bool) -> Self {
        self.multiclass = multiclass;
        self
    }

    pub fn with_hop(mut self, hop: usize) -> Self {
        self.hop = hop;
        self
    }

    pub fn with_cluster_size(mut self, cluster_size: usize) -> Self {
        self.cluster_size = cluster_size;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_show_trees(mut self, show_trees: bool) -> Self {
        self.show_trees = show_trees;
        self
    }
}

/// Configuration for the repair loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairConfig {
    pub max_iterations: usize,
    /// Largest core accepted as a self-substitution condition
    pub self_sub_threshold: usize,
    /// Weight soft clauses by out-degree in the dependency graph
    pub weighted_maxsat: bool,
    /// Escalate once to lexicographic localization on unresolved suspects
    pub lex_maxsat: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            self_sub_threshold: 30,
            weighted_maxsat: false,
            lex_maxsat: false,
        }
    }
}

impl RepairConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_self_sub_threshold(mut self, threshold: usize) -> Self {
        self.self_sub_threshold = threshold;
        self
    }

    pub fn with_weighted_maxsat(mut self, weighted: bool) -> Self {
        self.weighted_maxsat = weighted;
        self
    }

    pub fn with_lex_maxsat(mut self, lex: bool) -> Self {
        self.lex_maxsat = lex;
        self
    }
}

/// Per-call oracle budget unless overridden
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Oracle backends and their time budgets
///
/// A missing command selects the in-process z3 backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleConfig {
    pub sampler_cmd: Option<CommandTemplate>,
    pub verifier_cmd: Option<CommandTemplate>,
    pub maxsat_cmd: Option<CommandTemplate>,
    pub unate_cmd: Option<CommandTemplate>,
    /// Budget for each sampler, verifier and MaxSAT call; `None` only when
    /// explicitly requested
    pub timeout: Option<Duration>,
    /// Budget for the whole unate detection
    pub unate_timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            sampler_cmd: None,
            verifier_cmd: None,
            maxsat_cmd: None,
            unate_cmd: None,
            timeout: Some(DEFAULT_ORACLE_TIMEOUT),
            unate_timeout: Duration::from_secs(500),
        }
    }
}

impl OracleConfig {
    pub fn with_sampler_cmd(mut self, cmd: Option<CommandTemplate>) -> Self {
        self.sampler_cmd = cmd;
        self
    }

    pub fn with_verifier_cmd(mut self, cmd: Option<CommandTemplate>) -> Self {
        self.verifier_cmd = cmd;
        self
    }

    pub fn with_maxsat_cmd(mut self, cmd: Option<CommandTemplate>) -> Self {
        self.maxsat_cmd = cmd;
        self
    }

    pub fn with_unate_cmd(mut self, cmd: Option<CommandTemplate>) -> Self {
        self.unate_cmd = cmd;
        self
    }

    pub fn with_timeout_option(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_unate_timeout(mut self, timeout: Duration) -> Self {
        self.unate_timeout = timeout;
        self
    }
}

/// Top-level configuration for a synthesis run
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    /// Run unate detection
    pub preprocess: bool,
    /// Run unique-definition extraction
    pub unique: bool,
    pub sampling: SamplingConfig,
    pub learn: LearnConfig,
    pub repair: RepairConfig,
    pub oracle: OracleConfig,
    pub seed: u64,
    /// Where output files go; defaults to the input file's directory
    pub output_dir: Option<PathBuf>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            preprocess: true,
            unique: true,
            sampling: SamplingConfig::default(),
            learn: LearnConfig::default(),
            repair: RepairConfig::default(),
            oracle: OracleConfig::default(),
            seed: DEFAULT_SEED,
            output_dir: None,
        }
    }
}

impl SynthConfig {
    pub fn with_preprocess(mut self, enabled: bool) -> Self {
        self.preprocess = enabled;
        self
    }

    pub fn with_unique(mut self, enabled: bool) -> Self {
        self.unique = enabled;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_learn(mut self, learn: LearnConfig) -> Self {
        self.learn = learn;
        self
    }

    pub fn with_repair(mut self, repair: RepairConfig) -> Self {
        self.repair = repair;
        self
    }

    pub fn with_oracle(mut self, oracle: OracleConfig) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    /// Reject inconsistent option combinations instead of guessing
    pub fn validate(&self) -> Result<()> {
        if self.sampling.samples == Some(0) {
            return Err(SynthError::Config(
                "sample count override must be at least 1".into(),
            ));
        }
        if self.sampling.adaptive && !self.sampling.weighted {
            return Err(SynthError::Config(
                "adaptive bias search requires weighted sampling".into(),
            ));
        }
        if !self.learn.gini.is_finite() || self.learn.gini < 0.0 {
            return Err(SynthError::Config(format!(
                "gini threshold must be a non-negative number, got {}",
                self.learn.gini
            )));
        }
        if self.oracle.timeout == Some(Duration::ZERO) {
            return Err(SynthError::Config("oracle timeout must be positive".into()));
        }
        if self.learn.multiclass && self.learn.cluster_size < 2 {
            return Err(SynthError::Config(
                "multi-output learning needs a cluster size of at least 2".into(),
            ));
        }
        Ok(())
    }
}
