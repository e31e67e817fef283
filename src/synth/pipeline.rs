//! End-to-end synthesis pipeline
//!
//! parse → unates → unique → (shortcut) → schedule → sample → learn →
//! verify/repair → output

use crate::error::{Result, SynthError};
use crate::ir::{Expr, Formula, Var};
use crate::learn::learn_candidates;
use crate::oracle::{
    ExternalMaxSat, ExternalSampler, ExternalVerifier, MaxSatSolver, Sampler, Verifier, Z3MaxSat,
    Z3Sampler,
};
use crate::output;
use crate::parser;
use crate::preprocess::{
    Classification, ExternalUnateDetector, UnateDetector, Z3UnateDetector, apply_unates,
    detect_unates, extract_unique,
};
use crate::repair::SelfSubstitution;
use crate::sampling::collect_samples;
use crate::schedule::{ClusterConfig, DependencyGraph, schedule};
use crate::semantics::equivalence::Z3Verifier;
use crate::semantics::smt::SolverConfig;
use crate::synth::candidate::{CandidateVector, Origin};
use crate::synth::cegar::run_cegar;
use crate::synth::config::{OracleConfig, SynthConfig};
use crate::synth::result::{Phase, SynthResult, SynthStatistics, SynthStatus};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// The oracle implementations a run talks to
pub struct Backends {
    pub unate: Box<dyn UnateDetector>,
    pub sampler: Box<dyn Sampler>,
    pub verifier: Box<dyn Verifier>,
    pub maxsat: Box<dyn MaxSatSolver>,
    /// Budget for in-process solver calls
    pub solver: SolverConfig,
}

impl Backends {
    /// External commands where configured, z3 everywhere else
    pub fn from_config(config: &OracleConfig) -> Self {
        let solver = match config.timeout {
            Some(t) => SolverConfig::with_timeout(t),
            None => SolverConfig::no_timeout(),
        };
        let unate: Box<dyn UnateDetector> = match &config.unate_cmd {
            Some(cmd) => Box::new(ExternalUnateDetector::new(
                cmd.clone(),
                Some(config.unate_timeout),
            )),
            None => Box::new(Z3UnateDetector::new(Some(config.unate_timeout))),
        };
        let sampler: Box<dyn Sampler> = match &config.sampler_cmd {
            Some(cmd) => Box::new(ExternalSampler::new(cmd.clone(), config.timeout)),
            None => Box::new(Z3Sampler::new(solver.clone())),
        };
        let verifier: Box<dyn Verifier> = match &config.verifier_cmd {
            Some(cmd) => Box::new(ExternalVerifier::new(cmd.clone(), config.timeout)),
            None => Box::new(Z3Verifier::new(solver.clone())),
        };
        let maxsat: Box<dyn MaxSatSolver> = match &config.maxsat_cmd {
            Some(cmd) => Box::new(ExternalMaxSat::new(cmd.clone(), config.timeout)),
            None => Box::new(Z3MaxSat::new(solver.clone())),
        };
        Self {
            unate,
            sampler,
            verifier,
            maxsat,
            solver,
        }
    }
}

/// Candidate vector holding the unate and unique definitions
fn trivial_candidates(order: Vec<Var>, classification: &Classification) -> CandidateVector {
    let mut candidates = CandidateVector::new(order);
    for &v in &classification.unates.positive {
        candidates.set(v, Expr::t(), Origin::PositiveUnate);
    }
    for &v in &classification.unates.negative {
        candidates.set(v, Expr::f(), Origin::NegativeUnate);
    }
    for (&v, expr) in &classification.unique {
        candidates.set(v, expr.clone(), Origin::Unique);
    }
    candidates
}

/// Synthesize Skolem functions for a parsed formula
pub fn synthesize(
    formula: &Formula,
    config: &SynthConfig,
    backends: &mut Backends,
) -> Result<SynthResult> {
    config.validate()?;
    let mut stats = SynthStatistics::default();
    let mut working = formula.clone();

    log::info!(
        "synthesizing {} existentials over {} universals, {} clauses",
        formula.existentials().len(),
        formula.universals().len(),
        formula.clauses().len()
    );

    let start = Instant::now();
    let unates = detect_unates(&working, backends.unate.as_mut(), config.preprocess)?;
    apply_unates(&mut working, &unates);
    stats.positive_unates = unates.positive.len();
    stats.negative_unates = unates.negative.len();
    stats.record(Phase::Preprocess, start.elapsed());

    let start = Instant::now();
    let mut graph = DependencyGraph::new(working.existentials());
    let unique = if config.unique {
        extract_unique(&working, &unates, &mut graph)
    } else {
        Default::default()
    };
    stats.unique = unique.len();
    stats.record(Phase::Unique, start.elapsed());
    log::info!("found {} unique definitions", unique.len());

    let classification = Classification { unates, unique };
    if classification.covers_all(&working) {
        log::info!("every existential is unate or uniquely defined");
        let order = graph.topological_order(&[])?;
        let candidates = trivial_candidates(order, &classification);
        return Ok(SynthResult {
            status: SynthStatus::Trivial,
            candidates,
            statistics: stats,
        });
    }

    let learnable = classification.learnable(&working);
    let clustering = config.learn.multiclass.then_some(ClusterConfig {
        hop: config.learn.hop,
        max_size: config.learn.cluster_size,
    });
    let plan = schedule(&working, &graph, &learnable, clustering)?;

    let start = Instant::now();
    let samples = collect_samples(
        &working,
        &classification,
        backends.sampler.as_mut(),
        &config.sampling,
        config.seed,
    )?;
    stats.samples = samples.len();
    stats.record(Phase::Sampling, start.elapsed());

    let start = Instant::now();
    let mut candidates = trivial_candidates(plan.order.clone(), &classification);
    stats.trees = learn_candidates(
        &working,
        &samples,
        &plan,
        &mut graph,
        &mut candidates,
        &config.learn,
        config.seed,
    )?;
    stats.learned = learnable.len();
    stats.record(Phase::Learning, start.elapsed());
    if !candidates.is_complete() {
        return Err(SynthError::SchedulingInvariant(
            "some existential has no candidate after learning".into(),
        ));
    }

    let start = Instant::now();
    let engine = SelfSubstitution::new(&working, &backends.solver);
    let status = run_cegar(
        &working,
        &mut candidates,
        &mut graph,
        &config.repair,
        backends.verifier.as_mut(),
        backends.maxsat.as_mut(),
        &engine,
        &mut stats,
    )?;
    stats.record(Phase::Repair, start.elapsed());

    Ok(SynthResult {
        status,
        candidates,
        statistics: stats,
    })
}

/// Files written by [`run_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub skolem: PathBuf,
    pub timing: PathBuf,
}

/// Parse `input`, synthesize, and write the Verilog and timing files
pub fn run_file(input: &Path, config: &SynthConfig) -> Result<(SynthResult, OutputPaths)> {
    let total = Instant::now();
    let start = Instant::now();
    let formula = parser::parse_file(input)?;
    let parse_time = start.elapsed();

    let mut backends = Backends::from_config(&config.oracle);
    let mut result = synthesize(&formula, config, &mut backends)?;
    result.statistics.timings.insert(0, (Phase::Parse, parse_time));
    result.statistics.record(Phase::Total, total.elapsed());

    let dir = match &config.output_dir {
        Some(dir) => dir.clone(),
        None => input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let stem = output::file_stem(input);
    let skolem = output::verilog::write_skolem(&dir, &stem, &formula, &result)?;
    let timing = output::timing::append_timings(&dir, &stem, &result.statistics)?;
    Ok((result, OutputPaths { skolem, timing }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::VariableSet;
    use crate::oracle::{OracleError, SampleRequest};
    use crate::semantics::state::Assignment;
    use crate::synth::config::{LearnConfig, SamplingConfig};

    /// Fails the test if sampling is ever requested
    struct NoSampler;

    impl Sampler for NoSampler {
        fn sample(
            &mut self,
            _request: &SampleRequest<'_>,
        ) -> std::result::Result<Vec<Assignment>, OracleError> {
            panic!("sampler called on a trivially solved formula");
        }
    }

    fn z3_backends() -> Backends {
        Backends::from_config(&OracleConfig::default())
    }

    /// y3 ↔ (x1 ∨ x2) stated as two implications plus y4 ∨ ¬y3 ∨ x1
    fn disjunction_with_tail() -> Formula {
        let vars = VariableSet::new(vec![Var(1), Var(2)], vec![Var(3), Var(4)]).unwrap();
        Formula::new(
            vars,
            vec![
                vec![Var(3).neg(), Var(1).pos(), Var(2).pos()],
                vec![Var(3).pos(), Var(1).neg()],
                vec![Var(3).pos(), Var(2).neg()],
                vec![Var(4).pos(), Var(3).neg(), Var(1).pos()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_all_unate_shortcut() {
        // (y) ∧ (¬y ∨ x)
        let vars = VariableSet::new(vec![Var(1)], vec![Var(2)]).unwrap();
        let f = Formula::new(vars, vec![vec![Var(2).pos()], vec![Var(2).neg(), Var(1).pos()]])
            .unwrap();
        let mut backends = z3_backends();
        backends.sampler = Box::new(NoSampler);
        let result = synthesize(&f, &SynthConfig::default(), &mut backends).unwrap();
        assert_eq!(result.status, SynthStatus::Trivial);
        assert_eq!(result.candidates.get(Var(2)), Some(&Expr::t()));
        assert_eq!(result.candidates.origin(Var(2)), Some(Origin::PositiveUnate));
        assert_eq!(result.statistics.count_refine, 0);
    }

    #[test]
    fn test_unique_definition_shortcut() {
        // y ≡ x
        let vars = VariableSet::new(vec![Var(1)], vec![Var(2)]).unwrap();
        let f = Formula::new(
            vars,
            vec![vec![Var(1).neg(), Var(2).pos()], vec![Var(1).pos(), Var(2).neg()]],
        )
        .unwrap();
        let mut backends = z3_backends();
        backends.sampler = Box::new(NoSampler);
        let result = synthesize(&f, &SynthConfig::default(), &mut backends).unwrap();
        assert_eq!(result.status, SynthStatus::Trivial);
        assert_eq!(result.candidates.get(Var(2)), Some(&Expr::lit(Var(1).pos())));
        assert_eq!(result.candidates.origin(Var(2)), Some(Origin::Unique));
    }

    #[test]
    fn test_learned_run_verifies() {
        let f = disjunction_with_tail();
        let config = SynthConfig::default()
            .with_unique(false)
            .with_preprocess(false)
            .with_sampling(SamplingConfig::default().with_samples(50))
            .with_learn(LearnConfig::default());
        let result = synthesize(&f, &config, &mut z3_backends()).unwrap();
        assert_eq!(result.status, SynthStatus::Converged);
        assert!(result.candidates.is_complete());
        for bits in 0..4u32 {
            let x = Assignment::from_lits(4, [Var(1).lit(bits & 1 != 0), Var(2).lit(bits & 2 != 0)]);
            let out = crate::semantics::evaluate_candidates(&result.candidates, &x);
            assert!(f.is_satisfied_by(&out));
        }
    }

    #[test]
    fn test_fixed_seed_runs_are_identical() {
        let f = disjunction_with_tail();
        let config = SynthConfig::default()
            .with_unique(false)
            .with_sampling(SamplingConfig::default().with_samples(50))
            .with_seed(7);
        let first = synthesize(&f, &config, &mut z3_backends()).unwrap();
        let second = synthesize(&f, &config, &mut z3_backends()).unwrap();
        let threaded = synthesize(
            &f,
            &config
                .clone()
                .with_learn(LearnConfig::default().with_jobs(4)),
            &mut z3_backends(),
        )
        .unwrap();

        for other in [&second, &threaded] {
            assert_eq!(first.status, other.status);
            assert_eq!(first.candidates, other.candidates);
            assert_eq!(
                first.statistics.count_refine,
                other.statistics.count_refine
            );
        }

        // every existential has exactly one origin
        let origins = [
            Origin::PositiveUnate,
            Origin::NegativeUnate,
            Origin::Unique,
            Origin::Learned,
        ];
        let mut seen = Vec::new();
        for origin in origins {
            seen.extend(first.candidates.with_origin(origin));
        }
        seen.sort();
        let mut existentials = f.existentials().to_vec();
        existentials.sort();
        assert_eq!(seen, existentials);
    }

    #[test]
    fn test_invalid_config_rejected_before_work() {
        let vars = VariableSet::new(vec![Var(1)], vec![Var(2)]).unwrap();
        let f = Formula::new(vars, vec![vec![Var(1).pos(), Var(2).pos()]]).unwrap();
        let config = SynthConfig::default().with_sampling(SamplingConfig::default().with_samples(0));
        assert!(synthesize(&f, &config, &mut z3_backends()).is_err());
    }
}
