//! Sampler backends
//!
//! `Z3Sampler` draws a preferred polarity for every variable from a seeded
//! generator, asks z3 for a model under those preferences as assumptions, and
//! drops the preferences in the unsat core until the query becomes
//! satisfiable. Weighted mode biases the preferred polarities with the
//! requested per-variable probabilities.

use crate::ir::{Lit, Var};
use crate::oracle::dimacs::{parse_samples, write_cnf, write_weighted_cnf};
use crate::oracle::process::{CommandTemplate, run_with_timeout};
use crate::oracle::{OracleError, SampleRequest, Sampler, SamplingMode};
use crate::semantics::smt::{
    Namespace, SolverConfig, cnf_term, create_solver_with_config, decide, read_assignment,
};
use crate::semantics::state::Assignment;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::time::Duration;
use z3::ast::Bool;

fn preference(request: &SampleRequest<'_>, var: Var) -> f64 {
    match request.mode {
        SamplingMode::Uniform => 0.5,
        SamplingMode::Weighted => request
            .weights
            .get(&var)
            .copied()
            .unwrap_or(0.5)
            .clamp(0.0, 1.0),
    }
}

/// In-process sampler on top of z3
#[derive(Debug, Clone, Default)]
pub struct Z3Sampler {
    config: SolverConfig,
}

impl Z3Sampler {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl Sampler for Z3Sampler {
    fn sample(&mut self, request: &SampleRequest<'_>) -> Result<Vec<Assignment>, OracleError> {
        let formula = request.formula;
        let primary = |v: Var| Namespace::PRIMARY.var(v);
        let solver =
            create_solver_with_config(&self.config.clone().with_seed(request.seed as u32));
        solver.assert(&cnf_term(formula.clauses(), &primary));

        let vars: Vec<Var> = formula
            .universals()
            .iter()
            .chain(formula.existentials())
            .copied()
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(request.seed);
        let mut samples = Vec::with_capacity(request.count);

        for _ in 0..request.count {
            let mut prefs: Vec<Lit> = vars
                .iter()
                .map(|&v| v.lit(rng.random_bool(preference(request, v))))
                .collect();
            prefs.shuffle(&mut rng);
            loop {
                let assumptions: Vec<Bool> =
                    prefs.iter().map(|&l| Namespace::PRIMARY.lit(l)).collect();
                if decide(&solver, solver.check_assumptions(&assumptions))? {
                    let model = solver
                        .get_model()
                        .ok_or_else(|| OracleError::Failure("SAT but no model available".into()))?;
                    samples.push(read_assignment(&model, &vars, formula.num_vars(), &primary));
                    break;
                }
                let core = solver.get_unsat_core();
                if core.is_empty() {
                    return Err(OracleError::Failure("formula is unsatisfiable".into()));
                }
                let before = prefs.len();
                prefs.retain(|&l| !core.contains(&Namespace::PRIMARY.lit(l)));
                if prefs.len() == before {
                    return Err(OracleError::Failure(
                        "unsat core does not match any assumption".into(),
                    ));
                }
            }
        }
        Ok(samples)
    }
}

/// Sampler that runs an external binary
///
/// The command template may use `{input}` (the CNF), `{output}` (the sample
/// file the tool must write), `{count}` and `{seed}`.
#[derive(Debug, Clone)]
pub struct ExternalSampler {
    command: CommandTemplate,
    timeout: Option<Duration>,
}

impl ExternalSampler {
    pub fn new(command: CommandTemplate, timeout: Option<Duration>) -> Self {
        Self { command, timeout }
    }
}

impl Sampler for ExternalSampler {
    fn sample(&mut self, request: &SampleRequest<'_>) -> Result<Vec<Assignment>, OracleError> {
        let formula = request.formula;
        let sampling_set: Vec<Var> = formula
            .universals()
            .iter()
            .chain(formula.existentials())
            .copied()
            .collect();
        let text = match request.mode {
            SamplingMode::Uniform => write_cnf(formula.num_vars(), formula.clauses(), &sampling_set),
            SamplingMode::Weighted => write_weighted_cnf(
                formula.num_vars(),
                formula.clauses(),
                &sampling_set,
                request.weights,
            ),
        };

        let dir = tempfile::tempdir()?;
        let input = dir.path().join("sampling.cnf");
        let output = dir.path().join("samples.txt");
        std::fs::write(&input, text)?;

        let mut values = BTreeMap::new();
        values.insert("input", input.display().to_string());
        values.insert("output", output.display().to_string());
        values.insert("count", request.count.to_string());
        values.insert("seed", request.seed.to_string());
        let outcome = run_with_timeout(&mut self.command.instantiate(&values), self.timeout)?;
        if outcome.timed_out {
            return Err(OracleError::Timeout);
        }

        let content = std::fs::read_to_string(&output).map_err(|e| {
            OracleError::Failure(format!("sampler produced no sample file: {}", e))
        })?;
        Ok(parse_samples(&content, formula.num_vars()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Formula, VariableSet};

    /// (x1 ∨ y2) ∧ (¬y2 ∨ ¬y3)
    fn small_formula() -> Formula {
        let vars = VariableSet::new(vec![Var(1)], vec![Var(2), Var(3)]).unwrap();
        Formula::new(
            vars,
            vec![vec![Var(1).pos(), Var(2).pos()], vec![Var(2).neg(), Var(3).neg()]],
        )
        .unwrap()
    }

    #[test]
    fn test_z3_samples_satisfy_formula() {
        let f = small_formula();
        let weights = BTreeMap::new();
        let request = SampleRequest {
            formula: &f,
            weights: &weights,
            count: 20,
            mode: SamplingMode::Uniform,
            seed: 10,
        };
        let samples = Z3Sampler::default().sample(&request).unwrap();
        assert_eq!(samples.len(), 20);
        assert!(samples.iter().all(|s| f.is_satisfied_by(s)));
    }

    #[test]
    fn test_z3_sampler_is_deterministic() {
        let f = small_formula();
        let weights = BTreeMap::new();
        let request = SampleRequest {
            formula: &f,
            weights: &weights,
            count: 10,
            mode: SamplingMode::Uniform,
            seed: 3,
        };
        let a = Z3Sampler::default().sample(&request).unwrap();
        let b = Z3Sampler::default().sample(&request).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_weights_bias_preferred_polarity() {
        let f = small_formula();
        let mut weights = BTreeMap::new();
        weights.insert(Var(1), 1.0);
        weights.insert(Var(2), 0.0);
        weights.insert(Var(3), 1.0);
        let request = SampleRequest {
            formula: &f,
            weights: &weights,
            count: 10,
            mode: SamplingMode::Weighted,
            seed: 7,
        };
        let samples = Z3Sampler::default().sample(&request).unwrap();
        // x1 = 1, y2 = 0, y3 = 1 satisfies Φ, so no preference is dropped
        for s in &samples {
            assert!(s.get(Var(1)) && !s.get(Var(2)) && s.get(Var(3)));
        }
    }

    #[test]
    fn test_external_sampler_reads_sample_file() {
        let f = small_formula();
        let weights = BTreeMap::new();
        let request = SampleRequest {
            formula: &f,
            weights: &weights,
            count: 2,
            mode: SamplingMode::Uniform,
            seed: 1,
        };
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("sampler.sh");
        std::fs::write(&script, "printf 'c two samples\\n1 -2 3 0\\n-1 2 -3 0\\n' > \"$1\"\n")
            .unwrap();
        let cmd = CommandTemplate::parse(&format!("sh {} {{output}}", script.display())).unwrap();
        let mut sampler = ExternalSampler::new(cmd, Some(Duration::from_secs(5)));
        let samples = sampler.sample(&request).unwrap();
        assert_eq!(samples.len(), 2);
        assert!(samples[0].get(Var(1)) && samples[0].get(Var(3)));
        assert!(samples[1].get(Var(2)));
    }
}
