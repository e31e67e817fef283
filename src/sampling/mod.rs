//! Sampler driver
//!
//! Decides how many samples to draw and with which weights, calls the
//! sampler oracle and keeps only assignments that satisfy the working
//! formula.

pub mod bias;

use crate::error::{Result, Stage, SynthError};
use crate::ir::{Formula, Var};
use crate::oracle::{SampleRequest, Sampler, SamplingMode};
use crate::preprocess::Classification;
use crate::semantics::state::Assignment;
use crate::synth::config::SamplingConfig;
use std::collections::BTreeMap;

/// Tiered default: fewer samples for wider universal vectors
pub fn default_sample_count(num_universals: usize) -> usize {
    if num_universals > 4000 {
        1000
    } else if num_universals > 1200 {
        5000
    } else {
        10000
    }
}

/// The explicit override wins over the tiered default
pub fn resolve_sample_count(config: &SamplingConfig, num_universals: usize) -> usize {
    config
        .samples
        .unwrap_or_else(|| default_sample_count(num_universals))
}

/// Weights before bias search: X and unique existentials unbiased, unates
/// left out, every learnable existential at `level`
pub fn base_weights(
    formula: &Formula,
    classification: &Classification,
    level: f64,
) -> BTreeMap<Var, f64> {
    let mut weights = BTreeMap::new();
    for &x in formula.universals() {
        weights.insert(x, 0.5);
    }
    for &y in formula.existentials() {
        if classification.unates.contains(y) {
            continue;
        }
        let w = if classification.unique.contains_key(&y) {
            0.5
        } else {
            level
        };
        weights.insert(y, w);
    }
    weights
}

/// Draw training samples for the learner
pub fn collect_samples(
    formula: &Formula,
    classification: &Classification,
    sampler: &mut dyn Sampler,
    config: &SamplingConfig,
    seed: u64,
) -> Result<Vec<Assignment>> {
    let count = resolve_sample_count(config, formula.universals().len());
    let (mode, weights) = if config.weighted {
        let base = base_weights(formula, classification, bias::BIAS_LEVELS[0]);
        let weights = if config.adaptive {
            let targets = classification.learnable(formula);
            bias::choose_weights(formula, sampler, &base, &targets, count, seed)?
        } else {
            base
        };
        (SamplingMode::Weighted, weights)
    } else {
        (SamplingMode::Uniform, BTreeMap::new())
    };
    log::info!("drawing {} {:?} samples", count, mode);

    let request = SampleRequest {
        formula,
        weights: &weights,
        count,
        mode,
        seed,
    };
    let raw = sampler
        .sample(&request)
        .map_err(|e| e.at(Stage::Sampling))?;
    let total = raw.len();
    let samples: Vec<Assignment> = raw
        .into_iter()
        .filter(|s| formula.is_satisfied_by(s))
        .collect();
    if samples.len() < total {
        log::warn!(
            "discarded {} of {} samples that do not satisfy the formula",
            total - samples.len(),
            total
        );
    }
    if samples.is_empty() {
        return Err(SynthError::oracle_failure(
            Stage::Sampling,
            "sampler returned no satisfying assignment",
        ));
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Expr, VariableSet};
    use crate::oracle::OracleError;

    #[test]
    fn test_sample_tiers() {
        assert_eq!(default_sample_count(1), 10000);
        assert_eq!(default_sample_count(1200), 10000);
        assert_eq!(default_sample_count(1201), 5000);
        assert_eq!(default_sample_count(4000), 5000);
        assert_eq!(default_sample_count(4001), 1000);
    }

    #[test]
    fn test_override_wins() {
        let config = SamplingConfig::default().with_samples(42);
        assert_eq!(resolve_sample_count(&config, 5000), 42);
        assert_eq!(resolve_sample_count(&SamplingConfig::default(), 5000), 1000);
    }

    fn formula() -> Formula {
        let vars = VariableSet::new(vec![Var(1)], vec![Var(2), Var(3), Var(4)]).unwrap();
        Formula::new(vars, vec![vec![Var(1).pos(), Var(2).pos(), Var(4).neg()]]).unwrap()
    }

    #[test]
    fn test_base_weights_by_class() {
        let f = formula();
        let mut c = Classification::default();
        c.unates.negative.insert(Var(3));
        c.unique.insert(Var(4), Expr::lit(Var(1).pos()));
        let w = base_weights(&f, &c, 0.9);
        assert_eq!(w[&Var(1)], 0.5);
        assert_eq!(w[&Var(2)], 0.9);
        assert!(!w.contains_key(&Var(3)));
        assert_eq!(w[&Var(4)], 0.5);
    }

    /// Returns one bad and one good assignment
    struct MixedSampler;

    impl Sampler for MixedSampler {
        fn sample(
            &mut self,
            _request: &SampleRequest<'_>,
        ) -> std::result::Result<Vec<Assignment>, OracleError> {
            Ok(vec![
                Assignment::from_lits(4, [Var(4).pos()]),
                Assignment::from_lits(4, [Var(1).pos()]),
            ])
        }
    }

    struct EmptySampler;

    impl Sampler for EmptySampler {
        fn sample(
            &mut self,
            _request: &SampleRequest<'_>,
        ) -> std::result::Result<Vec<Assignment>, OracleError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_invalid_samples_discarded() {
        let f = formula();
        let config = SamplingConfig::default()
            .with_weighted(false)
            .with_adaptive(false)
            .with_samples(2);
        let samples =
            collect_samples(&f, &Classification::default(), &mut MixedSampler, &config, 1).unwrap();
        assert_eq!(samples.len(), 1);
        assert!(samples[0].get(Var(1)));
    }

    #[test]
    fn test_empty_result_is_fatal() {
        let f = formula();
        let config = SamplingConfig::default().with_samples(5);
        let err = collect_samples(&f, &Classification::default(), &mut EmptySampler, &config, 1)
            .unwrap_err();
        assert!(matches!(
            err,
            SynthError::OracleFailure {
                stage: Stage::Sampling,
                ..
            }
        ));
    }
}
