//! Adaptive bias search for weighted sampling
//!
//! A variable whose samples are almost all 0 or all 1 gives the learner
//! nothing to split on. Before committing to full-scale sampling, every bias
//! level is probed with a small batch and each target variable keeps the
//! level that brings its share of true labels closest to one half.

use crate::error::{Result, Stage};
use crate::ir::{Formula, Var};
use crate::oracle::{SampleRequest, Sampler, SamplingMode};
use std::collections::BTreeMap;

/// Probability of true for the candidate levels, in preference order
pub const BIAS_LEVELS: [f64; 2] = [0.9, 0.1];

/// Upper bound on probe batch size
pub const PROBE_SAMPLES: usize = 500;

/// Pick a per-variable bias for `targets`
///
/// `base` holds the weights of every other variable. A level whose probe
/// yields no valid sample is ignored; a target with no usable probe keeps the
/// first level.
pub fn choose_weights(
    formula: &Formula,
    sampler: &mut dyn Sampler,
    base: &BTreeMap<Var, f64>,
    targets: &[Var],
    num_samples: usize,
    seed: u64,
) -> Result<BTreeMap<Var, f64>> {
    let probe_count = num_samples.min(PROBE_SAMPLES);
    // per target: (distance from 0.5, level)
    let mut best: BTreeMap<Var, (f64, f64)> = BTreeMap::new();

    for (round, &level) in BIAS_LEVELS.iter().enumerate() {
        let mut weights = base.clone();
        for &t in targets {
            weights.insert(t, level);
        }
        let request = SampleRequest {
            formula,
            weights: &weights,
            count: probe_count,
            mode: SamplingMode::Weighted,
            seed: seed.wrapping_add(round as u64 + 1),
        };
        let probe: Vec<_> = sampler
            .sample(&request)
            .map_err(|e| e.at(Stage::Sampling))?
            .into_iter()
            .filter(|s| formula.is_satisfied_by(s))
            .collect();
        if probe.is_empty() {
            log::warn!("bias probe at level {} produced no valid samples", level);
            continue;
        }
        for &t in targets {
            let ones = probe.iter().filter(|s| s.get(t)).count();
            let distance = (ones as f64 / probe.len() as f64 - 0.5).abs();
            let entry = best.entry(t).or_insert((f64::INFINITY, level));
            if distance < entry.0 {
                *entry = (distance, level);
            }
        }
        log::debug!("bias probe at level {}: {} samples", level, probe.len());
    }

    let mut weights = base.clone();
    for &t in targets {
        let level = best.get(&t).map(|&(_, l)| l).unwrap_or(BIAS_LEVELS[0]);
        weights.insert(t, level);
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::VariableSet;
    use crate::oracle::OracleError;
    use crate::semantics::state::Assignment;

    /// Returns a fixed label distribution per level: at level 0.9 target 2 is
    /// always true, at level 0.1 it is true half of the time
    struct LevelSampler;

    impl Sampler for LevelSampler {
        fn sample(
            &mut self,
            request: &SampleRequest<'_>,
        ) -> std::result::Result<Vec<Assignment>, OracleError> {
            let level = request.weights[&Var(2)];
            Ok((0..request.count)
                .map(|i| {
                    let y = if level > 0.5 { true } else { i % 2 == 0 };
                    Assignment::from_lits(2, [Var(1).pos(), Var(2).lit(y)])
                })
                .collect())
        }
    }

    #[test]
    fn test_most_balanced_level_chosen() {
        let vars = VariableSet::new(vec![Var(1)], vec![Var(2)]).unwrap();
        let f = Formula::new(vars, vec![vec![Var(1).pos(), Var(2).pos()]]).unwrap();
        let mut base = BTreeMap::new();
        base.insert(Var(1), 0.5);
        let weights = choose_weights(&f, &mut LevelSampler, &base, &[Var(2)], 10000, 10).unwrap();
        assert_eq!(weights[&Var(2)], 0.1);
        assert_eq!(weights[&Var(1)], 0.5);
    }
}
