//! Candidate learning from samples
//!
//! Each learning unit gets one decision tree over the universal variables and
//! the existentials scheduled before it. Learned definitions only reference
//! earlier variables, so the feature edges they add to the dependency graph
//! never invalidate the schedule.

pub mod dataset;
pub mod parallel;
pub mod tree;

pub use dataset::Dataset;
pub use tree::{DecisionTree, TreeParams};

use crate::error::{Result, SynthError};
use crate::ir::{Expr, Formula, Var};
use crate::schedule::{DependencyGraph, Schedule};
use crate::semantics::state::Assignment;
use crate::synth::candidate::{CandidateVector, Origin};
use crate::synth::config::LearnConfig;
use parallel::TrainJob;
use std::sync::Arc;

/// Features available to a unit: X, then every existential ordered before
/// the unit's first target
pub fn unit_features(formula: &Formula, schedule: &Schedule, targets: &[Var]) -> Vec<Var> {
    let first = targets
        .iter()
        .filter_map(|&t| schedule.position(t))
        .min()
        .unwrap_or(0);
    let mut features = formula.universals().to_vec();
    features.extend(schedule.order[..first].iter().copied());
    features
}

/// Learn a definition for every unit in `schedule`
///
/// Returns the number of trees fitted; units whose labels never change get a
/// constant definition without a tree.
pub fn learn_candidates(
    formula: &Formula,
    samples: &[Assignment],
    schedule: &Schedule,
    graph: &mut DependencyGraph,
    candidates: &mut CandidateVector,
    config: &LearnConfig,
    seed: u64,
) -> Result<usize> {
    let mut jobs = Vec::new();
    for (index, unit) in schedule.units.iter().enumerate() {
        let features = unit_features(formula, schedule, &unit.targets);
        let dataset = Dataset::project(samples, &features, &unit.targets);
        if dataset.all_labels_constant() {
            for (k, &target) in unit.targets.iter().enumerate() {
                let value = dataset.constant_label(k).unwrap_or(false);
                log::debug!("{} is constant {} on every sample", target, value);
                candidates.set(target, Expr::Const(value), Origin::Learned);
            }
            continue;
        }
        jobs.push(TrainJob {
            index,
            dataset: Arc::new(dataset),
            params: TreeParams {
                min_impurity_decrease: config.gini,
                seed: seed.wrapping_add(index as u64),
            },
        });
    }

    let units: Vec<usize> = jobs.iter().map(|j| j.index).collect();
    log::info!(
        "fitting {} trees over {} samples ({} workers)",
        jobs.len(),
        samples.len(),
        parallel::worker_count(config.jobs, jobs.len())
    );
    let trees = parallel::train_all(jobs, config.jobs);

    for (index, tree) in units.into_iter().zip(&trees) {
        let targets = &schedule.units[index].targets;
        if config.show_trees {
            let names: Vec<String> = targets.iter().map(Var::to_string).collect();
            println!("tree for [{}]:\n{}", names.join(", "), tree);
        }
        for (&target, expr) in targets.iter().zip(tree.to_exprs()) {
            for dep in expr.support() {
                if graph.contains(dep) && !graph.add_dependency(dep, target) {
                    return Err(SynthError::SchedulingInvariant(format!(
                        "learned definition of {} references later variable {}",
                        target, dep
                    )));
                }
            }
            log::debug!("learned {} := {}", target, expr);
            candidates.set(target, expr, Origin::Learned);
        }
    }
    Ok(trees.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::VariableSet;
    use crate::schedule::LearningUnit;

    /// Φ = (y2 ↔ x1) ∧ (y3 ↔ ¬y2) with one sample per value of x1
    fn setup() -> (Formula, Vec<Assignment>, Schedule) {
        let vars = VariableSet::new(vec![Var(1)], vec![Var(2), Var(3)]).unwrap();
        let f = Formula::new(
            vars,
            vec![
                vec![Var(1).neg(), Var(2).pos()],
                vec![Var(1).pos(), Var(2).neg()],
                vec![Var(2).pos(), Var(3).pos()],
                vec![Var(2).neg(), Var(3).neg()],
            ],
        )
        .unwrap();
        let samples = vec![
            Assignment::from_lits(3, [Var(1).pos(), Var(2).pos(), Var(3).neg()]),
            Assignment::from_lits(3, [Var(1).neg(), Var(2).neg(), Var(3).pos()]),
        ];
        let schedule = Schedule {
            order: vec![Var(2), Var(3)],
            units: vec![
                LearningUnit {
                    targets: vec![Var(2)],
                },
                LearningUnit {
                    targets: vec![Var(3)],
                },
            ],
        };
        (f, samples, schedule)
    }

    #[test]
    fn test_features_exclude_later_vars() {
        let (f, _, s) = setup();
        assert_eq!(unit_features(&f, &s, &[Var(2)]), vec![Var(1)]);
        assert_eq!(unit_features(&f, &s, &[Var(3)]), vec![Var(1), Var(2)]);
    }

    #[test]
    fn test_learned_candidates_fit_samples() {
        let (f, samples, s) = setup();
        let mut graph = DependencyGraph::new(f.existentials());
        let mut c = CandidateVector::new(s.order.clone());
        let trees = learn_candidates(
            &f,
            &samples,
            &s,
            &mut graph,
            &mut c,
            &LearnConfig::default(),
            10,
        )
        .unwrap();
        assert_eq!(trees, 2);
        assert!(c.is_complete());
        assert!(c.respects_order());
        for sample in &samples {
            for (v, expr) in c.iter() {
                assert_eq!(expr.eval(sample), sample.get(v));
            }
        }
        assert_eq!(c.learned(), vec![Var(2), Var(3)]);
        graph.check_order(&s.order).unwrap();
    }

    #[test]
    fn test_constant_labels_skip_tree() {
        let (f, _, s) = setup();
        let samples = vec![
            Assignment::from_lits(3, [Var(1).pos(), Var(2).pos(), Var(3).neg()]),
            Assignment::from_lits(3, [Var(1).pos(), Var(2).pos(), Var(3).neg()]),
        ];
        let mut graph = DependencyGraph::new(f.existentials());
        let mut c = CandidateVector::new(s.order.clone());
        let trees = learn_candidates(
            &f,
            &samples,
            &s,
            &mut graph,
            &mut c,
            &LearnConfig::default(),
            10,
        )
        .unwrap();
        assert_eq!(trees, 0);
        assert_eq!(c.get(Var(2)), Some(&Expr::t()));
        assert_eq!(c.get(Var(3)), Some(&Expr::f()));
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn test_parallel_learning_is_identical() {
        let (f, samples, s) = setup();
        let run = |jobs| {
            let mut graph = DependencyGraph::new(f.existentials());
            let mut c = CandidateVector::new(s.order.clone());
            let config = LearnConfig::default().with_jobs(jobs);
            learn_candidates(&f, &samples, &s, &mut graph, &mut c, &config, 10).unwrap();
            (c, graph.edges())
        };
        assert_eq!(run(1), run(4));
    }
}
