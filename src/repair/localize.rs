//! Fault localization by MaxSAT
//!
//! Fix X to the counterexample and ask for a model of Φ that keeps as many
//! learned outputs as possible at the values the candidates produced. The
//! learned variables the optimum has to flip are the suspects.

use crate::error::{Result, Stage, SynthError};
use crate::ir::{Formula, Var};
use crate::oracle::{Counterexample, MaxSatInstance, MaxSatMode, MaxSatSolver, SoftClause};
use crate::schedule::DependencyGraph;
use crate::synth::candidate::CandidateVector;

/// Which localization produced the current suspects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Plain (optionally weighted) MaxSAT
    Localized,
    /// Lexicographic MaxSAT ranked by position in the order, used once per
    /// counterexample after the first pass left suspects unresolved
    LocalizedLex,
}

impl Escalation {
    pub fn mode(self) -> MaxSatMode {
        match self {
            Escalation::Localized => MaxSatMode::Exact,
            Escalation::LocalizedLex => MaxSatMode::Lexicographic,
        }
    }
}

/// Build the localization instance for `cex`
///
/// `formula` is the working formula, so unate units are already part of the
/// hard clauses.
pub fn localization_instance(
    formula: &Formula,
    candidates: &CandidateVector,
    graph: &DependencyGraph,
    cex: &Counterexample,
    weighted: bool,
) -> MaxSatInstance {
    let mut hard = formula.clauses().to_vec();
    for &x in formula.universals() {
        hard.push(vec![cex.universal.lit_of(x)]);
    }
    let soft = candidates
        .learned()
        .into_iter()
        .map(|y| SoftClause {
            clause: vec![cex.candidate.lit_of(y)],
            weight: if weighted {
                1 + graph.out_degree(y) as u64
            } else {
                1
            },
            priority: candidates.position(y).unwrap_or(usize::MAX),
        })
        .collect();
    MaxSatInstance {
        num_vars: formula.num_vars(),
        hard,
        soft,
    }
}

/// Learned variables whose candidate output has to change, in order
pub fn localize(
    formula: &Formula,
    candidates: &CandidateVector,
    graph: &DependencyGraph,
    cex: &Counterexample,
    weighted: bool,
    escalation: Escalation,
    solver: &mut dyn MaxSatSolver,
) -> Result<Vec<Var>> {
    let instance = localization_instance(formula, candidates, graph, cex, weighted);
    let model = solver
        .solve(&instance, escalation.mode())
        .map_err(|e| e.at(Stage::Localization))?;
    let suspects: Vec<Var> = candidates
        .learned()
        .into_iter()
        .filter(|&y| model.get(y) != cex.candidate.get(y))
        .collect();
    if suspects.is_empty() {
        return Err(SynthError::LocalizationInvariant(
            "MaxSAT optimum agrees with every candidate output".into(),
        ));
    }
    log::debug!("{:?} localization: {} suspects", escalation, suspects.len());
    Ok(suspects)
}
