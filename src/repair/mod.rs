//! Counterexample-driven repair of learned candidates
//!
//! A counterexample is handled in two steps. MaxSAT localization picks the
//! learned variables whose outputs must change, then each suspect is repaired
//! by self-substitution in dependency order. If a pass meets an unsat core
//! too large to use and lexicographic localization is enabled, the pass is
//! dropped and localization runs once more in lexicographic mode; that second
//! pass accepts oversize cores.

pub mod localize;
pub mod selfsub;

pub use localize::{Escalation, localize};
#[allow(unused_imports)]
pub use selfsub::{Query, SelfSubstitution};

use crate::error::{Result, Stage, SynthError};
use crate::ir::{Expr, Formula, Lit, Var};
use crate::oracle::{Counterexample, MaxSatSolver};
use crate::schedule::DependencyGraph;
use crate::synth::candidate::CandidateVector;
use crate::synth::config::RepairConfig;
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of one self-substitution pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassResult {
    /// New definitions, keyed by variable
    Repaired(BTreeMap<Var, Expr>),
    /// A suspect whose core exceeded the threshold
    Unresolved(Var),
}

/// What a counterexample led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub definitions: BTreeMap<Var, Expr>,
    pub escalation: Escalation,
    pub suspects: usize,
}

/// Repair `suspects` in order against one counterexample
///
/// Outside the final pass, a suspect whose (minimised) core is larger than
/// `threshold` stops the pass.
pub fn repair_pass(
    engine: &SelfSubstitution,
    formula: &Formula,
    candidates: &CandidateVector,
    cex: &Counterexample,
    suspects: &[Var],
    threshold: usize,
    final_pass: bool,
) -> Result<PassResult> {
    let learned = candidates.learned();
    let mut sigma = cex.candidate.clone();
    let mut worklist: BTreeSet<(usize, Var)> = suspects
        .iter()
        .filter_map(|&y| candidates.position(y).map(|p| (p, y)))
        .collect();
    let mut repaired: BTreeMap<Var, Expr> = BTreeMap::new();

    while let Some((pos, y)) = worklist.pop_first() {
        let mut assumptions: Vec<Lit> = formula
            .universals()
            .iter()
            .map(|&x| cex.universal.lit_of(x))
            .collect();
        assumptions.extend(
            learned
                .iter()
                .filter(|&&v| candidates.position(v).is_some_and(|p| p < pos))
                .map(|&v| sigma.lit_of(v)),
        );
        let y_lit = sigma.lit_of(y);
        assumptions.push(y_lit);

        match engine.query(&assumptions).map_err(|e| e.at(Stage::Repair))? {
            selfsub::Query::Sat(model) => {
                for &v in &learned {
                    if let Some(p) = candidates.position(v)
                        && p > pos
                        && model.get(v) != sigma.get(v)
                    {
                        worklist.insert((p, v));
                    }
                }
            }
            selfsub::Query::Unsat(core) => {
                let mut beta: Vec<Lit> = core.into_iter().filter(|&l| l != y_lit).collect();
                if beta.len() > threshold {
                    beta = engine
                        .minimize(beta, y_lit)
                        .map_err(|e| e.at(Stage::Repair))?;
                }
                if beta.len() > threshold {
                    if !final_pass {
                        log::debug!("core of size {} for {} exceeds threshold", beta.len(), y);
                        return Ok(PassResult::Unresolved(y));
                    }
                    log::debug!("applying oversize core of size {} for {}", beta.len(), y);
                }
                let old = repaired
                    .get(&y)
                    .or_else(|| candidates.get(y))
                    .cloned()
                    .unwrap_or_else(Expr::f);
                let value = sigma.get(y);
                repaired.insert(y, Expr::case_split(Expr::cube(&beta), !value, old));
                sigma.set(y, !value);
            }
        }
    }
    Ok(PassResult::Repaired(repaired))
}

/// Localize and repair one counterexample
pub fn repair_counterexample(
    engine: &SelfSubstitution,
    formula: &Formula,
    candidates: &CandidateVector,
    graph: &DependencyGraph,
    cex: &Counterexample,
    config: &RepairConfig,
    maxsat: &mut dyn MaxSatSolver,
) -> Result<RepairReport> {
    let suspects = localize(
        formula,
        candidates,
        graph,
        cex,
        config.weighted_maxsat,
        Escalation::Localized,
        maxsat,
    )?;
    let first = repair_pass(
        engine,
        formula,
        candidates,
        cex,
        &suspects,
        config.self_sub_threshold,
        !config.lex_maxsat,
    )?;
    let unresolved = match first {
        PassResult::Repaired(definitions) => {
            return Ok(RepairReport {
                definitions,
                escalation: Escalation::Localized,
                suspects: suspects.len(),
            });
        }
        PassResult::Unresolved(y) => y,
    };

    log::info!("{} unresolved, escalating to lexicographic localization", unresolved);
    let suspects = localize(
        formula,
        candidates,
        graph,
        cex,
        config.weighted_maxsat,
        Escalation::LocalizedLex,
        maxsat,
    )?;
    match repair_pass(
        engine,
        formula,
        candidates,
        cex,
        &suspects,
        config.self_sub_threshold,
        true,
    )? {
        PassResult::Repaired(definitions) => Ok(RepairReport {
            definitions,
            escalation: Escalation::LocalizedLex,
            suspects: suspects.len(),
        }),
        PassResult::Unresolved(y) => Err(SynthError::LocalizationInvariant(format!(
            "{} left unresolved by the final repair pass",
            y
        ))),
    }
}
