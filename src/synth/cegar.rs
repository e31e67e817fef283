//! The verify / localize / repair loop

use crate::error::{Result, Stage, SynthError};
use crate::ir::Formula;
use crate::oracle::{MaxSatSolver, Verifier, VerifyOutcome};
use crate::repair::{Escalation, SelfSubstitution, repair_counterexample};
use crate::schedule::DependencyGraph;
use crate::semantics::equivalence::ErrorFormula;
use crate::synth::candidate::CandidateVector;
use crate::synth::config::RepairConfig;
use crate::synth::result::{SynthStatistics, SynthStatus};

/// Refine `candidates` until the error formula is UNSAT or the iteration
/// budget is spent
///
/// Every repaired definition adds its existential references to `graph`; the
/// order is re-checked before each verification.
#[allow(clippy::too_many_arguments)]
pub fn run_cegar(
    formula: &Formula,
    candidates: &mut CandidateVector,
    graph: &mut DependencyGraph,
    config: &RepairConfig,
    verifier: &mut dyn Verifier,
    maxsat: &mut dyn MaxSatSolver,
    engine: &SelfSubstitution,
    stats: &mut SynthStatistics,
) -> Result<SynthStatus> {
    loop {
        graph.check_order(candidates.order())?;
        if !candidates.respects_order() {
            return Err(SynthError::SchedulingInvariant(
                "a candidate references an existential that is not ordered before it".into(),
            ));
        }

        let query = ErrorFormula::new(formula, candidates);
        let cex = match verifier
            .check(&query)
            .map_err(|e| e.at(Stage::Verification))?
        {
            VerifyOutcome::Valid => {
                log::info!(
                    "error formula UNSAT after {} repairs",
                    stats.count_refine
                );
                return Ok(SynthStatus::Converged);
            }
            VerifyOutcome::Counterexample(cex) => cex,
        };

        if stats.count_refine >= config.max_iterations {
            log::warn!(
                "repair budget of {} iterations exhausted",
                config.max_iterations
            );
            return Ok(SynthStatus::NonConvergence);
        }
        stats.count_refine += 1;
        log::debug!("repair {}: counterexample {}", stats.count_refine, cex.universal);

        let report = repair_counterexample(engine, formula, candidates, graph, &cex, config, maxsat)?;
        stats.suspects += report.suspects;
        if report.escalation == Escalation::LocalizedLex {
            stats.escalations += 1;
        }
        if report.definitions.is_empty() {
            log::debug!("no definition changed for this counterexample");
        }
        for (y, expr) in report.definitions {
            for dep in expr.support() {
                if graph.contains(dep) && !graph.add_dependency(dep, y) {
                    return Err(SynthError::SchedulingInvariant(format!(
                        "repair of {} references {}, which depends on it",
                        y, dep
                    )));
                }
            }
            log::debug!("repaired {} := {}", y, expr);
            if !candidates.replace(y, expr) {
                return Err(SynthError::LocalizationInvariant(format!(
                    "repair produced a definition for {}, which is not learned",
                    y
                )));
            }
        }
    }
}
