//! The error formula and its in-process z3 check
//!
//! E(X, Y, Y') = Φ(X, Y) ∧ ¬Φ(X, Y') ∧ ⋀ y' ↔ Ψ_y(X, Y')
//!
//! E is UNSAT exactly when the candidate vector Ψ satisfies Φ for every X
//! that admits some satisfying Y.

use crate::ir::{Formula, Var};
use crate::oracle::{Counterexample, OracleError, Verifier, VerifyOutcome};
use crate::semantics::smt::{
    Namespace, SolverConfig, cnf_term, create_solver_with_config, decide, expr_term,
    read_assignment,
};
use crate::semantics::state::Assignment;
use crate::synth::candidate::CandidateVector;
use z3::ast::Bool;

/// A verification query: the working formula and the candidates to check
#[derive(Debug, Clone, Copy)]
pub struct ErrorFormula<'a> {
    pub formula: &'a Formula,
    pub candidates: &'a CandidateVector,
}

impl<'a> ErrorFormula<'a> {
    pub fn new(formula: &'a Formula, candidates: &'a CandidateVector) -> Self {
        Self {
            formula,
            candidates,
        }
    }

    /// Build a counterexample from the values of X, Y and Y'
    ///
    /// Each part is a full assignment carrying the X values, so that the
    /// witness and candidate parts can be evaluated against Φ directly.
    pub fn counterexample(
        &self,
        read: impl Fn(&[Var], bool) -> Assignment,
    ) -> Counterexample {
        let xs = self.formula.universals();
        let ys = self.formula.existentials();
        let universal = read(xs, false);
        let mut witness = read(ys, false);
        witness.copy_from(&universal, xs);
        let mut candidate = read(ys, true);
        candidate.copy_from(&universal, xs);
        Counterexample {
            universal,
            witness,
            candidate,
        }
    }
}

/// Verifier backed by an in-process z3 solver
#[derive(Debug, Clone, Default)]
pub struct Z3Verifier {
    config: SolverConfig,
}

impl Z3Verifier {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl Verifier for Z3Verifier {
    fn check(&mut self, query: &ErrorFormula<'_>) -> Result<VerifyOutcome, OracleError> {
        let formula = query.formula;
        let primary = |v: Var| Namespace::PRIMARY.var(v);
        let copy = |v: Var| {
            if formula.vars().is_existential(v) {
                Namespace::CANDIDATE.var(v)
            } else {
                Namespace::PRIMARY.var(v)
            }
        };

        let solver = create_solver_with_config(&self.config);
        solver.assert(&cnf_term(formula.clauses(), &primary));
        solver.assert(&cnf_term(formula.clauses(), &copy).not());
        for (y, expr) in query.candidates.iter() {
            let out: Bool = Namespace::CANDIDATE.var(y);
            solver.assert(&out.iff(&expr_term(expr, &copy)));
        }

        if !decide(&solver, solver.check())? {
            return Ok(VerifyOutcome::Valid);
        }
        let model = solver
            .get_model()
            .ok_or_else(|| OracleError::Failure("SAT but no model available".into()))?;
        let num_vars = formula.num_vars();
        let cex = query.counterexample(|vars, candidate_side| {
            if candidate_side {
                read_assignment(&model, vars, num_vars, &|v| Namespace::CANDIDATE.var(v))
            } else {
                read_assignment(&model, vars, num_vars, &primary)
            }
        });
        Ok(VerifyOutcome::Counterexample(cex))
    }
}
