//! Self-substitution queries
//!
//! For a suspect y, assume the counterexample's X values, the current values
//! of the learned variables before y and y's candidate value. UNSAT means no
//! extension of those values can keep y there; the assumptions in the unsat
//! core (minus y's own literal) describe the region where the candidate must
//! take the other value.

use crate::ir::{Formula, Lit, Var};
use crate::oracle::OracleError;
use crate::semantics::smt::{
    Namespace, SolverConfig, cnf_term, create_solver_with_config, decide, read_assignment,
};
use crate::semantics::state::Assignment;
use z3::Solver;
use z3::ast::Bool;

/// Result of one assumption query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// A model of Φ under the assumptions
    Sat(Assignment),
    /// The assumption literals in the unsat core
    Unsat(Vec<Lit>),
}

/// Incremental z3 solver holding Φ, queried under assumptions
pub struct SelfSubstitution {
    solver: Solver,
    vars: Vec<Var>,
    num_vars: u32,
}

impl SelfSubstitution {
    pub fn new(formula: &Formula, config: &SolverConfig) -> Self {
        let solver = create_solver_with_config(config);
        solver.assert(&cnf_term(formula.clauses(), &|v| Namespace::PRIMARY.var(v)));
        let vars = formula
            .universals()
            .iter()
            .chain(formula.existentials())
            .copied()
            .collect();
        Self {
            solver,
            vars,
            num_vars: formula.num_vars(),
        }
    }

    pub fn query(&self, assumptions: &[Lit]) -> Result<Query, OracleError> {
        let terms: Vec<Bool> = assumptions
            .iter()
            .map(|&l| Namespace::PRIMARY.lit(l))
            .collect();
        if decide(&self.solver, self.solver.check_assumptions(&terms))? {
            let model = self
                .solver
                .get_model()
                .ok_or_else(|| OracleError::Failure("SAT but no model available".into()))?;
            return Ok(Query::Sat(read_assignment(
                &model,
                &self.vars,
                self.num_vars,
                &|v| Namespace::PRIMARY.var(v),
            )));
        }
        let core = self.solver.get_unsat_core();
        Ok(Query::Unsat(
            assumptions
                .iter()
                .zip(&terms)
                .filter(|(_, t)| core.contains(*t))
                .map(|(&l, _)| l)
                .collect(),
        ))
    }

    /// Deletion-based shrinking of `core`, keeping `anchor` assumed
    ///
    /// Each literal is dropped in turn; if the remainder together with the
    /// anchor stays UNSAT, the new (possibly smaller) core replaces it.
    pub fn minimize(&self, core: Vec<Lit>, anchor: Lit) -> Result<Vec<Lit>, OracleError> {
        let mut current: Vec<Lit> = core.into_iter().filter(|&l| l != anchor).collect();
        let mut i = 0;
        while i < current.len() {
            let mut trial: Vec<Lit> = current
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &l)| l)
                .collect();
            trial.push(anchor);
            match self.query(&trial)? {
                Query::Unsat(smaller) => {
                    current = smaller.into_iter().filter(|&l| l != anchor).collect();
                }
                Query::Sat(_) => i += 1,
            }
        }
        Ok(current)
    }
}
