//! SMT encoding of clauses and expressions

use crate::ir::{Clause, Expr, Lit, Var};
use crate::oracle::OracleError;
use crate::semantics::state::Assignment;
use std::time::Duration;
use z3::ast::Bool;
use z3::{Model, Params, SatResult, Solver};

/// Configuration for the SMT solver
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Timeout for SMT solving (None means no timeout)
    pub timeout: Option<Duration>,
    pub seed: Option<u32>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            seed: None,
        }
    }
}

impl SolverConfig {
    /// Create a config with no timeout
    pub fn no_timeout() -> Self {
        Self {
            timeout: None,
            seed: None,
        }
    }

    /// Create a config with a specific timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    pub(crate) fn params(&self) -> Params {
        let mut params = Params::new();
        if let Some(timeout) = self.timeout {
            params.set_u32("timeout", timeout.as_millis().min(u32::MAX as u128) as u32);
        }
        if let Some(seed) = self.seed {
            params.set_u32("random_seed", seed);
        }
        params
    }
}

/// Create a Z3 solver with the given configuration
pub fn create_solver_with_config(cfg: &SolverConfig) -> Solver {
    let solver = Solver::new();
    solver.set_params(&cfg.params());
    solver
}

/// Map a z3 verdict to `Ok(true)` for SAT and `Ok(false)` for UNSAT
pub fn decide(solver: &Solver, result: SatResult) -> Result<bool, OracleError> {
    match result {
        SatResult::Sat => Ok(true),
        SatResult::Unsat => Ok(false),
        SatResult::Unknown => {
            let reason = solver
                .get_reason_unknown()
                .unwrap_or_else(|| "unknown".to_string());
            if reason.contains("timeout") || reason.contains("canceled") {
                Err(OracleError::Timeout)
            } else {
                Err(OracleError::Failure(format!("z3 returned unknown: {}", reason)))
            }
        }
    }
}

/// A namespace of Boolean constants, one per formula variable
///
/// The error formula needs two copies of the existential variables, so each
/// copy gets its own prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Namespace(&'static str);

impl Namespace {
    pub const PRIMARY: Namespace = Namespace("v");
    pub const CANDIDATE: Namespace = Namespace("c");

    pub fn var(self, v: Var) -> Bool {
        Bool::new_const(format!("{}{}", self.0, v.0))
    }

    pub fn lit(self, l: Lit) -> Bool {
        let b = self.var(l.var());
        if l.is_positive() { b } else { b.not() }
    }
}

fn lit_term(l: Lit, name: &impl Fn(Var) -> Bool) -> Bool {
    let b = name(l.var());
    if l.is_positive() { b } else { b.not() }
}

/// Disjunction of a clause's literals
pub fn clause_term(clause: &Clause, name: &impl Fn(Var) -> Bool) -> Bool {
    let lits: Vec<Bool> = clause.iter().map(|&l| lit_term(l, name)).collect();
    let refs: Vec<&Bool> = lits.iter().collect();
    Bool::or(&refs)
}

/// Conjunction of all clauses
pub fn cnf_term(clauses: &[Clause], name: &impl Fn(Var) -> Bool) -> Bool {
    let terms: Vec<Bool> = clauses.iter().map(|c| clause_term(c, name)).collect();
    let refs: Vec<&Bool> = terms.iter().collect();
    Bool::and(&refs)
}

pub fn expr_term(expr: &Expr, name: &impl Fn(Var) -> Bool) -> Bool {
    match expr {
        Expr::Const(b) => Bool::from_bool(*b),
        Expr::Lit(l) => lit_term(*l, name),
        Expr::Not(e) => expr_term(e, name).not(),
        Expr::And(items) => {
            let terms: Vec<Bool> = items.iter().map(|e| expr_term(e, name)).collect();
            let refs: Vec<&Bool> = terms.iter().collect();
            Bool::and(&refs)
        }
        Expr::Or(items) => {
            let terms: Vec<Bool> = items.iter().map(|e| expr_term(e, name)).collect();
            let refs: Vec<&Bool> = terms.iter().collect();
            Bool::or(&refs)
        }
    }
}

/// Read the values of `vars` from a model; unconstrained variables are false
pub fn read_assignment(
    model: &Model,
    vars: &[Var],
    num_vars: u32,
    name: &impl Fn(Var) -> Bool,
) -> Assignment {
    let mut assignment = Assignment::new(num_vars);
    for &v in vars {
        let value = model
            .eval(&name(v), true)
            .and_then(|b| b.as_bool())
            .unwrap_or(false);
        assignment.set(v, value);
    }
    assignment
}
