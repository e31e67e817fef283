//! Verification through an external DIMACS SAT solver
//!
//! The error formula is Tseitin encoded. Variables `1..=n` keep their ids;
//! the candidate copy of existential `y` is `n + y`.

use crate::ir::{CnfBuilder, Formula, Lit, Var};
use crate::oracle::dimacs::{SolverStatus, parse_solver_output, write_cnf};
use crate::oracle::process::{CommandTemplate, run_with_timeout};
use crate::oracle::{OracleError, Verifier, VerifyOutcome};
use crate::semantics::equivalence::ErrorFormula;
use crate::semantics::state::Assignment;
use std::collections::BTreeMap;
use std::time::Duration;

/// Clauses of the error formula over the renamed variable space
pub fn encode_error_formula(query: &ErrorFormula<'_>) -> CnfBuilder {
    let formula = query.formula;
    let n = formula.num_vars();
    let copy = |v: Var| candidate_copy(formula, v);
    let mut cnf = CnfBuilder::new(2 * n);

    for clause in formula.clauses() {
        cnf.add_clause(clause.clone());
    }
    // some clause of Φ(X, Y') is falsified
    let mut violated = Vec::with_capacity(formula.clauses().len());
    for clause in formula.clauses() {
        let renamed: Vec<Lit> = clause
            .iter()
            .map(|l| copy(l.var()).lit(l.is_positive()))
            .collect();
        violated.push(!cnf.or_gate(&renamed));
    }
    cnf.add_clause(violated);

    for (y, expr) in query.candidates.iter() {
        let out = copy(y).pos();
        let def = cnf.encode(expr, &copy);
        cnf.add_clause(vec![!out, def]);
        cnf.add_clause(vec![out, !def]);
    }
    cnf
}

fn candidate_copy(formula: &Formula, v: Var) -> Var {
    if formula.vars().is_existential(v) {
        Var(formula.num_vars() + v.0)
    } else {
        v
    }
}

/// Verifier that runs an external SAT solver on `{input}`
#[derive(Debug, Clone)]
pub struct ExternalVerifier {
    command: CommandTemplate,
    timeout: Option<Duration>,
}

impl ExternalVerifier {
    pub fn new(command: CommandTemplate, timeout: Option<Duration>) -> Self {
        Self { command, timeout }
    }
}

impl Verifier for ExternalVerifier {
    fn check(&mut self, query: &ErrorFormula<'_>) -> Result<VerifyOutcome, OracleError> {
        let cnf = encode_error_formula(query);
        let num_vars = cnf.num_vars();
        let text = write_cnf(num_vars, cnf.clauses(), &[]);

        let dir = tempfile::tempdir()?;
        let input = dir.path().join("error_formula.cnf");
        std::fs::write(&input, text)?;
        let mut values = BTreeMap::new();
        values.insert("input", input.display().to_string());
        let outcome = run_with_timeout(&mut self.command.instantiate(&values), self.timeout)?;
        if outcome.timed_out {
            return Err(OracleError::Timeout);
        }

        let parsed = parse_solver_output(&outcome.stdout, num_vars);
        match parsed.status {
            SolverStatus::Unsatisfiable => Ok(VerifyOutcome::Valid),
            SolverStatus::Satisfiable | SolverStatus::Optimum => {
                let model = parsed.model.ok_or_else(|| {
                    OracleError::Failure("verifier reported SAT without a model".into())
                })?;
                let formula = query.formula;
                let n = formula.num_vars();
                let cex = query.counterexample(|vars, candidate_side| {
                    let mut a = Assignment::new(n);
                    for &v in vars {
                        let source = if candidate_side {
                            candidate_copy(formula, v)
                        } else {
                            v
                        };
                        a.set(v, model.get(source));
                    }
                    a
                });
                Ok(VerifyOutcome::Counterexample(cex))
            }
            SolverStatus::Unknown => Err(OracleError::Failure(
                "verifier produced no result (read failure)".into(),
            )),
        }
    }
}
