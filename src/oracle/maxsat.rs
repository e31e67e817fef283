//! MaxSAT backends
//!
//! `Z3MaxSat` uses the z3 optimizer; lexicographic mode places each priority
//! level in its own soft-constraint group, declared in priority order, which
//! z3 optimizes lexicographically. `ExternalMaxSat` writes WCNF and, for
//! lexicographic mode, solves one level at a time and hardens the soft clauses
//! each level's optimum satisfies.

use crate::ir::{Clause, Var};
use crate::oracle::dimacs::{SolverStatus, parse_solver_output, write_wcnf};
use crate::oracle::process::{CommandTemplate, run_with_timeout};
use crate::oracle::{MaxSatInstance, MaxSatMode, MaxSatSolver, OracleError};
use crate::semantics::smt::{Namespace, SolverConfig, clause_term, read_assignment};
use crate::semantics::state::Assignment;
use std::collections::BTreeMap;
use std::time::Duration;
use z3::{Optimize, SatResult, Symbol};

/// In-process MaxSAT on the z3 optimizer
#[derive(Debug, Clone, Default)]
pub struct Z3MaxSat {
    config: SolverConfig,
}

impl Z3MaxSat {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl MaxSatSolver for Z3MaxSat {
    fn solve(
        &mut self,
        instance: &MaxSatInstance,
        mode: MaxSatMode,
    ) -> Result<Assignment, OracleError> {
        let primary = |v: Var| Namespace::PRIMARY.var(v);
        let opt = Optimize::new();
        opt.set_params(&self.config.params());
        for clause in &instance.hard {
            opt.assert(&clause_term(clause, &primary));
        }
        match mode {
            MaxSatMode::Exact => {
                for soft in &instance.soft {
                    opt.assert_soft(&clause_term(&soft.clause, &primary), soft.weight, None);
                }
            }
            MaxSatMode::Lexicographic => {
                for level in instance.priority_levels() {
                    for soft in instance.soft.iter().filter(|s| s.priority == level) {
                        opt.assert_soft(
                            &clause_term(&soft.clause, &primary),
                            soft.weight,
                            Some(Symbol::String(format!("level{}", level))),
                        );
                    }
                }
            }
        }

        match opt.check(&[]) {
            SatResult::Sat => {
                let model = opt
                    .get_model()
                    .ok_or_else(|| OracleError::Failure("SAT but no model available".into()))?;
                let vars: Vec<Var> = (1..=instance.num_vars).map(Var).collect();
                Ok(read_assignment(&model, &vars, instance.num_vars, &primary))
            }
            SatResult::Unsat => Err(OracleError::Failure(
                "hard clauses of the MaxSAT instance are unsatisfiable".into(),
            )),
            SatResult::Unknown if self.config.timeout.is_some() => Err(OracleError::Timeout),
            SatResult::Unknown => Err(OracleError::Failure("z3 optimizer returned unknown".into())),
        }
    }
}

/// MaxSAT through an external WCNF solver run on `{input}`
#[derive(Debug, Clone)]
pub struct ExternalMaxSat {
    command: CommandTemplate,
    timeout: Option<Duration>,
}

impl ExternalMaxSat {
    pub fn new(command: CommandTemplate, timeout: Option<Duration>) -> Self {
        Self { command, timeout }
    }

    fn run(
        &mut self,
        instance: &MaxSatInstance,
        extra_hard: &[Clause],
        levels: &[usize],
    ) -> Result<Assignment, OracleError> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("localize.wcnf");
        std::fs::write(&input, write_wcnf(instance, extra_hard, levels))?;
        let mut values = BTreeMap::new();
        values.insert("input", input.display().to_string());
        let outcome = run_with_timeout(&mut self.command.instantiate(&values), self.timeout)?;
        if outcome.timed_out {
            return Err(OracleError::Timeout);
        }
        let parsed = parse_solver_output(&outcome.stdout, instance.num_vars);
        match (parsed.status, parsed.model) {
            (SolverStatus::Optimum | SolverStatus::Satisfiable, Some(model)) => Ok(model),
            (SolverStatus::Unsatisfiable, _) => Err(OracleError::Failure(
                "hard clauses of the MaxSAT instance are unsatisfiable".into(),
            )),
            _ => Err(OracleError::Failure("MaxSAT solver produced no model".into())),
        }
    }
}

impl MaxSatSolver for ExternalMaxSat {
    fn solve(
        &mut self,
        instance: &MaxSatInstance,
        mode: MaxSatMode,
    ) -> Result<Assignment, OracleError> {
        let levels = instance.priority_levels();
        if mode == MaxSatMode::Exact || levels.is_empty() {
            return self.run(instance, &[], &levels);
        }
        let mut hardened: Vec<Clause> = Vec::new();
        let mut model = None;
        for level in levels {
            let m = self.run(instance, &hardened, &[level])?;
            for soft in instance.soft.iter().filter(|s| s.priority == level) {
                if soft.clause.iter().any(|&l| m.lit_value(l)) {
                    hardened.push(soft.clause.clone());
                }
            }
            model = Some(m);
        }
        model.ok_or_else(|| OracleError::Failure("MaxSAT solver produced no model".into()))
    }
}
