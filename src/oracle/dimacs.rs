//! Text formats exchanged with external solvers
//!
//! * plain DIMACS CNF for SAT solvers and samplers,
//! * DIMACS with `w <var> <probability>` lines for weighted samplers,
//! * WCNF for MaxSAT solvers,
//! * solver output (`s`, `v`, `o` lines) and sample files.

use crate::ir::{Clause, Var};
use crate::oracle::{MaxSatInstance, SoftClause};
use crate::semantics::state::Assignment;
use std::collections::BTreeMap;
use std::fmt::Write as _;

fn push_clause(out: &mut String, clause: &Clause) {
    for l in clause {
        let _ = write!(out, "{} ", l);
    }
    out.push_str("0\n");
}

/// Plain DIMACS CNF; `sampling_set` becomes a `c ind` projection line
pub fn write_cnf(num_vars: u32, clauses: &[Clause], sampling_set: &[Var]) -> String {
    let mut out = format!("p cnf {} {}\n", num_vars, clauses.len());
    if !sampling_set.is_empty() {
        out.push_str("c ind ");
        for v in sampling_set {
            let _ = write!(out, "{} ", v);
        }
        out.push_str("0\n");
    }
    for clause in clauses {
        push_clause(&mut out, clause);
    }
    out
}

/// DIMACS CNF followed by per-variable sampling weights
pub fn write_weighted_cnf(
    num_vars: u32,
    clauses: &[Clause],
    sampling_set: &[Var],
    weights: &BTreeMap<Var, f64>,
) -> String {
    let mut out = write_cnf(num_vars, clauses, sampling_set);
    for (v, w) in weights {
        let _ = writeln!(out, "w {} {}", v, w);
    }
    out
}

/// WCNF with hard clauses at weight `top`
///
/// Only soft clauses whose priority is in `levels` are emitted; callers
/// stratify lexicographic instances by passing one level at a time.
pub fn write_wcnf(instance: &MaxSatInstance, extra_hard: &[Clause], levels: &[usize]) -> String {
    let soft: Vec<&SoftClause> = instance
        .soft
        .iter()
        .filter(|s| levels.contains(&s.priority))
        .collect();
    let top: u64 = soft.iter().map(|s| s.weight).sum::<u64>() + 1;
    let num_clauses = instance.hard.len() + extra_hard.len() + soft.len();
    let mut out = format!("p wcnf {} {} {}\n", instance.num_vars, num_clauses, top);
    for clause in instance.hard.iter().chain(extra_hard) {
        let _ = write!(out, "{} ", top);
        push_clause(&mut out, clause);
    }
    for s in soft {
        let _ = write!(out, "{} ", s.weight);
        push_clause(&mut out, &s.clause);
    }
    out
}

/// Satisfiability verdict reported on an `s` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    Satisfiable,
    Unsatisfiable,
    Optimum,
    Unknown,
}

/// Parsed solver output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverOutput {
    pub status: SolverStatus,
    pub model: Option<Assignment>,
    pub cost: Option<u64>,
}

/// Parse competition-format solver output
///
/// `v` lines may list signed literals or, as newer MaxSAT solvers print, a
/// single 0/1 string indexed from variable 1.
pub fn parse_solver_output(text: &str, num_vars: u32) -> SolverOutput {
    let mut status = SolverStatus::Unknown;
    let mut cost = None;
    let mut model: Option<Assignment> = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("s ") {
            status = match rest.trim() {
                "SATISFIABLE" => SolverStatus::Satisfiable,
                "UNSATISFIABLE" => SolverStatus::Unsatisfiable,
                "OPTIMUM FOUND" => SolverStatus::Optimum,
                _ => SolverStatus::Unknown,
            };
        } else if let Some(rest) = line.strip_prefix("o ") {
            cost = rest.trim().parse().ok();
        } else if let Some(rest) = line.strip_prefix('v') {
            let m = model.get_or_insert_with(|| Assignment::new(num_vars));
            let tokens: Vec<&str> = rest.split_whitespace().collect();
            if let [bits] = tokens.as_slice()
                && bits.len() > 1
                && bits.chars().all(|c| c == '0' || c == '1')
            {
                for (i, c) in bits.chars().enumerate() {
                    m.set(Var(i as u32 + 1), c == '1');
                }
                continue;
            }
            for tok in tokens {
                if let Ok(value) = tok.parse::<i32>()
                    && value != 0
                {
                    m.set(Var(value.unsigned_abs()), value > 0);
                }
            }
        }
    }
    SolverOutput {
        status,
        model,
        cost,
    }
}

/// Parse a sample file: one assignment per line as signed literals
///
/// Lines may carry a leading `v` and a trailing `0`; a `0:<count>` suffix as
/// printed by some samplers is ignored. Comment and blank lines are skipped.
pub fn parse_samples(text: &str, num_vars: u32) -> Vec<Assignment> {
    let mut samples = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('c') {
            continue;
        }
        let body = line.strip_prefix('v').unwrap_or(line);
        let body = body.split(':').next().unwrap_or(body);
        let mut assignment = Assignment::new(num_vars);
        let mut any = false;
        for tok in body.split_whitespace() {
            if let Ok(value) = tok.parse::<i32>()
                && value != 0
            {
                assignment.set(Var(value.unsigned_abs()), value > 0);
                any = true;
            }
        }
        if any {
            samples.push(assignment);
        }
    }
    samples
}
