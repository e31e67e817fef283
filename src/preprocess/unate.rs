//! Constant-function (unate) detection
//!
//! An existential `y` is positive unate when setting it to true never hurts:
//! Φ[y:=0] → Φ[y:=1] for every assignment to the other variables. Such a `y`
//! can always be fixed to true; negative unates are the dual.

use crate::ir::{Clause, Formula, Var};
use crate::oracle::process::{CommandTemplate, run_with_timeout};
use crate::oracle::OracleError;
use crate::semantics::smt::{Namespace, SolverConfig, cnf_term, create_solver_with_config, decide};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::time::{Duration, Instant};
use z3::ast::Bool;

/// Existential variables with a constant Skolem function
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnateSets {
    pub positive: BTreeSet<Var>,
    pub negative: BTreeSet<Var>,
}

impl UnateSets {
    pub fn len(&self) -> usize {
        self.positive.len() + self.negative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, var: Var) -> bool {
        self.positive.contains(&var) || self.negative.contains(&var)
    }

    /// The constant value of a unate variable
    #[cfg(test)]
    pub fn value(&self, var: Var) -> Option<bool> {
        if self.positive.contains(&var) {
            Some(true)
        } else if self.negative.contains(&var) {
            Some(false)
        } else {
            None
        }
    }
}

pub trait UnateDetector {
    fn detect(&mut self, formula: &Formula) -> Result<UnateSets, OracleError>;
}

/// z3 based detector, iterated to a fixpoint
///
/// Each round checks every undecided existential against the clauses plus
/// the units of the unates found so far; a round that finds nothing ends the
/// search. The whole search shares one wall-clock budget.
#[derive(Debug, Clone)]
pub struct Z3UnateDetector {
    budget: Option<Duration>,
}

impl Z3UnateDetector {
    pub fn new(budget: Option<Duration>) -> Self {
        Self { budget }
    }

    fn is_unate(
        &self,
        clauses: &[Clause],
        y: Var,
        positive: bool,
        deadline: Option<Instant>,
    ) -> Result<bool, OracleError> {
        let config = match deadline {
            Some(d) => {
                let remaining = d.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(OracleError::Timeout);
                }
                SolverConfig::with_timeout(remaining)
            }
            None => SolverConfig::no_timeout(),
        };
        let with = |value: bool| {
            move |v: Var| {
                if v == y {
                    Bool::from_bool(value)
                } else {
                    Namespace::PRIMARY.var(v)
                }
            }
        };
        let solver = create_solver_with_config(&config);
        solver.assert(&cnf_term(clauses, &with(!positive)));
        solver.assert(&cnf_term(clauses, &with(positive)).not());
        Ok(!decide(&solver, solver.check())?)
    }
}

impl UnateDetector for Z3UnateDetector {
    fn detect(&mut self, formula: &Formula) -> Result<UnateSets, OracleError> {
        let deadline = self.budget.map(|b| Instant::now() + b);
        let mut clauses: Vec<Clause> = formula.clauses().to_vec();
        let mut sets = UnateSets::default();

        loop {
            let mut found = false;
            for &y in formula.existentials() {
                if sets.contains(y) {
                    continue;
                }
                for positive in [true, false] {
                    if self.is_unate(&clauses, y, positive, deadline)? {
                        log::debug!(
                            "{} is {} unate",
                            y,
                            if positive { "positive" } else { "negative" }
                        );
                        if positive {
                            sets.positive.insert(y);
                        } else {
                            sets.negative.insert(y);
                        }
                        clauses.push(vec![y.lit(positive)]);
                        found = true;
                        break;
                    }
                }
            }
            if !found {
                return Ok(sets);
            }
        }
    }
}

/// Detector that runs an external binary on `{input}` and reads the
/// `Posunate:` / `Negunate:` lines it writes to `{input}_vardetails`
#[derive(Debug, Clone)]
pub struct ExternalUnateDetector {
    command: CommandTemplate,
    timeout: Option<Duration>,
}

impl ExternalUnateDetector {
    pub fn new(command: CommandTemplate, timeout: Option<Duration>) -> Self {
        Self { command, timeout }
    }
}

/// CNF with the quantifier prefix as `c ret` / `c ind` comment lines
fn annotated_cnf(formula: &Formula) -> String {
    let mut out = format!("p cnf {} {}\n", formula.num_vars(), formula.clauses().len());
    out.push_str("c ret ");
    for v in formula.universals() {
        let _ = write!(out, "{} ", v);
    }
    out.push_str("0\nc ind ");
    for v in formula.existentials() {
        let _ = write!(out, "{} ", v);
    }
    out.push_str("0\n");
    for clause in formula.clauses() {
        for l in clause {
            let _ = write!(out, "{} ", l);
        }
        out.push_str("0\n");
    }
    out
}

/// Parse the detector's report; variables outside Y are ignored
pub fn parse_vardetails(text: &str, formula: &Formula) -> UnateSets {
    let read = |rest: &str| -> BTreeSet<Var> {
        rest.split_whitespace()
            .filter_map(|t| t.parse::<u32>().ok())
            .map(Var)
            .filter(|&v| formula.vars().is_existential(v))
            .collect()
    };
    let mut sets = UnateSets::default();
    for line in text.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        if key.contains("Posunate") {
            sets.positive = read(rest);
        } else if key.contains("Negunate") {
            sets.negative = read(rest);
        }
    }
    // a variable cannot be both
    let both: Vec<Var> = sets.positive.intersection(&sets.negative).copied().collect();
    for v in both {
        sets.negative.remove(&v);
    }
    sets
}

impl UnateDetector for ExternalUnateDetector {
    fn detect(&mut self, formula: &Formula) -> Result<UnateSets, OracleError> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("preprocess.cnf");
        std::fs::write(&input, annotated_cnf(formula))?;
        let mut values = BTreeMap::new();
        values.insert("input", input.display().to_string());
        let outcome = run_with_timeout(&mut self.command.instantiate(&values), self.timeout)?;
        if outcome.timed_out {
            return Err(OracleError::Timeout);
        }
        let details = dir.path().join("preprocess.cnf_vardetails");
        let text = std::fs::read_to_string(&details).map_err(|e| {
            OracleError::Failure(format!("detector wrote no variable details: {}", e))
        })?;
        Ok(parse_vardetails(&text, formula))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::VariableSet;

    fn formula(xs: &[u32], ys: &[u32], clauses: &[&[i32]]) -> Formula {
        let vars = VariableSet::new(
            xs.iter().map(|&v| Var(v)).collect(),
            ys.iter().map(|&v| Var(v)).collect(),
        )
        .unwrap();
        let clauses = clauses
            .iter()
            .map(|c| c.iter().filter_map(|&l| crate::ir::Lit::from_dimacs(l)).collect())
            .collect();
        Formula::new(vars, clauses).unwrap()
    }

    #[test]
    fn test_positive_unate_found() {
        // (y) ∧ (¬y ∨ x)
        let f = formula(&[1], &[2], &[&[2], &[-2, 1]]);
        let sets = Z3UnateDetector::new(None).detect(&f).unwrap();
        assert!(sets.positive.contains(&Var(2)));
        assert!(sets.negative.is_empty());
    }

    #[test]
    fn test_dependent_variable_is_not_unate() {
        // y ≡ x
        let f = formula(&[1], &[2], &[&[-1, 2], &[1, -2]]);
        let sets = Z3UnateDetector::new(Some(Duration::from_secs(30)))
            .detect(&f)
            .unwrap();
        assert!(sets.is_empty());
    }

    #[test]
    fn test_negative_unate_found() {
        // (¬y ∨ x): y = 0 always works
        let f = formula(&[1], &[2], &[&[-2, 1]]);
        let sets = Z3UnateDetector::new(None).detect(&f).unwrap();
        assert_eq!(sets.value(Var(2)), Some(false));
    }

    #[test]
    fn test_parse_vardetails() {
        let f = formula(&[1], &[2, 3, 4], &[&[1, 2, 3, 4]]);
        let sets = parse_vardetails("Posunate: 2 4\nNegunate: 3 1\nother\n", &f);
        assert_eq!(sets.positive, BTreeSet::from([Var(2), Var(4)]));
        assert_eq!(sets.negative, BTreeSet::from([Var(3)]));
    }

    #[test]
    fn test_annotated_cnf_has_prefix_comments() {
        let f = formula(&[1], &[2], &[&[-1, 2]]);
        let text = annotated_cnf(&f);
        assert!(text.contains("c ret 1 0\n"));
        assert!(text.contains("c ind 2 0\n"));
    }

    #[test]
    fn test_external_timeout_reported() {
        let f = formula(&[1], &[2], &[&[-1, 2]]);
        let cmd = CommandTemplate::parse("sleep 5").unwrap();
        let mut detector = ExternalUnateDetector::new(cmd, Some(Duration::from_millis(100)));
        assert!(matches!(detector.detect(&f), Err(OracleError::Timeout)));
    }
}
