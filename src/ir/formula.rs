//! Quantified CNF formulas: variable partition and clause set

use crate::ir::{Lit, Var};
use crate::semantics::state::Assignment;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// A clause is an ordered disjunction of literals
pub type Clause = Vec<Lit>;

/// Structural problems with a formula
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("no universally quantified variables (X) declared")]
    NoUniversals,
    #[error("no existentially quantified variables (Y) declared")]
    NoExistentials,
    #[error("formula has no clauses")]
    NoClauses,
    #[error("variable {0} is quantified both universally and existentially")]
    Overlap(Var),
    #[error("variable {0} is quantified more than once")]
    Duplicate(Var),
}

/// Disjoint universal (X) and existential (Y) variable sets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSet {
    universals: Vec<Var>,
    existentials: Vec<Var>,
    universal_set: BTreeSet<Var>,
    existential_set: BTreeSet<Var>,
}

impl VariableSet {
    pub fn new(universals: Vec<Var>, existentials: Vec<Var>) -> Result<Self, FormulaError> {
        if universals.is_empty() {
            return Err(FormulaError::NoUniversals);
        }
        if existentials.is_empty() {
            return Err(FormulaError::NoExistentials);
        }
        let mut universal_set = BTreeSet::new();
        for &v in &universals {
            if !universal_set.insert(v) {
                return Err(FormulaError::Duplicate(v));
            }
        }
        let mut existential_set = BTreeSet::new();
        for &v in &existentials {
            if universal_set.contains(&v) {
                return Err(FormulaError::Overlap(v));
            }
            if !existential_set.insert(v) {
                return Err(FormulaError::Duplicate(v));
            }
        }
        Ok(Self {
            universals,
            existentials,
            universal_set,
            existential_set,
        })
    }

    /// Universal variables in declaration order
    pub fn universals(&self) -> &[Var] {
        &self.universals
    }

    /// Existential variables in declaration order
    pub fn existentials(&self) -> &[Var] {
        &self.existentials
    }

    pub fn is_universal(&self, var: Var) -> bool {
        self.universal_set.contains(&var)
    }

    pub fn is_existential(&self, var: Var) -> bool {
        self.existential_set.contains(&var)
    }

    /// Largest variable id in either set
    pub fn max_var(&self) -> u32 {
        self.universals
            .iter()
            .chain(self.existentials.iter())
            .map(|v| v.0)
            .max()
            .unwrap_or(0)
    }
}

/// The matrix Φ(X, Y) together with its quantifier prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    vars: VariableSet,
    clauses: Vec<Clause>,
    num_vars: u32,
}

impl Formula {
    /// Build a formula; every literal must range over X ∪ Y
    pub fn new(vars: VariableSet, clauses: Vec<Clause>) -> Result<Self, FormulaError> {
        if clauses.is_empty() {
            return Err(FormulaError::NoClauses);
        }
        let num_vars = clauses
            .iter()
            .flatten()
            .map(|l| l.var().0)
            .max()
            .unwrap_or(0)
            .max(vars.max_var());
        Ok(Self {
            vars,
            clauses,
            num_vars,
        })
    }

    pub fn vars(&self) -> &VariableSet {
        &self.vars
    }

    pub fn universals(&self) -> &[Var] {
        self.vars.universals()
    }

    pub fn existentials(&self) -> &[Var] {
        self.vars.existentials()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    /// Append a unit clause fixing `lit`
    pub fn add_unit(&mut self, lit: Lit) {
        self.clauses.push(vec![lit]);
    }

    /// Check whether an assignment satisfies every clause
    pub fn is_satisfied_by(&self, assignment: &Assignment) -> bool {
        self.clauses
            .iter()
            .all(|c| c.iter().any(|&l| assignment.lit_value(l)))
    }

    /// Existential variables that co-occur with `var` in some clause
    pub fn existential_neighbours(&self, var: Var) -> BTreeSet<Var> {
        let mut out = BTreeSet::new();
        for clause in &self.clauses {
            if clause.iter().any(|l| l.var() == var) {
                for l in clause {
                    let v = l.var();
                    if v != var && self.vars.is_existential(v) {
                        out.insert(v);
                    }
                }
            }
        }
        out
    }

    /// Render as plain DIMACS CNF (quantifier lines become comments)
    pub fn to_dimacs(&self) -> String {
        let mut s = format!("p cnf {} {}\n", self.num_vars, self.clauses.len());
        for clause in &self.clauses {
            for l in clause {
                s.push_str(&format!("{} ", l));
            }
            s.push_str("0\n");
        }
        s
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "p cnf {} {}", self.num_vars, self.clauses.len())?;
        let a: Vec<String> = self.universals().iter().map(|v| v.to_string()).collect();
        writeln!(f, "a {} 0", a.join(" "))?;
        let e: Vec<String> = self.existentials().iter().map(|v| v.to_string()).collect();
        writeln!(f, "e {} 0", e.join(" "))?;
        for clause in &self.clauses {
            let lits: Vec<String> = clause.iter().map(|l| l.to_string()).collect();
            writeln!(f, "{} 0", lits.join(" "))?;
        }
        Ok(())
    }
}
