//! Concrete assignments over formula variables

use crate::ir::{Lit, Var};
use std::fmt;

/// A total assignment to variables `1..=num_vars`
///
/// Samples, counterexample parts and candidate evaluations all use this
/// representation; index 0 is unused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Assignment {
    values: Vec<bool>,
}

impl Assignment {
    /// All-false assignment for variables up to `num_vars`
    pub fn new(num_vars: u32) -> Self {
        Self {
            values: vec![false; num_vars as usize + 1],
        }
    }

    /// Build from a list of literals; unmentioned variables are false
    pub fn from_lits(num_vars: u32, lits: impl IntoIterator<Item = Lit>) -> Self {
        let mut assignment = Self::new(num_vars);
        for lit in lits {
            assignment.set(lit.var(), lit.is_positive());
        }
        assignment
    }

    pub fn num_vars(&self) -> u32 {
        (self.values.len() - 1) as u32
    }

    pub fn get(&self, var: Var) -> bool {
        self.values.get(var.index()).copied().unwrap_or(false)
    }

    pub fn set(&mut self, var: Var, value: bool) {
        let idx = var.index();
        if idx >= self.values.len() {
            self.values.resize(idx + 1, false);
        }
        self.values[idx] = value;
    }

    /// Truth value of a literal under this assignment
    pub fn lit_value(&self, lit: Lit) -> bool {
        lit.eval(self.get(lit.var()))
    }

    /// The literal over `var` that this assignment makes true
    pub fn lit_of(&self, var: Var) -> Lit {
        var.lit(self.get(var))
    }

    /// Copy the values of `vars` from another assignment
    pub fn copy_from(&mut self, other: &Assignment, vars: &[Var]) {
        for &v in vars {
            self.set(v, other.get(v));
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lits: Vec<String> = (1..self.values.len())
            .map(|i| Var(i as u32).lit(self.values[i]).to_string())
            .collect();
        write!(f, "{}", lits.join(" "))
    }
}
