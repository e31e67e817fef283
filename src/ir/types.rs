//! Core types for the Boolean IR: variables and literals

use std::fmt;
use std::ops::Not;

/// A propositional variable, identified by its positive QDIMACS index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(pub u32);

impl Var {
    /// Dense index for assignment vectors (variable ids start at 1)
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Positive literal of this variable
    pub fn pos(self) -> Lit {
        Lit::new(self, true)
    }

    /// Negative literal of this variable
    pub fn neg(self) -> Lit {
        Lit::new(self, false)
    }

    /// Literal that is true exactly when the variable takes `value`
    pub fn lit(self, value: bool) -> Lit {
        Lit::new(self, value)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signed literal in DIMACS convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lit(i32);

impl Lit {
    pub fn new(var: Var, positive: bool) -> Self {
        let v = var.0 as i32;
        Lit(if positive { v } else { -v })
    }

    /// Build a literal from a non-zero DIMACS integer
    pub fn from_dimacs(value: i32) -> Option<Self> {
        if value == 0 { None } else { Some(Lit(value)) }
    }

    pub fn to_dimacs(self) -> i32 {
        self.0
    }

    pub fn var(self) -> Var {
        Var(self.0.unsigned_abs())
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Truth value of the literal when its variable has `value`
    pub fn eval(self, value: bool) -> bool {
        value == self.is_positive()
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit(-self.0)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
