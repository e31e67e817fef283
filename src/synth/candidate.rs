//! The candidate Skolem vector

use crate::ir::{Expr, Var};
use std::collections::BTreeMap;
use std::fmt;

/// How a definition was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    PositiveUnate,
    NegativeUnate,
    Unique,
    Learned,
}

impl Origin {
    /// Learned definitions are the only ones the repair loop may touch
    pub fn is_repairable(self) -> bool {
        self == Origin::Learned
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::PositiveUnate => write!(f, "positive unate"),
            Origin::NegativeUnate => write!(f, "negative unate"),
            Origin::Unique => write!(f, "unique"),
            Origin::Learned => write!(f, "learned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Definition {
    expr: Expr,
    origin: Origin,
}

/// One definition per existential variable, kept in dependency order
///
/// A definition for `y` may reference universal variables and existential
/// variables that come before `y` in the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateVector {
    order: Vec<Var>,
    position: BTreeMap<Var, usize>,
    defs: BTreeMap<Var, Definition>,
}

impl CandidateVector {
    pub fn new(order: Vec<Var>) -> Self {
        let position = order.iter().enumerate().map(|(i, &v)| (v, i)).collect();
        Self {
            order,
            position,
            defs: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, var: Var, expr: Expr, origin: Origin) {
        self.defs.insert(var, Definition { expr, origin });
    }

    /// Replace the body of a repairable definition, keeping its origin
    ///
    /// Returns false, leaving the vector unchanged, if `var` has no
    /// definition or its definition is fixed.
    pub fn replace(&mut self, var: Var, expr: Expr) -> bool {
        match self.defs.get_mut(&var) {
            Some(def) if def.origin.is_repairable() => {
                def.expr = expr;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, var: Var) -> Option<&Expr> {
        self.defs.get(&var).map(|d| &d.expr)
    }

    pub fn origin(&self, var: Var) -> Option<Origin> {
        self.defs.get(&var).map(|d| d.origin)
    }

    pub fn order(&self) -> &[Var] {
        &self.order
    }

    pub fn position(&self, var: Var) -> Option<usize> {
        self.position.get(&var).copied()
    }

    /// Every variable in the order has a definition
    pub fn is_complete(&self) -> bool {
        self.order.iter().all(|v| self.defs.contains_key(v))
    }

    /// Defined variables with their bodies, in dependency order
    pub fn iter(&self) -> impl Iterator<Item = (Var, &Expr)> + '_ {
        self.order
            .iter()
            .filter_map(|&v| self.defs.get(&v).map(|d| (v, &d.expr)))
    }

    /// Learned variables in dependency order
    pub fn learned(&self) -> Vec<Var> {
        self.with_origin(Origin::Learned)
    }

    pub fn with_origin(&self, origin: Origin) -> Vec<Var> {
        self.order
            .iter()
            .copied()
            .filter(|v| self.origin(*v) == Some(origin))
            .collect()
    }

    /// Every referenced existential comes strictly earlier in the order
    pub fn respects_order(&self) -> bool {
        self.iter().all(|(var, expr)| {
            let pos = self.position(var);
            expr.support()
                .into_iter()
                .filter_map(|dep| self.position(dep))
                .all(|dep_pos| Some(dep_pos) < pos)
        })
    }
}
