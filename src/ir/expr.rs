//! Boolean expressions used as Skolem function bodies
//!
//! Expressions are small trees over literals. The smart constructors fold
//! constants and flatten nested conjunctions/disjunctions so that learned and
//! repaired definitions stay readable when rendered.

use crate::ir::{Lit, Var};
use crate::semantics::state::Assignment;
use std::collections::BTreeSet;
use std::fmt;

/// A Boolean expression over formula variables
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Const(bool),
    Lit(Lit),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    pub fn t() -> Self {
        Expr::Const(true)
    }

    pub fn f() -> Self {
        Expr::Const(false)
    }

    pub fn lit(lit: Lit) -> Self {
        Expr::Lit(lit)
    }

    /// Negation with constant folding and literal absorption
    pub fn not(e: Expr) -> Self {
        match e {
            Expr::Const(b) => Expr::Const(!b),
            Expr::Lit(l) => Expr::Lit(!l),
            Expr::Not(inner) => *inner,
            other => Expr::Not(Box::new(other)),
        }
    }

    /// Conjunction with constant folding and flattening
    pub fn and(items: impl IntoIterator<Item = Expr>) -> Self {
        let mut out = Vec::new();
        for item in items {
            match item {
                Expr::Const(true) => {}
                Expr::Const(false) => return Expr::Const(false),
                Expr::And(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Expr::Const(true),
            1 => out.pop().unwrap_or(Expr::Const(true)),
            _ => Expr::And(out),
        }
    }

    /// Disjunction with constant folding and flattening
    pub fn or(items: impl IntoIterator<Item = Expr>) -> Self {
        let mut out = Vec::new();
        for item in items {
            match item {
                Expr::Const(false) => {}
                Expr::Const(true) => return Expr::Const(true),
                Expr::Or(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Expr::Const(false),
            1 => out.pop().unwrap_or(Expr::Const(false)),
            _ => Expr::Or(out),
        }
    }

    /// Conjunction of literals
    pub fn cube(lits: &[Lit]) -> Self {
        Expr::and(lits.iter().map(|&l| Expr::Lit(l)))
    }

    /// `if cond then then_value else otherwise` for a constant branch
    pub fn case_split(cond: Expr, then_value: bool, otherwise: Expr) -> Self {
        if then_value {
            Expr::or([cond, otherwise])
        } else {
            Expr::and([Expr::not(cond), otherwise])
        }
    }

    pub fn as_const(&self) -> Option<bool> {
        match self {
            Expr::Const(b) => Some(*b),
            _ => None,
        }
    }

    /// Evaluate under a concrete assignment
    pub fn eval(&self, assignment: &Assignment) -> bool {
        match self {
            Expr::Const(b) => *b,
            Expr::Lit(l) => assignment.lit_value(*l),
            Expr::Not(e) => !e.eval(assignment),
            Expr::And(items) => items.iter().all(|e| e.eval(assignment)),
            Expr::Or(items) => items.iter().any(|e| e.eval(assignment)),
        }
    }

    /// Variables the expression mentions
    pub fn support(&self) -> BTreeSet<Var> {
        let mut out = BTreeSet::new();
        self.collect_support(&mut out);
        out
    }

    fn collect_support(&self, out: &mut BTreeSet<Var>) {
        match self {
            Expr::Const(_) => {}
            Expr::Lit(l) => {
                out.insert(l.var());
            }
            Expr::Not(e) => e.collect_support(out),
            Expr::And(items) | Expr::Or(items) => {
                for e in items {
                    e.collect_support(out);
                }
            }
        }
    }

    /// Number of nodes, used for reporting definition sizes
    pub fn size(&self) -> usize {
        match self {
            Expr::Const(_) | Expr::Lit(_) => 1,
            Expr::Not(e) => 1 + e.size(),
            Expr::And(items) | Expr::Or(items) => 1 + items.iter().map(Expr::size).sum::<usize>(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(true) => write!(f, "1"),
            Expr::Const(false) => write!(f, "0"),
            Expr::Lit(l) if l.is_positive() => write!(f, "v{}", l.var()),
            Expr::Lit(l) => write!(f, "~v{}", l.var()),
            Expr::Not(e) => write!(f, "~({})", e),
            Expr::And(items) => {
                let parts: Vec<String> = items.iter().map(|e| e.to_string()).collect();
                write!(f, "({})", parts.join(" & "))
            }
            Expr::Or(items) => {
                let parts: Vec<String> = items.iter().map(|e| e.to_string()).collect();
                write!(f, "({})", parts.join(" | "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x(i: u32) -> Expr {
        Expr::lit(Var(i).pos())
    }

    #[test]
    fn test_constant_folding() {
        assert_eq!(Expr::and([Expr::t(), x(1)]), x(1));
        assert_eq!(Expr::and([Expr::f(), x(1)]), Expr::f());
        assert_eq!(Expr::or([Expr::f(), Expr::f()]), Expr::f());
        assert_eq!(Expr::or([x(2), Expr::t()]), Expr::t());
        assert_eq!(Expr::not(Expr::not(x(3))), x(3));
        assert_eq!(Expr::not(x(3)), Expr::lit(Var(3).neg()));
    }

    #[test]
    fn test_flattening() {
        let e = Expr::and([Expr::and([x(1), x(2)]), x(3)]);
        assert_eq!(e, Expr::And(vec![x(1), x(2), x(3)]));
    }

    #[test]
    fn test_eval_and_support() {
        let e = Expr::or([Expr::cube(&[Var(1).pos(), Var(2).neg()]), x(3)]);
        let a = Assignment::from_lits(3, [Var(1).pos()]);
        assert!(e.eval(&a));
        let b = Assignment::from_lits(3, [Var(1).pos(), Var(2).pos()]);
        assert!(!e.eval(&b));
        let support: Vec<Var> = e.support().into_iter().collect();
        assert_eq!(support, vec![Var(1), Var(2), Var(3)]);
    }

    #[test]
    fn test_case_split() {
        let cond = x(1);
        let old = x(2);
        let forced_true = Expr::case_split(cond.clone(), true, old.clone());
        let forced_false = Expr::case_split(cond, false, old);
        let a = Assignment::from_lits(2, [Var(1).pos(), Var(2).neg()]);
        assert!(forced_true.eval(&a));
        let b = Assignment::from_lits(2, [Var(1).pos(), Var(2).pos()]);
        assert!(!forced_false.eval(&b));
        let c = Assignment::from_lits(2, [Var(2).pos()]);
        assert!(forced_false.eval(&c));
    }

    #[test]
    fn test_display() {
        let e = Expr::and([x(1), Expr::lit(Var(2).neg())]);
        assert_eq!(e.to_string(), "(v1 & ~v2)");
    }
}
