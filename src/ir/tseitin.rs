//! Tseitin encoding of expressions into CNF
//!
//! Used when a query has to be shipped to an external DIMACS tool.

use crate::ir::{Clause, Expr, Lit, Var};

/// Accumulates clauses and hands out fresh auxiliary variables
#[derive(Debug, Clone)]
pub struct CnfBuilder {
    next_var: u32,
    clauses: Vec<Clause>,
    true_lit: Option<Lit>,
}

impl CnfBuilder {
    /// Auxiliary variables are allocated above `max_var`
    pub fn new(max_var: u32) -> Self {
        Self {
            next_var: max_var + 1,
            clauses: Vec::new(),
            true_lit: None,
        }
    }

    pub fn fresh(&mut self) -> Var {
        let v = Var(self.next_var);
        self.next_var += 1;
        v
    }

    pub fn add_clause(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    pub fn num_vars(&self) -> u32 {
        self.next_var - 1
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn into_clauses(self) -> Vec<Clause> {
        self.clauses
    }

    fn constant(&mut self, value: bool) -> Lit {
        let t = match self.true_lit {
            Some(t) => t,
            None => {
                let t = self.fresh().pos();
                self.clauses.push(vec![t]);
                self.true_lit = Some(t);
                t
            }
        };
        if value { t } else { !t }
    }

    /// Literal equivalent to the disjunction of `lits`
    pub fn or_gate(&mut self, lits: &[Lit]) -> Lit {
        match lits {
            [] => self.constant(false),
            [l] => *l,
            _ => {
                let g = self.fresh().pos();
                let mut long = vec![!g];
                for &l in lits {
                    self.clauses.push(vec![g, !l]);
                    long.push(l);
                }
                self.clauses.push(long);
                g
            }
        }
    }

    /// Literal equivalent to the conjunction of `lits`
    pub fn and_gate(&mut self, lits: &[Lit]) -> Lit {
        let negated: Vec<Lit> = lits.iter().map(|&l| !l).collect();
        !self.or_gate(&negated)
    }

    /// Encode `expr`, mapping every variable through `rename`
    pub fn encode(&mut self, expr: &Expr, rename: &impl Fn(Var) -> Var) -> Lit {
        match expr {
            Expr::Const(b) => self.constant(*b),
            Expr::Lit(l) => rename(l.var()).lit(l.is_positive()),
            Expr::Not(e) => !self.encode(e, rename),
            Expr::And(items) => {
                let lits: Vec<Lit> = items.iter().map(|e| self.encode(e, rename)).collect();
                self.and_gate(&lits)
            }
            Expr::Or(items) => {
                let lits: Vec<Lit> = items.iter().map(|e| self.encode(e, rename)).collect();
                self.or_gate(&lits)
            }
        }
    }
}
