//! Boolean intermediate representation: variables, quantified CNF formulas
//! and the expressions used as Skolem function bodies

pub mod expr;
pub mod formula;
pub mod tseitin;
pub mod types;

pub use expr::Expr;
pub use formula::{Clause, Formula, FormulaError, VariableSet};
pub use tseitin::CnfBuilder;
pub use types::{Lit, Var};
