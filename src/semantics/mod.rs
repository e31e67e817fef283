//! Semantics of candidate vectors: concrete evaluation, z3 encoding and the
//! error formula used for verification

pub mod concrete;
pub mod equivalence;
pub mod smt;
pub mod state;

pub use concrete::evaluate_candidates;
#[allow(unused_imports)]
pub use equivalence::{ErrorFormula, Z3Verifier};
#[allow(unused_imports)]
pub use smt::SolverConfig;
#[allow(unused_imports)]
pub use state::Assignment;
