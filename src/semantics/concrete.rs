//! Concrete evaluation of a candidate vector

use crate::semantics::state::Assignment;
use crate::synth::candidate::CandidateVector;

/// Evaluate every candidate in dependency order, starting from the values of
/// the universal variables in `inputs`
///
/// The returned assignment keeps all input values and overwrites each defined
/// existential variable with its candidate output.
pub fn evaluate_candidates(candidates: &CandidateVector, inputs: &Assignment) -> Assignment {
    let mut state = inputs.clone();
    for (var, expr) in candidates.iter() {
        let value = expr.eval(&state);
        state.set(var, value);
    }
    state
}
