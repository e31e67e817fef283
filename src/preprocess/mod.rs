//! Trivial-function classification: unate and uniquely defined existentials
//!
//! Runs before any learning. Unates become unit clauses of the working
//! formula; unique definitions add their edges to the dependency graph.

pub mod unate;
pub mod unique;

pub use unate::{ExternalUnateDetector, UnateDetector, UnateSets, Z3UnateDetector};
pub use unique::{UniqueSet, extract_unique};

use crate::error::{Result, Stage};
use crate::ir::{Formula, Var};
use crate::oracle::OracleError;

/// Unate detection is skipped on formulas with this many existentials
pub const UNATE_SIZE_LIMIT: usize = 20000;

/// What the classifier found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub unates: UnateSets,
    pub unique: UniqueSet,
}

impl Classification {
    /// Existentials still to be learned, in the formula's declaration order
    pub fn learnable(&self, formula: &Formula) -> Vec<Var> {
        formula
            .existentials()
            .iter()
            .copied()
            .filter(|&v| !self.unates.contains(v) && !self.unique.contains_key(&v))
            .collect()
    }

    /// Unates and unique definitions already cover every existential
    pub fn covers_all(&self, formula: &Formula) -> bool {
        self.learnable(formula).is_empty()
    }
}

/// Run the unate detector, degrading to empty sets on timeout
pub fn detect_unates(
    formula: &Formula,
    detector: &mut dyn UnateDetector,
    enabled: bool,
) -> Result<UnateSets> {
    if !enabled {
        log::info!("unate detection disabled");
        return Ok(UnateSets::default());
    }
    if formula.existentials().len() >= UNATE_SIZE_LIMIT {
        log::info!(
            "skipping unate detection: {} existentials",
            formula.existentials().len()
        );
        return Ok(UnateSets::default());
    }
    match detector.detect(formula) {
        Ok(sets) => {
            log::info!(
                "found {} positive and {} negative unates",
                sets.positive.len(),
                sets.negative.len()
            );
            Ok(sets)
        }
        Err(OracleError::Timeout) => {
            log::warn!("unate detection timed out, continuing without unates");
            Ok(UnateSets::default())
        }
        Err(err) => Err(err.at(Stage::Preprocess)),
    }
}

/// Append the unit clauses fixing every unate
pub fn apply_unates(formula: &mut Formula, unates: &UnateSets) {
    for &v in &unates.positive {
        formula.add_unit(v.pos());
    }
    for &v in &unates.negative {
        formula.add_unit(v.neg());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::VariableSet;

    struct SlowDetector;

    impl UnateDetector for SlowDetector {
        fn detect(&mut self, _formula: &Formula) -> std::result::Result<UnateSets, OracleError> {
            Err(OracleError::Timeout)
        }
    }

    struct BrokenDetector;

    impl UnateDetector for BrokenDetector {
        fn detect(&mut self, _formula: &Formula) -> std::result::Result<UnateSets, OracleError> {
            Err(OracleError::Failure("crashed".into()))
        }
    }

    fn small() -> Formula {
        let vars = VariableSet::new(vec![Var(1)], vec![Var(2), Var(3)]).unwrap();
        Formula::new(vars, vec![vec![Var(1).pos(), Var(2).pos(), Var(3).pos()]]).unwrap()
    }

    #[test]
    fn test_timeout_degrades_to_empty() {
        let sets = detect_unates(&small(), &mut SlowDetector, true).unwrap();
        assert!(sets.is_empty());
    }

    #[test]
    fn test_failure_is_fatal() {
        assert!(detect_unates(&small(), &mut BrokenDetector, true).is_err());
    }

    #[test]
    fn test_disabled_skips_detector() {
        let sets = detect_unates(&small(), &mut BrokenDetector, false).unwrap();
        assert!(sets.is_empty());
    }

    #[test]
    fn test_units_appended_and_learnable_shrinks() {
        let mut f = small();
        let mut c = Classification::default();
        c.unates.positive.insert(Var(3));
        apply_unates(&mut f, &c.unates);
        assert_eq!(f.clauses().last(), Some(&vec![Var(3).pos()]));
        assert_eq!(c.learnable(&f), vec![Var(2)]);
        assert!(!c.covers_all(&f));
        c.unique.insert(Var(2), crate::ir::Expr::t());
        assert!(c.covers_all(&f));
    }
}
