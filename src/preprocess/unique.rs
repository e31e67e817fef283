//! Syntactic extraction of uniquely defined existentials
//!
//! Recognizes Tseitin-style gate definitions inside Φ:
//!
//! * AND: `(y ∨ ¬a1 ∨ … ∨ ¬ak)` with `(¬y ∨ ai)` for every i gives y ↔ ⋀ ai
//! * OR:  `(¬y ∨ b1 ∨ … ∨ bk)` with `(y ∨ ¬bi)` for every i gives y ↔ ⋁ bi
//!
//! k = 1 covers plain equivalences.

use crate::ir::{Expr, Formula, Lit, Var};
use crate::preprocess::unate::UnateSets;
use crate::schedule::DependencyGraph;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Unique definitions by variable
pub type UniqueSet = BTreeMap<Var, Expr>;

fn binary_key(a: Lit, b: Lit) -> (i32, i32) {
    let (a, b) = (a.to_dimacs(), b.to_dimacs());
    if a <= b { (a, b) } else { (b, a) }
}

/// Candidate gate definitions of `y`, in clause order
fn gate_definitions(formula: &Formula, binaries: &HashSet<(i32, i32)>, y: Var) -> Vec<Expr> {
    let mut defs = Vec::new();
    for clause in formula.clauses() {
        if clause.len() < 2 {
            continue;
        }
        let Some(&pivot) = clause.iter().find(|l| l.var() == y) else {
            continue;
        };
        let others: Vec<Lit> = clause.iter().copied().filter(|&l| l != pivot).collect();
        if others.len() != clause.len() - 1 || others.iter().any(|l| l.var() == y) {
            continue;
        }
        // every other literal m needs the binary (¬pivot ∨ ¬m)
        if !others
            .iter()
            .all(|&m| binaries.contains(&binary_key(!pivot, !m)))
        {
            continue;
        }
        let def = if pivot.is_positive() {
            Expr::and(others.iter().map(|&m| Expr::lit(!m)))
        } else {
            Expr::or(others.iter().map(|&m| Expr::lit(m)))
        };
        defs.push(def);
    }
    defs
}

/// Extract definitions for existentials that are not unate
///
/// Existentials are visited in ascending id order and the first gate whose
/// existential references keep `graph` acyclic is accepted; accepting adds
/// the edges `ref -> y`.
pub fn extract_unique(
    formula: &Formula,
    unates: &UnateSets,
    graph: &mut DependencyGraph,
) -> UniqueSet {
    let binaries: HashSet<(i32, i32)> = formula
        .clauses()
        .iter()
        .filter(|c| c.len() == 2)
        .map(|c| binary_key(c[0], c[1]))
        .collect();
    let mut ys: Vec<Var> = formula.existentials().to_vec();
    ys.sort();

    let mut unique = UniqueSet::new();
    for y in ys {
        if unates.contains(y) {
            continue;
        }
        for def in gate_definitions(formula, &binaries, y) {
            let refs: BTreeSet<Var> = def
                .support()
                .into_iter()
                .filter(|&v| formula.vars().is_existential(v))
                .collect();
            if refs.iter().any(|&r| graph.would_create_cycle(r, y)) {
                continue;
            }
            for &r in &refs {
                graph.add_dependency(r, y);
            }
            log::debug!("{} is uniquely defined as {}", y, def);
            unique.insert(y, def);
            break;
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::VariableSet;
    use crate::semantics::state::Assignment;

    fn formula(xs: &[u32], ys: &[u32], clauses: &[&[i32]]) -> Formula {
        let vars = VariableSet::new(
            xs.iter().map(|&v| Var(v)).collect(),
            ys.iter().map(|&v| Var(v)).collect(),
        )
        .unwrap();
        let clauses = clauses
            .iter()
            .map(|c| c.iter().filter_map(|&l| Lit::from_dimacs(l)).collect())
            .collect();
        Formula::new(vars, clauses).unwrap()
    }

    #[test]
    fn test_equivalence_extracted() {
        // y2 ≡ x1
        let f = formula(&[1], &[2], &[&[-1, 2], &[1, -2]]);
        let mut g = DependencyGraph::new(f.existentials());
        let unique = extract_unique(&f, &UnateSets::default(), &mut g);
        assert_eq!(unique.get(&Var(2)), Some(&Expr::lit(Var(1).pos())));
    }

    #[test]
    fn test_and_gate_extracted() {
        // y3 ↔ x1 ∧ ¬x2
        let f = formula(&[1, 2], &[3], &[&[3, -1, 2], &[-3, 1], &[-3, -2]]);
        let mut g = DependencyGraph::new(f.existentials());
        let unique = extract_unique(&f, &UnateSets::default(), &mut g);
        let def = &unique[&Var(3)];
        for bits in 0..4u32 {
            let a = Assignment::from_lits(
                3,
                [Var(1).lit(bits & 1 != 0), Var(2).lit(bits & 2 != 0)],
            );
            assert_eq!(def.eval(&a), a.get(Var(1)) && !a.get(Var(2)));
        }
    }

    #[test]
    fn test_or_gate_adds_dependency_edge() {
        // y3 ↔ x1 ∨ y4
        let f = formula(&[1], &[3, 4], &[&[-3, 1, 4], &[3, -1], &[3, -4]]);
        let mut g = DependencyGraph::new(f.existentials());
        let unique = extract_unique(&f, &UnateSets::default(), &mut g);
        assert!(unique.contains_key(&Var(3)));
        assert!(g.has_edge(Var(4), Var(3)));
        // no gate defines y4
        assert!(!unique.contains_key(&Var(4)));
    }

    #[test]
    fn test_missing_binary_means_no_definition() {
        let f = formula(&[1, 2], &[3], &[&[3, -1, -2], &[-3, 1]]);
        let mut g = DependencyGraph::new(f.existentials());
        assert!(extract_unique(&f, &UnateSets::default(), &mut g).is_empty());
    }

    #[test]
    fn test_unates_skipped() {
        let f = formula(&[1], &[2], &[&[-1, 2], &[1, -2]]);
        let mut g = DependencyGraph::new(f.existentials());
        let mut unates = UnateSets::default();
        unates.positive.insert(Var(2));
        assert!(extract_unique(&f, &unates, &mut g).is_empty());
    }
}
