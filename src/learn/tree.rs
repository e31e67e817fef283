//! Decision trees over Boolean features
//!
//! CART with Gini impurity, averaged over outputs for multi-output trees.
//! A node is split on the feature with the largest weighted impurity
//! decrease
//!
//!   N_t / N * (I(t) - N_l / N_t * I(l) - N_r / N_t * I(r))
//!
//! provided the decrease reaches `min_impurity_decrease`. Features are
//! visited in a seeded random permutation at every node and the first best
//! split wins. The tree is stored as an arena of nodes addressed by index.

use crate::ir::{Expr, Lit, Var};
use crate::learn::dataset::Dataset;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::fmt;

const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub min_impurity_decrease: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Split {
        feature: Var,
        /// Child for feature = 0
        low: usize,
        /// Child for feature = 1
        high: usize,
    },
    /// Majority value per output
    Leaf { values: Vec<bool>, samples: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub parent: Option<usize>,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    outputs: usize,
}

/// Mean Gini impurity over all outputs of the rows in `rows`
fn impurity(data: &Dataset, rows: &[usize]) -> f64 {
    if rows.is_empty() || data.num_outputs() == 0 {
        return 0.0;
    }
    let n = rows.len() as f64;
    let total: f64 = data
        .labels
        .iter()
        .map(|column| {
            let p = rows.iter().filter(|&&r| column[r]).count() as f64 / n;
            1.0 - p * p - (1.0 - p) * (1.0 - p)
        })
        .sum();
    total / data.num_outputs() as f64
}

/// Majority label per output; ties go to false
fn majority(data: &Dataset, rows: &[usize]) -> Vec<bool> {
    data.labels
        .iter()
        .map(|column| {
            let ones = rows.iter().filter(|&&r| column[r]).count();
            ones * 2 > rows.len()
        })
        .collect()
}

struct Pending {
    node: usize,
    rows: Vec<usize>,
}

impl DecisionTree {
    pub fn fit(data: &Dataset, params: &TreeParams) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let total = data.num_samples().max(1) as f64;
        let mut tree = DecisionTree {
            nodes: vec![Node {
                parent: None,
                kind: NodeKind::Leaf {
                    values: Vec::new(),
                    samples: 0,
                },
            }],
            outputs: data.num_outputs(),
        };
        // depth-first, low child first, so the rng stream is reproducible
        let mut stack = vec![Pending {
            node: 0,
            rows: (0..data.num_samples()).collect(),
        }];

        while let Some(Pending { node, rows }) = stack.pop() {
            let node_impurity = impurity(data, &rows);
            let mut best: Option<(f64, usize, Vec<usize>, Vec<usize>)> = None;

            if rows.len() >= 2 && node_impurity > EPSILON {
                let mut order: Vec<usize> = (0..data.features.len()).collect();
                order.shuffle(&mut rng);
                let n_t = rows.len() as f64;
                for f in order {
                    let column = &data.columns[f];
                    let (high, low): (Vec<usize>, Vec<usize>) =
                        rows.iter().partition(|&&r| column[r]);
                    if high.is_empty() || low.is_empty() {
                        continue;
                    }
                    let child = (low.len() as f64 / n_t) * impurity(data, &low)
                        + (high.len() as f64 / n_t) * impurity(data, &high);
                    let decrease = n_t / total * (node_impurity - child);
                    if best.as_ref().is_none_or(|(d, ..)| decrease > *d) {
                        best = Some((decrease, f, low, high));
                    }
                }
            }

            match best {
                Some((decrease, f, low, high))
                    if decrease + EPSILON >= params.min_impurity_decrease =>
                {
                    let low_id = tree.push_placeholder(node);
                    let high_id = tree.push_placeholder(node);
                    tree.nodes[node].kind = NodeKind::Split {
                        feature: data.features[f],
                        low: low_id,
                        high: high_id,
                    };
                    stack.push(Pending {
                        node: high_id,
                        rows: high,
                    });
                    stack.push(Pending {
                        node: low_id,
                        rows: low,
                    });
                }
                _ => {
                    tree.nodes[node].kind = NodeKind::Leaf {
                        values: majority(data, &rows),
                        samples: rows.len(),
                    };
                }
            }
        }
        tree
    }

    fn push_placeholder(&mut self, parent: usize) -> usize {
        self.nodes.push(Node {
            parent: Some(parent),
            kind: NodeKind::Leaf {
                values: Vec::new(),
                samples: 0,
            },
        });
        self.nodes.len() - 1
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Leaf { .. }))
            .count()
    }

    /// Literals on the path from the root to `node`, root first
    pub fn path(&self, node: usize) -> Vec<Lit> {
        let mut lits = Vec::new();
        let mut current = node;
        while let Some(parent) = self.nodes[current].parent {
            if let NodeKind::Split { feature, high, .. } = self.nodes[parent].kind {
                lits.push(feature.lit(high == current));
            }
            current = parent;
        }
        lits.reverse();
        lits
    }

    /// Disjunction over leaves predicting true for `output` of the cube of
    /// their path literals
    pub fn to_expr(&self, output: usize) -> Expr {
        Expr::or(self.nodes.iter().enumerate().filter_map(|(i, n)| match &n.kind {
            NodeKind::Leaf { values, .. } if values.get(output).copied().unwrap_or(false) => {
                Some(Expr::cube(&self.path(i)))
            }
            _ => None,
        }))
    }

    /// One expression per output
    pub fn to_exprs(&self) -> Vec<Expr> {
        (0..self.outputs).map(|k| self.to_expr(k)).collect()
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, node: usize, depth: usize) -> fmt::Result {
        let indent = "|   ".repeat(depth);
        match &self.nodes[node].kind {
            NodeKind::Split { feature, low, high } => {
                writeln!(f, "{}|--- {} = 0", indent, feature)?;
                self.fmt_node(f, *low, depth + 1)?;
                writeln!(f, "{}|--- {} = 1", indent, feature)?;
                self.fmt_node(f, *high, depth + 1)
            }
            NodeKind::Leaf { values, samples } => {
                let bits: String = values.iter().map(|&b| if b { '1' } else { '0' }).collect();
                writeln!(f, "{}|--- value: {} ({} samples)", indent, bits, samples)
            }
        }
    }
}

impl fmt::Display for DecisionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantics::state::Assignment;

    fn params() -> TreeParams {
        TreeParams {
            min_impurity_decrease: 0.005,
            seed: 10,
        }
    }

    /// All assignments of x1, x2 with y3 labelled by `f`
    fn truth_table(f: impl Fn(bool, bool) -> bool) -> Vec<Assignment> {
        (0..4u32)
            .map(|bits| {
                let (a, b) = (bits & 1 != 0, bits & 2 != 0);
                Assignment::from_lits(3, [Var(1).lit(a), Var(2).lit(b), Var(3).lit(f(a, b))])
            })
            .collect()
    }

    #[test]
    fn test_xor_needs_zero_threshold() {
        let samples = truth_table(|a, b| a ^ b);
        let data = Dataset::project(&samples, &[Var(1), Var(2)], &[Var(3)]);
        // no single split lowers the impurity of xor
        assert_eq!(DecisionTree::fit(&data, &params()).num_leaves(), 1);

        let tree = DecisionTree::fit(
            &data,
            &TreeParams {
                min_impurity_decrease: 0.0,
                seed: 10,
            },
        );
        let expr = tree.to_expr(0);
        for s in &samples {
            assert_eq!(expr.eval(s), s.get(Var(3)));
        }
        assert_eq!(tree.num_leaves(), 4);
    }

    #[test]
    fn test_single_feature_split() {
        let samples = truth_table(|a, _| !a);
        let data = Dataset::project(&samples, &[Var(1), Var(2)], &[Var(3)]);
        let tree = DecisionTree::fit(&data, &params());
        assert_eq!(tree.num_leaves(), 2);
        assert_eq!(tree.to_expr(0), Expr::lit(Var(1).neg()));
    }

    #[test]
    fn test_threshold_prevents_split() {
        let samples = truth_table(|a, b| a && b);
        let data = Dataset::project(&samples, &[Var(1), Var(2)], &[Var(3)]);
        let tree = DecisionTree::fit(
            &data,
            &TreeParams {
                min_impurity_decrease: 0.5,
                seed: 1,
            },
        );
        assert_eq!(tree.num_leaves(), 1);
        // one true label out of four: majority is false
        assert_eq!(tree.to_expr(0), Expr::f());
    }

    #[test]
    fn test_multi_output_tree() {
        let samples: Vec<Assignment> = (0..4u32)
            .map(|bits| {
                let (a, b) = (bits & 1 != 0, bits & 2 != 0);
                Assignment::from_lits(
                    4,
                    [Var(1).lit(a), Var(2).lit(b), Var(3).lit(a), Var(4).lit(!b)],
                )
            })
            .collect();
        let data = Dataset::project(&samples, &[Var(1), Var(2)], &[Var(3), Var(4)]);
        let tree = DecisionTree::fit(&data, &params());
        let exprs = tree.to_exprs();
        assert_eq!(exprs.len(), 2);
        for s in &samples {
            assert_eq!(exprs[0].eval(s), s.get(Var(3)));
            assert_eq!(exprs[1].eval(s), s.get(Var(4)));
        }
    }

    #[test]
    fn test_same_seed_same_tree() {
        let samples = truth_table(|a, b| a || b);
        let data = Dataset::project(&samples, &[Var(1), Var(2)], &[Var(3)]);
        assert_eq!(
            DecisionTree::fit(&data, &params()),
            DecisionTree::fit(&data, &params())
        );
    }

    #[test]
    fn test_render() {
        let samples = truth_table(|a, _| a);
        let data = Dataset::project(&samples, &[Var(1), Var(2)], &[Var(3)]);
        let text = DecisionTree::fit(&data, &params()).to_string();
        assert!(text.contains("|--- 1 = 0"));
        assert!(text.contains("|   |--- value: 1 (2 samples)"));
    }
}
