//! Dependency graph and variable scheduling
//!
//! Produces the canonical existential order used by learning, error formula
//! construction and repair, together with the learning units (single
//! variables or clusters) in that order.

pub mod cluster;
pub mod graph;

pub use graph::DependencyGraph;

use crate::error::Result;
use crate::ir::{Formula, Var};
use std::collections::BTreeSet;

/// Multi-output clustering parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterConfig {
    pub hop: usize,
    pub max_size: usize,
}

/// Variables learned together by one classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningUnit {
    pub targets: Vec<Var>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Every existential exactly once
    pub order: Vec<Var>,
    /// Learnable variables grouped into units, in order
    pub units: Vec<LearningUnit>,
}

impl Schedule {
    pub fn position(&self, var: Var) -> Option<usize> {
        self.order.iter().position(|&v| v == var)
    }
}

/// Order all existentials and group the learnable ones
pub fn schedule(
    formula: &Formula,
    graph: &DependencyGraph,
    learnable: &[Var],
    clustering: Option<ClusterConfig>,
) -> Result<Schedule> {
    let clusters = match clustering {
        Some(cfg) => cluster::build_clusters(formula, learnable, cfg.hop, cfg.max_size, graph),
        None => Vec::new(),
    };
    let order = graph.topological_order(&clusters)?;
    graph.check_order(&order)?;

    let learnable: BTreeSet<Var> = learnable.iter().copied().collect();
    let mut units = Vec::new();
    let mut emitted: BTreeSet<Var> = BTreeSet::new();
    for &v in &order {
        if !learnable.contains(&v) || emitted.contains(&v) {
            continue;
        }
        let targets = clusters
            .iter()
            .find(|c| c.contains(&v))
            .cloned()
            .unwrap_or_else(|| vec![v]);
        emitted.extend(targets.iter().copied());
        units.push(LearningUnit { targets });
    }
    log::info!(
        "scheduled {} existentials, {} learning units ({} clusters)",
        order.len(),
        units.len(),
        clusters.len()
    );
    Ok(Schedule { order, units })
}
