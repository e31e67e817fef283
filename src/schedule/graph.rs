//! Dependency graph over existential variables
//!
//! An edge `v -> u` means the definition of `u` may reference `v`. The graph
//! is owned by the pipeline and lent to each stage; unique extraction and the
//! learner add edges, nothing removes them.

use crate::error::{Result, SynthError};
use crate::ir::Var;
use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<Var, ()>,
    index: BTreeMap<Var, NodeIndex>,
}

impl DependencyGraph {
    pub fn new(vars: &[Var]) -> Self {
        let mut graph = DiGraph::new();
        let mut index = BTreeMap::new();
        for &v in vars {
            index.entry(v).or_insert_with(|| graph.add_node(v));
        }
        Self { graph, index }
    }

    pub fn num_vars(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, var: Var) -> bool {
        self.index.contains_key(&var)
    }

    /// Whether adding `from -> to` would close a cycle
    pub fn would_create_cycle(&self, from: Var, to: Var) -> bool {
        match (self.index.get(&from), self.index.get(&to)) {
            (Some(&f), Some(&t)) => f == t || has_path_connecting(&self.graph, t, f, None),
            _ => false,
        }
    }

    /// Record that `to` may reference `from`
    ///
    /// Returns false, leaving the graph unchanged, if the edge would close a
    /// cycle. Edges touching non-existential variables are ignored.
    pub fn add_dependency(&mut self, from: Var, to: Var) -> bool {
        let (Some(&f), Some(&t)) = (self.index.get(&from), self.index.get(&to)) else {
            return true;
        };
        if f == t || has_path_connecting(&self.graph, t, f, None) {
            return false;
        }
        self.graph.update_edge(f, t, ());
        true
    }

    #[cfg(test)]
    pub fn has_edge(&self, from: Var, to: Var) -> bool {
        match (self.index.get(&from), self.index.get(&to)) {
            (Some(&f), Some(&t)) => self.graph.contains_edge(f, t),
            _ => false,
        }
    }

    /// Number of definitions that may reference `var`
    pub fn out_degree(&self, var: Var) -> usize {
        self.index
            .get(&var)
            .map(|&n| self.graph.neighbors_directed(n, Direction::Outgoing).count())
            .unwrap_or(0)
    }

    pub fn edges(&self) -> Vec<(Var, Var)> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| (self.graph[a], self.graph[b]))
            .collect()
    }

    /// Whether collapsing `members` into a single node would close a cycle
    pub fn merge_creates_cycle(&self, members: &[Var]) -> bool {
        let Some(&rep) = members.first().and_then(|v| self.index.get(v)) else {
            return false;
        };
        let mut condensed: DiGraph<(), ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = self.graph.node_indices().map(|_| condensed.add_node(())).collect();
        let mapped = |n: NodeIndex| {
            if members.contains(&self.graph[n]) {
                nodes[rep.index()]
            } else {
                nodes[n.index()]
            }
        };
        for e in self.graph.edge_indices() {
            if let Some((a, b)) = self.graph.edge_endpoints(e) {
                let (a, b) = (mapped(a), mapped(b));
                if a != b {
                    condensed.update_edge(a, b, ());
                }
            }
        }
        is_cyclic_directed(&condensed)
    }

    /// Kahn's algorithm over scheduling units
    ///
    /// `units` partitions some of the variables into groups that must be
    /// contiguous; every other variable is its own unit. Ties are broken by
    /// the smallest variable id in a unit, and members of a unit are emitted
    /// in ascending id order.
    pub fn topological_order(&self, units: &[Vec<Var>]) -> Result<Vec<Var>> {
        let mut unit_of: BTreeMap<Var, usize> = BTreeMap::new();
        let mut members: Vec<Vec<Var>> = Vec::new();
        for unit in units {
            let mut unit = unit.clone();
            unit.sort();
            unit.dedup();
            for &v in &unit {
                if !self.contains(v) || unit_of.insert(v, members.len()).is_some() {
                    return Err(SynthError::SchedulingInvariant(format!(
                        "variable {} is not a schedulable existential or is in two clusters",
                        v
                    )));
                }
            }
            members.push(unit);
        }
        for &v in self.index.keys() {
            if !unit_of.contains_key(&v) {
                unit_of.insert(v, members.len());
                members.push(vec![v]);
            }
        }

        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); members.len()];
        let mut in_degree = vec![0usize; members.len()];
        let mut seen = std::collections::BTreeSet::new();
        for (from, to) in self.edges() {
            let (a, b) = (unit_of[&from], unit_of[&to]);
            if a != b && seen.insert((a, b)) {
                successors[a].push(b);
                in_degree[b] += 1;
            }
        }

        let key = |u: usize| members[u].first().map(|v| v.0).unwrap_or(u32::MAX);
        let mut ready: BinaryHeap<Reverse<(u32, usize)>> = (0..members.len())
            .filter(|&u| in_degree[u] == 0)
            .map(|u| Reverse((key(u), u)))
            .collect();
        let mut order = Vec::with_capacity(self.num_vars());
        while let Some(Reverse((_, u))) = ready.pop() {
            order.extend(members[u].iter().copied());
            for &s in &successors[u] {
                in_degree[s] -= 1;
                if in_degree[s] == 0 {
                    ready.push(Reverse((key(s), s)));
                }
            }
        }

        if order.len() != self.num_vars() {
            return Err(SynthError::SchedulingInvariant(format!(
                "dependency graph has a cycle: ordered {} of {} existential variables",
                order.len(),
                self.num_vars()
            )));
        }
        Ok(order)
    }

    /// Check that `order` covers every variable once and respects every edge
    pub fn check_order(&self, order: &[Var]) -> Result<()> {
        let position: BTreeMap<Var, usize> = order.iter().enumerate().map(|(i, &v)| (v, i)).collect();
        if order.len() != self.num_vars() || position.len() != order.len() {
            return Err(SynthError::SchedulingInvariant(format!(
                "order has {} entries ({} distinct) for {} existential variables",
                order.len(),
                position.len(),
                self.num_vars()
            )));
        }
        for (from, to) in self.edges() {
            match (position.get(&from), position.get(&to)) {
                (Some(a), Some(b)) if a < b => {}
                _ => {
                    return Err(SynthError::SchedulingInvariant(format!(
                        "edge {} -> {} is not respected by the order",
                        from, to
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(ids: &[u32]) -> Vec<Var> {
        ids.iter().map(|&i| Var(i)).collect()
    }

    #[test]
    fn test_cycle_rejected() {
        let mut g = DependencyGraph::new(&vars(&[1, 2, 3]));
        assert!(g.add_dependency(Var(1), Var(2)));
        assert!(g.add_dependency(Var(2), Var(3)));
        assert!(g.would_create_cycle(Var(3), Var(1)));
        assert!(!g.add_dependency(Var(3), Var(1)));
        assert!(!g.add_dependency(Var(2), Var(2)));
        assert_eq!(g.edges().len(), 2);
    }

    #[test]
    fn test_order_smallest_id_first() {
        let mut g = DependencyGraph::new(&vars(&[5, 3, 9, 7]));
        g.add_dependency(Var(9), Var(3));
        let order = g.topological_order(&[]).unwrap();
        assert_eq!(order, vars(&[5, 7, 9, 3]));
        g.check_order(&order).unwrap();
    }

    #[test]
    fn test_clusters_are_contiguous() {
        let mut g = DependencyGraph::new(&vars(&[1, 2, 3, 4]));
        g.add_dependency(Var(1), Var(4));
        let order = g.topological_order(&[vars(&[4, 2])]).unwrap();
        assert_eq!(order, vars(&[1, 2, 4, 3]));
    }

    #[test]
    fn test_merge_cycle_detection() {
        let mut g = DependencyGraph::new(&vars(&[1, 2, 3]));
        g.add_dependency(Var(1), Var(2));
        g.add_dependency(Var(2), Var(3));
        // {1, 3} would need to be both before and after 2
        assert!(g.merge_creates_cycle(&vars(&[1, 3])));
        assert!(!g.merge_creates_cycle(&vars(&[1, 2])));
    }

    #[test]
    fn test_check_order_rejects_violation() {
        let mut g = DependencyGraph::new(&vars(&[1, 2]));
        g.add_dependency(Var(1), Var(2));
        assert!(matches!(
            g.check_order(&vars(&[2, 1])),
            Err(SynthError::SchedulingInvariant(_))
        ));
        assert!(g.check_order(&vars(&[1])).is_err());
    }

    #[test]
    fn test_out_degree() {
        let mut g = DependencyGraph::new(&vars(&[1, 2, 3]));
        g.add_dependency(Var(1), Var(2));
        g.add_dependency(Var(1), Var(3));
        assert_eq!(g.out_degree(Var(1)), 2);
        assert_eq!(g.out_degree(Var(3)), 0);
    }
}
