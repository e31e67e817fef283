//! Grouping of tightly coupled existentials into joint learning units

use crate::ir::{Formula, Var};
use crate::schedule::graph::DependencyGraph;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Clause co-occurrence graph restricted to existential variables
pub fn primal_graph(formula: &Formula) -> BTreeMap<Var, BTreeSet<Var>> {
    let mut adjacency: BTreeMap<Var, BTreeSet<Var>> = formula
        .existentials()
        .iter()
        .map(|&y| (y, BTreeSet::new()))
        .collect();
    for clause in formula.clauses() {
        let ys: Vec<Var> = clause
            .iter()
            .map(|l| l.var())
            .filter(|&v| formula.vars().is_existential(v))
            .collect();
        for &a in &ys {
            for &b in &ys {
                if a != b
                    && let Some(adj) = adjacency.get_mut(&a)
                {
                    adj.insert(b);
                }
            }
        }
    }
    adjacency
}

/// Greedily cluster `learnable` variables
///
/// Seeds are taken in ascending id order. A seed collects unassigned
/// learnable variables reachable within `hop` steps of the primal graph, in
/// breadth-first order, until the cluster holds `max_size` members; a
/// candidate whose merge would close a cycle in `graph` is skipped. Only
/// clusters with at least two members are returned.
pub fn build_clusters(
    formula: &Formula,
    learnable: &[Var],
    hop: usize,
    max_size: usize,
    graph: &DependencyGraph,
) -> Vec<Vec<Var>> {
    if hop == 0 || max_size < 2 {
        return Vec::new();
    }
    let adjacency = primal_graph(formula);
    let learnable_set: BTreeSet<Var> = learnable.iter().copied().collect();
    let mut assigned: BTreeSet<Var> = BTreeSet::new();
    let mut clusters = Vec::new();

    for &seed in &learnable_set {
        if assigned.contains(&seed) {
            continue;
        }
        let mut members = vec![seed];
        let mut visited = BTreeSet::from([seed]);
        let mut queue = VecDeque::from([(seed, 0usize)]);
        while let Some((v, dist)) = queue.pop_front() {
            if members.len() >= max_size || dist >= hop {
                continue;
            }
            let Some(neighbours) = adjacency.get(&v) else {
                continue;
            };
            for &n in neighbours {
                if !visited.insert(n) {
                    continue;
                }
                queue.push_back((n, dist + 1));
                if members.len() < max_size
                    && learnable_set.contains(&n)
                    && !assigned.contains(&n)
                {
                    members.push(n);
                    if graph.merge_creates_cycle(&members) {
                        members.pop();
                    }
                }
            }
        }
        assigned.extend(members.iter().copied());
        if members.len() > 1 {
            members.sort();
            clusters.push(members);
        }
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Lit, VariableSet};

    fn formula(ys: &[u32], clauses: &[&[i32]]) -> Formula {
        let vars = VariableSet::new(vec![Var(1)], ys.iter().map(|&v| Var(v)).collect()).unwrap();
        let clauses = clauses
            .iter()
            .map(|c| c.iter().filter_map(|&l| Lit::from_dimacs(l)).collect())
            .collect();
        Formula::new(vars, clauses).unwrap()
    }

    #[test]
    fn test_chain_within_hop_radius() {
        // chain 2 - 3 - 4 - 5
        let f = formula(&[2, 3, 4, 5], &[&[1, 2, 3], &[3, -4], &[4, 5]]);
        let ys = f.existentials().to_vec();
        let g = DependencyGraph::new(&ys);
        assert_eq!(build_clusters(&f, &ys, 1, 8, &g), vec![vec![Var(2), Var(3)], vec![Var(4), Var(5)]]);
        assert_eq!(build_clusters(&f, &ys, 3, 8, &g), vec![ys.clone()]);
    }

    #[test]
    fn test_size_limit() {
        let f = formula(&[2, 3, 4, 5], &[&[2, 3, 4, 5]]);
        let ys = f.existentials().to_vec();
        let g = DependencyGraph::new(&ys);
        let clusters = build_clusters(&f, &ys, 2, 3, &g);
        assert_eq!(clusters, vec![vec![Var(2), Var(3), Var(4)]]);
    }

    #[test]
    fn test_cycle_closing_merge_skipped() {
        // 2 -> 3 -> 4 in the dependency graph; 3 is not learnable
        let f = formula(&[2, 3, 4], &[&[2, 4], &[2, 3], &[3, 4]]);
        let ys = f.existentials().to_vec();
        let mut g = DependencyGraph::new(&ys);
        g.add_dependency(Var(2), Var(3));
        g.add_dependency(Var(3), Var(4));
        assert!(build_clusters(&f, &[Var(2), Var(4)], 2, 8, &g).is_empty());
    }

    #[test]
    fn test_disabled_when_hop_is_zero() {
        let f = formula(&[2, 3], &[&[2, 3]]);
        let ys = f.existentials().to_vec();
        let g = DependencyGraph::new(&ys);
        assert!(build_clusters(&f, &ys, 0, 8, &g).is_empty());
    }
}
