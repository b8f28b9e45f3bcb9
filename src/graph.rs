//! Dependency graphs over tuple indices: reachability and minimal-subgraph
//! extraction for the cross-element associativity proof.

use std::collections::BTreeSet;

use id_collections::{id_type, IdVec};

#[id_type]
pub struct NodeId(pub usize);

#[derive(Clone, Debug)]
pub struct Graph {
    pub edges_out: IdVec<NodeId, Vec<NodeId>>,
}

// Depth-First Reachability

/// All nodes reachable from `root` along one or more edges. `root` itself is
/// included only when it lies on a cycle (a self-loop counts).
pub fn reachable(graph: &Graph, root: NodeId) -> BTreeSet<NodeId> {
    let mut reached = BTreeSet::new();

    let mut stack: Vec<NodeId> = graph.edges_out[root].clone();

    while let Some(node) = stack.pop() {
        if !reached.insert(node) {
            continue;
        }

        for &neighbor in &graph.edges_out[node] {
            if !reached.contains(&neighbor) {
                stack.push(neighbor);
            }
        }
    }

    reached
}

pub fn reachable_sets(graph: &Graph) -> IdVec<NodeId, BTreeSet<NodeId>> {
    IdVec::from_vec(
        graph
            .edges_out
            .iter()
            .map(|(node, _)| reachable(graph, node))
            .collect(),
    )
}

// Minimal Subgraphs

/// Retain each nonempty reach set that is not strictly contained in another,
/// deduplicating equal sets. The result is the family of maximal reach sets,
/// in ascending order of their originating node.
pub fn minimal_subgraphs(reach: &IdVec<NodeId, BTreeSet<NodeId>>) -> Vec<BTreeSet<NodeId>> {
    let mut retained: Vec<BTreeSet<NodeId>> = Vec::new();

    for (_, current) in reach {
        if current.is_empty() {
            continue;
        }

        let swallowed = reach
            .iter()
            .any(|(_, other)| current.len() < other.len() && current.is_subset(other));
        if swallowed {
            continue;
        }

        if !retained.contains(current) {
            retained.push(current.clone());
        }
    }

    retained
}

// Simple generative property-based testing
