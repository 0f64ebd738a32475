//! Connected components of the undirected transaction/card projection.
//!
//! Transactions keep their index, card `i` becomes node `num_transactions + i`.
//! Union-find keeps this near-linear in the edge count.

use petgraph::unionfind::UnionFind;
use serde::Serialize;

use crate::graph::BipartiteGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComponentSummary {
    /// Components among nodes that have at least one edge.
    pub components: usize,
    /// `None` when the graph has no edges.
    pub largest: Option<usize>,
    /// Nodes of either type with no incident edge.
    pub isolated_nodes: usize,
}

/// Projected node id of card `card`.
pub fn card_node(graph: &BipartiteGraph, card: usize) -> usize {
    graph.num_transactions() + card
}

/// Component representative per projected node.
pub fn component_labels(graph: &BipartiteGraph) -> Vec<usize> {
    let node_count = graph.num_transactions() + graph.num_cards();
    let mut sets = UnionFind::<usize>::new(node_count);
    for &(tx, card) in graph.uses().pairs() {
        sets.union(tx, card_node(graph, card));
    }
    sets.into_labeling()
}

// Summarizes the connected components of the projection
// Inputs: a validated graph
// Outputs: component count, largest component size and edgeless node count
// Key steps:
// 1. Mark nodes touched by an edge
// 2. Count touched nodes per union-find representative
pub fn components(graph: &BipartiteGraph) -> ComponentSummary {
    let node_count = graph.num_transactions() + graph.num_cards();
    let mut touched = vec![false; node_count];
    for &(tx, card) in graph.uses().pairs() {
        touched[tx] = true;
        touched[card_node(graph, card)] = true;
    }

    let labels = component_labels(graph);
    let mut sizes = vec![0usize; node_count];
    for (node, &root) in labels.iter().enumerate() {
        if touched[node] {
            sizes[root] += 1;
        }
    }

    ComponentSummary {
        components: sizes.iter().filter(|&&size| size > 0).count(),
        largest: sizes.iter().copied().max().filter(|&size| size > 0),
        isolated_nodes: touched.iter().filter(|&&t| !t).count(),
    }
}
