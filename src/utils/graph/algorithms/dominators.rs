//! Dominator sets computed by iterative data-flow analysis.
//!
//! A node `d` **dominates** a node `n` if every path from the entry node to `n` passes
//! through `d`; `d` **strictly** dominates `n` if additionally `d != n`.
//!
//! # Algorithm
//!
//! The classical iterative fixpoint:
//!
//! ```text
//! Dom(entry) = {entry}
//! Dom(v)     = all nodes                          (v != entry)
//! repeat until no set changes:
//!     for each v != entry:
//!         Dom(v) = {v} ∪ ⋂ { Dom(u) | u ∈ preds(v) }
//! ```
//!
//! Sets only shrink and are bounded below, so the loop terminates. Nodes are visited in
//! reverse postorder from the entry, which makes the common case converge in two passes.
//!
//! The full set of dominators is kept for every node rather than a tree, because clients
//! walk every dominator of a block, not just its immediate one.
//!
//! # Unreachable nodes
//!
//! A node that cannot be reached from the entry has no path from the entry, so every node
//! dominates it vacuously and its set stays full.

use crate::utils::{
    graph::{algorithms::reverse_postorder, NodeId, RootedGraph},
    BitSet,
};

/// Result of dominator computation: one dominator set per node.
///
/// # Examples
///
/// ```rust,ignore
/// let doms = compute_dominators(&graph);
/// assert!(doms.dominates(graph.entry(), node));
/// assert_eq!(doms.strict_dominators(graph.entry()).count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct NodeDominators {
    entry: NodeId,
    /// Non-strict dominator set of each node, indexed by node.
    sets: Vec<BitSet>,
}

impl NodeDominators {
    /// Returns the entry node the sets were computed from.
    #[inline]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the number of nodes covered.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.sets.len()
    }

    /// Returns `true` if `a` dominates `b`. Every node dominates itself.
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.sets[b.index()].contains(a.index())
    }

    /// Returns `true` if `a` dominates `b` and `a != b`.
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Iterates over the strict dominators of `node`, by ascending index.
    pub fn strict_dominators(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.sets[node.index()]
            .iter()
            .filter(move |&i| i != node.index())
            .map(NodeId::new)
    }

    /// Returns the number of strict dominators of `node`.
    ///
    /// For reachable nodes the strict dominators form a chain from the entry, so this is the
    /// depth of `node` in the dominator tree (the entry has depth 0).
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize {
        self.sets[node.index()].count().saturating_sub(1)
    }

    /// Returns the closest strict dominator of `node`, or `None` for the entry.
    ///
    /// For unreachable nodes the answer is arbitrary but deterministic.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.strict_dominators(node)
            .max_by_key(|&d| (self.depth(d), std::cmp::Reverse(d)))
    }
}

/// Computes the dominator set of every node of a rooted graph.
///
/// # Complexity
///
/// O(V² / 64 × iterations); the number of iterations is bounded by the loop nesting depth
/// of the graph plus two.
pub fn compute_dominators<G: RootedGraph>(graph: &G) -> NodeDominators {
    let node_count = graph.node_count();
    let entry = graph.entry();

    if node_count == 0 {
        return NodeDominators {
            entry,
            sets: Vec::new(),
        };
    }

    let mut sets = vec![BitSet::full(node_count); node_count];
    sets[entry.index()] = BitSet::from_indices(node_count, [entry.index()]);

    // Reachable nodes in reverse postorder, then the rest by index.
    let mut order = reverse_postorder(graph, entry);
    let mut seen = BitSet::from_indices(node_count, order.iter().map(|n| n.index()));
    for node in graph.node_ids() {
        if !seen.contains(node.index()) {
            seen.insert(node.index());
            order.push(node);
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for &node in &order {
            if node == entry {
                continue;
            }

            let mut new_set = BitSet::full(node_count);
            for pred in graph.predecessors(node) {
                new_set.intersect_with(&sets[pred.index()]);
            }
            new_set.insert(node.index());

            if new_set != sets[node.index()] {
                sets[node.index()] = new_set;
                changed = true;
            }
        }
    }

    NodeDominators { entry, sets }
}
