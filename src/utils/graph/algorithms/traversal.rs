//! Graph traversal algorithms.
//!
//! - [`postorder`] - depth-first search with post-order visitation
//! - [`reverse_postorder`] - reverse post-order (the iteration order for forward data flow)
//! - [`reachable_from`] - every node reachable along successor edges
//! - [`reaching`] - every node that can reach a given node along successor edges
//!
//! All traversals are iterative, so deep CFGs cannot overflow the stack.

use crate::utils::{
    graph::{NodeId, Predecessors, Successors},
    BitSet,
};

/// Returns the nodes reachable from `start` in depth-first post-order.
///
/// Nodes not reachable from `start` are not included. An out-of-range `start` yields an
/// empty vector.
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);
    let mut stack = vec![(start, State::Enter)];

    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if visited[node.index()] {
                    continue;
                }
                visited[node.index()] = true;
                stack.push((node, State::Exit));

                // Reverse so successors are explored in their natural order
                let successors: Vec<NodeId> = graph.successors(node).collect();
                for &succ in successors.iter().rev() {
                    if !visited[succ.index()] {
                        stack.push((succ, State::Enter));
                    }
                }
            }
            State::Exit => result.push(node),
        }
    }

    result
}

/// Returns the nodes reachable from `start` in reverse post-order.
///
/// In reverse post-order every node appears before its successors, except along back
/// edges.
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut result = postorder(graph, start);
    result.reverse();
    result
}

/// Returns the set of nodes reachable from `start`, `start` included.
pub fn reachable_from<G: Successors>(graph: &G, start: NodeId) -> BitSet {
    let mut seen = BitSet::new(graph.node_count());
    if start.index() >= graph.node_count() {
        return seen;
    }

    let mut stack = vec![start];
    seen.insert(start.index());
    while let Some(node) = stack.pop() {
        for succ in graph.successors(node) {
            if !seen.contains(succ.index()) {
                seen.insert(succ.index());
                stack.push(succ);
            }
        }
    }
    seen
}

/// Returns the set of nodes from which `target` is reachable, `target` included.
pub fn reaching<G: Predecessors>(graph: &G, target: NodeId) -> BitSet {
    let mut seen = BitSet::new(graph.node_count());
    if target.index() >= graph.node_count() {
        return seen;
    }

    let mut stack = vec![target];
    seen.insert(target.index());
    while let Some(node) = stack.pop() {
        for pred in graph.predecessors(node) {
            if !seen.contains(pred.index()) {
                seen.insert(pred.index());
                stack.push(pred);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use crate::utils::graph::{
        algorithms::traversal::{postorder, reachable_from, reaching, reverse_postorder},
        testing::EdgeListGraph,
        NodeId,
    };

    fn diamond() -> EdgeListGraph {
        EdgeListGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)])
    }

    #[test]
    fn test_postorder_diamond() {
        let order = postorder(&diamond(), NodeId::new(0));
        assert_eq!(order.len(), 4);
        assert_eq!(order.last(), Some(&NodeId::new(0)));
        assert_eq!(order[0], NodeId::new(3));
    }

    #[test]
    fn test_reverse_postorder_diamond() {
        let order = reverse_postorder(&diamond(), NodeId::new(0));
        assert_eq!(
            order,
            vec![NodeId::new(0), NodeId::new(2), NodeId::new(1), NodeId::new(3)]
        );
    }

    #[test]
    fn test_postorder_skips_unreachable() {
        let graph = EdgeListGraph::new(3, &[(0, 1), (2, 1)]);
        assert_eq!(postorder(&graph, NodeId::new(0)).len(), 2);
        assert!(postorder(&graph, NodeId::new(7)).is_empty());
    }

    #[test]
    fn test_reachability_with_cycle() {
        // 0 -> 1 -> 2 -> 1, 2 -> 3, 4 -> 3
        let graph = EdgeListGraph::new(5, &[(0, 1), (1, 2), (2, 1), (2, 3), (4, 3)]);

        let forward = reachable_from(&graph, NodeId::new(1));
        assert_eq!(forward.iter().collect::<Vec<_>>(), vec![1, 2, 3]);

        let backward = reaching(&graph, NodeId::new(2));
        assert_eq!(backward.iter().collect::<Vec<_>>(), vec![0, 1, 2]);

        let into_exit = reaching(&graph, NodeId::new(3));
        assert_eq!(into_exit.count(), 5);
    }
}
