//! A graph view of a [`Cfg`] for the generic graph algorithms.

use std::collections::HashMap;

use crate::{
    analysis::cfg::Cfg,
    tac::Label,
    utils::graph::{GraphBase, NodeId, Predecessors, RootedGraph, Successors},
};

/// A borrowed, index-based view of a [`Cfg`].
///
/// Blocks are numbered by their position in the block order, so the entry block is node 0.
/// Successor and predecessor lists are computed once on construction; the view borrows the
/// CFG, so it cannot go stale while it lives.
#[derive(Debug)]
pub struct BlockGraph<'a> {
    cfg: &'a Cfg,
    index: HashMap<&'a Label, NodeId>,
    successors: Vec<Vec<NodeId>>,
    predecessors: Vec<Vec<NodeId>>,
}

impl<'a> BlockGraph<'a> {
    /// Creates a view of `cfg`.
    #[must_use]
    pub fn new(cfg: &'a Cfg) -> Self {
        let index: HashMap<&Label, NodeId> = cfg
            .labels()
            .iter()
            .enumerate()
            .map(|(i, l)| (l, NodeId::new(i)))
            .collect();

        let mut successors = vec![Vec::new(); index.len()];
        let mut predecessors = vec![Vec::new(); index.len()];
        for (from, block) in cfg.blocks().enumerate() {
            for target in block.successors() {
                if let Some(&to) = index.get(target) {
                    successors[from].push(to);
                    predecessors[to.index()].push(NodeId::new(from));
                }
            }
        }

        Self {
            cfg,
            index,
            successors,
            predecessors,
        }
    }

    /// Returns the underlying CFG.
    #[must_use]
    pub const fn cfg(&self) -> &'a Cfg {
        self.cfg
    }

    /// Returns the node of the block named `label`.
    #[must_use]
    pub fn node(&self, label: &Label) -> Option<NodeId> {
        self.index.get(label).copied()
    }

    /// Returns the label of `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not a node of this view.
    #[must_use]
    pub fn label(&self, node: NodeId) -> &'a Label {
        &self.cfg.labels()[node.index()]
    }
}

impl GraphBase for BlockGraph<'_> {
    fn node_count(&self) -> usize {
        self.successors.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.successors.len()).map(NodeId::new)
    }
}

impl Successors for BlockGraph<'_> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.successors[node.index()].iter().copied()
    }
}

impl Predecessors for BlockGraph<'_> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.predecessors[node.index()].iter().copied()
    }
}

impl RootedGraph for BlockGraph<'_> {
    fn entry(&self) -> NodeId {
        NodeId::new(0)
    }
}
