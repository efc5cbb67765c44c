//! Dominance analysis over labeled blocks.
//!
//! [`dominators`] maps every block to the full set of blocks that strictly dominate it.
//! Clients such as global CSE walk every dominator of a block, so the full set is exposed
//! rather than an immediate-dominator tree. [`DominatorSets`] wraps the same result with
//! the queries those clients need.
//!
//! The sets come from the iterative fixpoint in
//! [`compute_dominators`](crate::utils::graph::algorithms::compute_dominators), run over the
//! CFG's [`BlockGraph`](crate::analysis::cfg::BlockGraph) view. A block with no path from
//! the entry is dominated vacuously by every other block.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    analysis::cfg::Cfg,
    tac::Label,
    utils::graph::{algorithms::compute_dominators, NodeId},
};

/// Returns the strict dominators of every block of `cfg`.
///
/// `D ∈ dominators(cfg)[B]` iff `D != B` and every path from the entry to `B` passes
/// through `D`.
#[must_use]
pub fn dominators(cfg: &Cfg) -> BTreeMap<Label, BTreeSet<Label>> {
    DominatorSets::compute(cfg).into_map()
}

/// Strict dominator sets of a CFG with dominance queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DominatorSets {
    entry: Label,
    strict: BTreeMap<Label, BTreeSet<Label>>,
}

impl DominatorSets {
    /// Computes the dominator sets of `cfg`.
    #[must_use]
    pub fn compute(cfg: &Cfg) -> Self {
        let graph = cfg.graph();
        let doms = compute_dominators(&graph);

        let strict = cfg
            .labels()
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let set = doms
                    .strict_dominators(NodeId::new(i))
                    .map(|d| graph.label(d).clone())
                    .collect();
                (label.clone(), set)
            })
            .collect();

        Self {
            entry: cfg.entry().clone(),
            strict,
        }
    }

    /// Returns the entry label the sets were computed from.
    #[must_use]
    pub fn entry(&self) -> &Label {
        &self.entry
    }

    /// Returns the strict dominators of `label`; empty for unknown labels.
    #[must_use]
    pub fn strict(&self, label: &Label) -> &BTreeSet<Label> {
        static EMPTY: BTreeSet<Label> = BTreeSet::new();
        self.strict.get(label).unwrap_or(&EMPTY)
    }

    /// Returns `true` if `a` dominates `b`. A known block dominates itself.
    #[must_use]
    pub fn dominates(&self, a: &Label, b: &Label) -> bool {
        (a == b && self.strict.contains_key(b)) || self.strictly_dominates(a, b)
    }

    /// Returns `true` if `a` dominates `b` and `a != b`.
    #[must_use]
    pub fn strictly_dominates(&self, a: &Label, b: &Label) -> bool {
        self.strict(b).contains(a)
    }

    /// Returns the number of strict dominators of `label`, i.e. its depth in the dominator
    /// tree when it is reachable.
    #[must_use]
    pub fn depth(&self, label: &Label) -> usize {
        self.strict(label).len()
    }

    /// Returns the strict dominators of `label` from the closest to the entry.
    #[must_use]
    pub fn closest_first(&self, label: &Label) -> Vec<&Label> {
        let mut doms: Vec<&Label> = self.strict(label).iter().collect();
        doms.sort_by_key(|d| std::cmp::Reverse(self.depth(d)));
        doms
    }

    /// Returns the closest strict dominator of `label`.
    #[must_use]
    pub fn immediate(&self, label: &Label) -> Option<&Label> {
        self.closest_first(label).first().copied()
    }

    /// Consumes the wrapper and returns the underlying map.
    #[must_use]
    pub fn into_map(self) -> BTreeMap<Label, BTreeSet<Label>> {
        self.strict
    }
}
