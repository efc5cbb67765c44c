//! The control flow graph of one procedure.

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use crate::{
    analysis::cfg::{Block, BlockGraph},
    tac::{Instr, Label},
    Error, Result,
};

/// A procedure's control flow graph: blocks keyed by label plus a block order.
///
/// Edges are not stored; they are derived from each block's terminators, so passes that
/// rewrite terminators never have to keep an adjacency structure in sync.
///
/// # Invariants
///
/// - every label targeted by a terminator or used as a phi key names a block of the graph
/// - the entry block is first in the block order and has no predecessors
///
/// [`Cfg::new`] checks both; passes preserve them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cfg {
    proc_name: String,
    entry: Label,
    order: Vec<Label>,
    blocks: HashMap<Label, Block>,
}

impl Cfg {
    /// Builds a CFG from blocks given in order; the first block is the entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] if there are no blocks, two blocks share a label, a
    /// terminator or phi refers to a missing block, or the entry block has a predecessor.
    pub fn new(proc_name: impl Into<String>, blocks: Vec<Block>) -> Result<Self> {
        let proc_name = proc_name.into();
        let Some(entry) = blocks.first().map(|b| b.label.clone()) else {
            return Err(Error::Structural {
                proc: proc_name,
                message: "procedure has no blocks".to_string(),
            });
        };

        let mut order = Vec::with_capacity(blocks.len());
        let mut map = HashMap::with_capacity(blocks.len());
        for block in blocks {
            if map.contains_key(&block.label) {
                return Err(Error::Structural {
                    proc: proc_name,
                    message: format!("duplicate label {}", block.label),
                });
            }
            order.push(block.label.clone());
            map.insert(block.label.clone(), block);
        }

        let cfg = Self {
            proc_name,
            entry,
            order,
            blocks: map,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks the structural invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        let structural = |message: String| Error::Structural {
            proc: self.proc_name.clone(),
            message,
        };

        for block in self.blocks() {
            for target in block.jumps.iter().filter_map(Instr::target) {
                if !self.contains(target) {
                    return Err(structural(format!(
                        "{} jumps to undefined label {}",
                        block.label, target
                    )));
                }
                if *target == self.entry {
                    return Err(structural(format!(
                        "{} jumps to the entry block {}",
                        block.label, target
                    )));
                }
            }
            for phi in block.phis() {
                let keys = phi.phi_sources().into_iter().flat_map(|s| s.keys());
                for key in keys {
                    if !self.contains(key) {
                        return Err(structural(format!(
                            "phi in {} names undefined predecessor {}",
                            block.label, key
                        )));
                    }
                }
            }
            if block.body.iter().any(Instr::is_terminator) {
                return Err(structural(format!(
                    "{} has a terminator in its body",
                    block.label
                )));
            }
        }
        Ok(())
    }

    /// Returns the name of the procedure this graph belongs to.
    #[must_use]
    pub fn proc_name(&self) -> &str {
        &self.proc_name
    }

    /// Returns the entry block's label.
    #[must_use]
    pub fn entry(&self) -> &Label {
        &self.entry
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the graph has no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the labels in block order.
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.order
    }

    /// Iterates over the blocks in block order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.order.iter().filter_map(|l| self.blocks.get(l))
    }

    /// Mutable iteration over all blocks, in no particular order.
    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.blocks.values_mut()
    }

    /// Returns the block named `label`.
    #[must_use]
    pub fn block(&self, label: &Label) -> Option<&Block> {
        self.blocks.get(label)
    }

    /// Returns the block named `label` mutably.
    pub fn block_mut(&mut self, label: &Label) -> Option<&mut Block> {
        self.blocks.get_mut(label)
    }

    /// Returns `true` if a block is named `label`.
    #[must_use]
    pub fn contains(&self, label: &Label) -> bool {
        self.blocks.contains_key(label)
    }

    /// Returns the distinct successors of `label`, in terminator order.
    #[must_use]
    pub fn successors(&self, label: &Label) -> Vec<&Label> {
        self.blocks
            .get(label)
            .map(Block::successors)
            .unwrap_or_default()
    }

    /// Returns the distinct predecessors of `label`, in block order.
    #[must_use]
    pub fn predecessors(&self, label: &Label) -> Vec<&Label> {
        self.blocks()
            .filter(|b| b.successors().contains(&label))
            .map(|b| &b.label)
            .collect()
    }

    /// Returns the predecessor lists of every block.
    #[must_use]
    pub fn predecessor_map(&self) -> HashMap<&Label, Vec<&Label>> {
        let mut preds: HashMap<&Label, Vec<&Label>> =
            self.order.iter().map(|l| (l, Vec::new())).collect();
        for block in self.blocks() {
            for succ in block.successors() {
                if let Some(list) = preds.get_mut(succ) {
                    list.push(&block.label);
                }
            }
        }
        preds
    }

    /// Returns every edge `(from, to)`, in block then terminator order.
    #[must_use]
    pub fn edges(&self) -> Vec<(&Label, &Label)> {
        self.blocks()
            .flat_map(|b| b.successors().into_iter().map(move |s| (&b.label, s)))
            .collect()
    }

    /// Removes the block named `label`.
    ///
    /// References to it from other blocks are left in place; callers that remove blocks are
    /// responsible for stripping them. The entry block cannot be removed.
    pub fn remove_block(&mut self, label: &Label) -> Option<Block> {
        if *label == self.entry {
            return None;
        }
        let block = self.blocks.remove(label)?;
        self.order.retain(|l| l != label);
        Some(block)
    }

    /// Inserts a block after the last block of the order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Structural`] if the label is already taken.
    pub fn push_block(&mut self, block: Block) -> Result<()> {
        if self.contains(&block.label) {
            return Err(Error::Structural {
                proc: self.proc_name.clone(),
                message: format!("duplicate label {}", block.label),
            });
        }
        self.order.push(block.label.clone());
        self.blocks.insert(block.label.clone(), block);
        Ok(())
    }

    /// Returns the total number of instructions, terminators included.
    #[must_use]
    pub fn instr_count(&self) -> usize {
        self.blocks.values().map(|b| b.body.len() + b.jumps.len()).sum()
    }

    /// Returns the labels of blocks not reachable from the entry.
    #[must_use]
    pub fn unreachable_blocks(&self) -> Vec<&Label> {
        let mut seen: HashSet<&Label> = HashSet::new();
        let mut stack = vec![&self.entry];
        seen.insert(&self.entry);
        while let Some(label) = stack.pop() {
            for succ in self.successors(label) {
                if seen.insert(succ) {
                    stack.push(succ);
                }
            }
        }
        self.order.iter().filter(|l| !seen.contains(l)).collect()
    }

    /// Returns a graph view numbering blocks by their position in the block order.
    #[must_use]
    pub fn graph(&self) -> BlockGraph<'_> {
        BlockGraph::new(self)
    }

    /// Returns `true` if every non-phi instruction defines a temporary at most once and
    /// phis define temporaries no other instruction defines.
    #[must_use]
    pub fn is_single_assignment(&self) -> bool {
        let mut defined = HashSet::new();
        self.blocks()
            .flat_map(|b| b.body.iter())
            .filter_map(|i| i.dest.as_ref().filter(|d| !d.is_global()))
            .all(|d| defined.insert(d))
    }
}

impl fmt::Display for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cfg {} (entry {}):", self.proc_name, self.entry)?;
        for block in self.blocks() {
            write!(f, "{block}")?;
        }
        Ok(())
    }
}
