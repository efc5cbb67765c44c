//! Sparse Conditional Constant Propagation (SCCP).
//!
//! SCCP discovers at the same time which blocks can execute and which temporaries hold a
//! single constant value. Doing both together is strictly more precise than running constant
//! propagation and unreachable-code elimination separately: a branch on a constant makes one
//! successor unreachable, and definitions in an unreachable block no longer disturb the phis
//! they flow into.
//!
//! # Algorithm Overview
//!
//! The analysis keeps two maps:
//!
//! - **Executability**: which blocks, and which edges between them, have been proven to run
//! - **Values**: a [`LatticeValue`] per temporary
//!
//! Named and global temporaries start at [`LatticeValue::NonConstant`], because they may be
//! parameters or be assigned along several paths. Versioned temporaries start at
//! [`LatticeValue::Unused`]. Only the entry block starts executable.
//!
//! Two update rules then alternate until neither changes anything:
//!
//! 1. **Executability**: the terminators of every executable block are walked in order. A
//!    `jmp` activates its target. A conditional jump activates its target when its operand
//!    is non-constant or a constant for which the test holds; a taken constant test ends the
//!    walk, an `Unused` operand suspends it until the operand resolves.
//! 2. **Values**: every instruction of every executable block is evaluated abstractly and its
//!    destination joined with the result.
//!
//! # Edge-Based Phi Evaluation
//!
//! Phis only consider the sources whose incoming **edge** is executable, not every source
//! whose predecessor block is. In a diamond whose head branches on a constant, the join
//! block's phi sees only the operand of the taken side.
//!
//! # Reference
//!
//! Wegman & Zadeck, "Constant Propagation with Conditional Branches", 1991.

use std::collections::{HashMap, HashSet};

use crate::{
    analysis::{
        cfg::Cfg,
        dataflow::{JoinSemiLattice, LatticeValue},
    },
    tac::{Instr, Label, Op, Operand, Temp, TempKind},
};

/// Sparse Conditional Constant Propagation analysis.
///
/// One value is created per run and owns all of the analysis state, so nothing leaks from
/// one procedure to the next.
///
/// # Example
///
/// ```rust
/// use tacopt::analysis::{cfg::CfgBuilder, dataflow::ConstantPropagation};
/// use tacopt::tac::Temp;
///
/// let cfg = CfgBuilder::new("@main").build_with(|f| {
///     f.block("%.L0", |b| {
///         b.constant("%0", 2).constant("%1", 3).add("%2", "%0", "%1").ret(Some("%2".into()));
///     });
/// })?;
///
/// let result = ConstantPropagation::analyze(&cfg);
/// assert_eq!(result.constant_value(&Temp::new("%2")), Some(5));
/// # Ok::<(), tacopt::Error>(())
/// ```
pub struct ConstantPropagation<'a> {
    /// The graph under analysis.
    cfg: &'a Cfg,
    /// Current value for each temporary.
    values: HashMap<Temp, LatticeValue>,
    /// Executable CFG edges.
    executable_edges: HashSet<(Label, Label)>,
    /// Blocks that have been marked executable.
    executable_blocks: HashSet<Label>,
}

impl<'a> ConstantPropagation<'a> {
    /// Creates the initial analysis state for `cfg`.
    #[must_use]
    pub fn new(cfg: &'a Cfg) -> Self {
        let mut values = HashMap::new();
        for instr in cfg.blocks().flat_map(|b| b.instrs()) {
            for temp in instr.dest.iter().chain(instr.used_temps()) {
                values
                    .entry(temp.clone())
                    .or_insert_with(|| initial_value(temp));
            }
        }

        let mut executable_blocks = HashSet::new();
        executable_blocks.insert(cfg.entry().clone());

        Self {
            cfg,
            values,
            executable_edges: HashSet::new(),
            executable_blocks,
        }
    }

    /// Runs the analysis on `cfg` to a fixpoint.
    #[must_use]
    pub fn analyze(cfg: &'a Cfg) -> SccpResult {
        Self::new(cfg).run()
    }

    /// Alternates the two update rules until neither changes anything.
    #[must_use]
    pub fn run(mut self) -> SccpResult {
        let mut rounds = 0usize;
        loop {
            rounds += 1;
            let edges_changed = self.update_executability();
            let values_changed = self.update_values();
            if !edges_changed && !values_changed {
                break;
            }
        }

        log::trace!(
            "sccp {}: fixpoint after {} rounds, {} of {} blocks executable",
            self.cfg.proc_name(),
            rounds,
            self.executable_blocks.len(),
            self.cfg.len()
        );

        SccpResult {
            values: self.values,
            executable_edges: self.executable_edges,
            executable_blocks: self.executable_blocks,
        }
    }

    /// Propagates executability along the terminators of every executable block.
    ///
    /// Returns `true` if a new edge became executable.
    fn update_executability(&mut self) -> bool {
        let mut activated = Vec::new();

        for block in self.cfg.blocks() {
            if !self.executable_blocks.contains(&block.label) {
                continue;
            }

            for jump in &block.jumps {
                match &jump.op {
                    Op::Jump { target } => {
                        activated.push((block.label.clone(), target.clone()));
                        break;
                    }
                    Op::Branch {
                        cond,
                        value,
                        target,
                    } => match self.operand_value(value) {
                        LatticeValue::NonConstant => {
                            activated.push((block.label.clone(), target.clone()));
                        }
                        LatticeValue::Unused => break,
                        LatticeValue::Constant(c) => {
                            if cond.holds(c) {
                                activated.push((block.label.clone(), target.clone()));
                                break;
                            }
                        }
                    },
                    _ => break,
                }
            }
        }

        let mut changed = false;
        for (from, to) in activated {
            self.executable_blocks.insert(to.clone());
            changed |= self.executable_edges.insert((from, to));
        }
        changed
    }

    /// Re-evaluates every instruction of every executable block.
    ///
    /// Returns `true` if any temporary moved up the lattice.
    fn update_values(&mut self) -> bool {
        let cfg = self.cfg;
        let mut changed = false;

        for block in cfg.blocks() {
            if !self.executable_blocks.contains(&block.label) {
                continue;
            }

            for instr in &block.body {
                let Some(dest) = &instr.dest else {
                    continue;
                };
                if let Some(value) = self.evaluate(instr, &block.label) {
                    changed |= self.update_value(dest, value);
                }
            }
        }
        changed
    }

    /// Abstractly evaluates an instruction of `block`.
    ///
    /// Returns `None` when the operands do not yet carry enough information to say anything.
    fn evaluate(&self, instr: &Instr, block: &Label) -> Option<LatticeValue> {
        match &instr.op {
            Op::Const { value } => Some(LatticeValue::Constant(*value)),
            Op::Copy { src } => Some(self.operand_value(src)),
            Op::Binary { op, left, right } => {
                match (self.operand_value(left), self.operand_value(right)) {
                    (LatticeValue::Constant(u), LatticeValue::Constant(v)) => Some(
                        op.eval(u, v)
                            .map_or(LatticeValue::NonConstant, LatticeValue::Constant),
                    ),
                    (LatticeValue::NonConstant, _) | (_, LatticeValue::NonConstant) => {
                        Some(LatticeValue::NonConstant)
                    }
                    _ => None,
                }
            }
            Op::Unary { op, operand } => match self.operand_value(operand) {
                LatticeValue::Constant(u) => Some(LatticeValue::Constant(op.eval(u))),
                LatticeValue::NonConstant => Some(LatticeValue::NonConstant),
                LatticeValue::Unused => None,
            },
            Op::Phi { sources } => Some(self.evaluate_phi(sources.iter(), block)),
            Op::Call { .. } => Some(LatticeValue::NonConstant),
            Op::Nop
            | Op::Param { .. }
            | Op::Label { .. }
            | Op::Jump { .. }
            | Op::Branch { .. }
            | Op::Ret { .. } => None,
        }
    }

    /// Joins the phi sources whose incoming edge is executable.
    ///
    /// Sources still at `Unused` contribute nothing; a back edge that has not been proven
    /// executable yet is ignored until it is.
    fn evaluate_phi<'s>(
        &self,
        sources: impl Iterator<Item = (&'s Label, &'s Operand)>,
        block: &Label,
    ) -> LatticeValue {
        let mut result = LatticeValue::Unused;
        for (pred, source) in sources {
            if !self.is_edge_executable(pred, block) {
                continue;
            }
            result = result.join(&self.operand_value(source));
            if result.is_top() {
                break;
            }
        }
        result
    }

    fn is_edge_executable(&self, from: &Label, to: &Label) -> bool {
        self.executable_edges
            .contains(&(from.clone(), to.clone()))
    }

    /// Gets the current value of an operand; immediates are constants.
    fn operand_value(&self, operand: &Operand) -> LatticeValue {
        match operand {
            Operand::Imm(v) => LatticeValue::Constant(*v),
            Operand::Temp(t) => self
                .values
                .get(t)
                .copied()
                .unwrap_or_else(|| initial_value(t)),
        }
    }

    /// Joins `value` into the temporary's current value.
    ///
    /// Returns `true` if the value changed.
    fn update_value(&mut self, temp: &Temp, value: LatticeValue) -> bool {
        let old = self
            .values
            .get(temp)
            .copied()
            .unwrap_or_else(|| initial_value(temp));
        let new = old.join(&value);
        if new == old {
            return false;
        }
        log::trace!("sccp {}: {} {} -> {}", self.cfg.proc_name(), temp, old, new);
        self.values.insert(temp.clone(), new);
        true
    }
}

/// The value every temporary starts from.
fn initial_value(temp: &Temp) -> LatticeValue {
    match temp.kind() {
        TempKind::Versioned => LatticeValue::Unused,
        TempKind::Named | TempKind::Global => LatticeValue::NonConstant,
    }
}

/// Results of SCCP analysis.
#[derive(Debug, Clone)]
pub struct SccpResult {
    /// Value for each temporary seen in the graph.
    values: HashMap<Temp, LatticeValue>,
    /// Edges determined to be executable.
    executable_edges: HashSet<(Label, Label)>,
    /// Blocks determined to be executable.
    executable_blocks: HashSet<Label>,
}

impl SccpResult {
    /// Gets the value of a temporary.
    ///
    /// Temporaries the analysis never saw report their initial value.
    #[must_use]
    pub fn value(&self, temp: &Temp) -> LatticeValue {
        self.values
            .get(temp)
            .copied()
            .unwrap_or_else(|| initial_value(temp))
    }

    /// Gets the value of an operand; immediates are constants.
    #[must_use]
    pub fn operand_value(&self, operand: &Operand) -> LatticeValue {
        match operand {
            Operand::Imm(v) => LatticeValue::Constant(*v),
            Operand::Temp(t) => self.value(t),
        }
    }

    /// Returns `true` if a temporary is known to be constant.
    #[must_use]
    pub fn is_constant(&self, temp: &Temp) -> bool {
        self.value(temp).is_constant()
    }

    /// Returns the constant value of a temporary if known.
    #[must_use]
    pub fn constant_value(&self, temp: &Temp) -> Option<i64> {
        self.value(temp).as_constant()
    }

    /// Returns `true` if a block is executable.
    #[must_use]
    pub fn is_block_executable(&self, block: &Label) -> bool {
        self.executable_blocks.contains(block)
    }

    /// Returns `true` if control can flow along the edge `from -> to`.
    #[must_use]
    pub fn is_edge_executable(&self, from: &Label, to: &Label) -> bool {
        self.executable_edges.contains(&(from.clone(), to.clone()))
    }

    /// Returns an iterator over all constant temporaries.
    pub fn constants(&self) -> impl Iterator<Item = (&Temp, i64)> {
        self.values
            .iter()
            .filter_map(|(temp, val)| val.as_constant().map(|c| (temp, c)))
    }

    /// Returns an iterator over all executable blocks.
    pub fn executable_blocks(&self) -> impl Iterator<Item = &Label> {
        self.executable_blocks.iter()
    }

    /// Returns the number of temporaries found to be constant.
    #[must_use]
    pub fn constant_count(&self) -> usize {
        self.values.values().filter(|v| v.is_constant()).count()
    }

    /// Returns the number of executable blocks.
    #[must_use]
    pub fn executable_block_count(&self) -> usize {
        self.executable_blocks.len()
    }
}
